//! Builds the argument string handed to the synthesis tool.

use std::path::{Path, PathBuf};

/// Which command interpreter will parse the argument string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellKind {
    /// `sh -c`: POSIX double-quote rules.
    Posix,
    /// `cmd /S /C`: cmd variable expansion, then MSVCRT argv parsing.
    Cmd,
}

impl ShellKind {
    pub fn from_shell(shell: &str) -> Self {
        let lower = shell.to_ascii_lowercase();
        if lower.ends_with("cmd") || lower.ends_with("cmd.exe") {
            ShellKind::Cmd
        } else {
            ShellKind::Posix
        }
    }
}

/// Everything a backend needs to run one synthesis attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisCommand {
    pub voice_id: String,
    pub text: String,
    pub destination: PathBuf,
}

impl SynthesisCommand {
    pub fn new(voice_id: &str, text: &str, destination: &Path) -> Self {
        Self {
            voice_id: voice_id.to_string(),
            text: text.to_string(),
            destination: destination.to_path_buf(),
        }
    }

    /// Argument string escaped for `shell`.
    pub fn arguments(&self, shell: ShellKind) -> String {
        build_arguments(shell, &self.voice_id, &self.text, &self.destination)
    }
}

/// Escape text for use inside a double-quoted word parsed by `shell`.
pub fn escape_argument(shell: ShellKind, argument: &str) -> String {
    match shell {
        ShellKind::Posix => escape_posix(argument),
        ShellKind::Cmd => escape_cmd(argument),
    }
}

// Backslashes go first so the escapes added for quotes are not doubled.
fn escape_posix(argument: &str) -> String {
    let mut escaped = String::with_capacity(argument.len() + 8);
    for c in argument.chars() {
        if matches!(c, '\\' | '"' | '$' | '`') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// Backslashes are literal unless they precede a quote, so only those runs
// (and a trailing run, which precedes the closing quote) are doubled.
// `""` keeps cmd's own quote tracking balanced, and `%` is split so cmd
// cannot expand a variable out of it. cmd cannot carry line breaks.
fn escape_cmd(argument: &str) -> String {
    let mut escaped = String::with_capacity(argument.len() + 8);
    let mut backslashes = 0;
    for c in argument.chars() {
        match c {
            '\\' => {
                backslashes += 1;
                continue;
            }
            '"' => {
                escaped.extend(std::iter::repeat('\\').take(backslashes * 2));
                escaped.push_str("\"\"");
            }
            other => {
                escaped.extend(std::iter::repeat('\\').take(backslashes));
                match other {
                    '%' => escaped.push_str("%%cd:~,%"),
                    '\r' | '\n' => escaped.push(' '),
                    _ => escaped.push(other),
                }
            }
        }
        backslashes = 0;
    }
    escaped.extend(std::iter::repeat('\\').take(backslashes * 2));
    escaped
}

pub fn build_arguments(
    shell: ShellKind,
    voice_id: &str,
    text: &str,
    destination: &Path,
) -> String {
    format!(
        "--voice {} --text \"{}\" --write-media \"{}\"",
        voice_id,
        escape_argument(shell, text),
        escape_argument(shell, &destination.to_string_lossy())
    )
}
