use super::{ProcessOutput, SynthesisBackend};
use crate::command::{ShellKind, SynthesisCommand};
use crate::error::SynthesisError;

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::debug;
use wait_timeout::ChildExt;

/// Runs `edge-tts` (or a compatible program) through the platform shell.
pub struct EdgeTtsBackend {
    program: String,
    shell: String,
    timeout: Option<Duration>,
}

impl EdgeTtsBackend {
    pub fn new(program: &str) -> Self {
        Self {
            program: program.to_string(),
            shell: default_shell().to_string(),
            timeout: None,
        }
    }

    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = shell.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn shell_kind(&self) -> ShellKind {
        ShellKind::from_shell(&self.shell)
    }

    pub fn command_line(&self, command: &SynthesisCommand) -> String {
        format!("{} {}", self.program, command.arguments(self.shell_kind()))
    }

    fn shell_command(&self, line: &str) -> Command {
        let mut cmd = Command::new(&self.shell);
        match self.shell_kind() {
            ShellKind::Posix => {
                cmd.arg("-c").arg(line);
            }
            ShellKind::Cmd => push_cmd_line(&mut cmd, line),
        }
        cmd
    }

    fn wait(&self, child: &mut Child) -> std::io::Result<Option<ExitStatus>> {
        match self.timeout {
            Some(limit) => child.wait_timeout(limit),
            None => child.wait().map(Some),
        }
    }
}

pub fn default_shell() -> &'static str {
    if cfg!(windows) {
        "cmd.exe"
    } else {
        "sh"
    }
}

// cmd must see the line exactly as escaped; std's own argv quoting would
// wrap it in a second layer of `\"` that cmd does not understand.
#[cfg(windows)]
fn push_cmd_line(cmd: &mut Command, line: &str) {
    use std::os::windows::process::CommandExt;
    cmd.raw_arg(format!("/S /C \"{}\"", line));
}

#[cfg(not(windows))]
fn push_cmd_line(cmd: &mut Command, line: &str) {
    cmd.arg("/C").arg(line);
}

/// Drain a pipe on its own thread so a chatty child never blocks on a full buffer.
fn read_pipe<R: Read + Send + 'static>(pipe: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let mut bytes = Vec::new();
        if let Some(mut pipe) = pipe {
            let _ = pipe.read_to_end(&mut bytes);
        }
        String::from_utf8_lossy(&bytes).into_owned()
    })
}

fn join_pipe(handle: JoinHandle<String>) -> String {
    handle.join().unwrap_or_default()
}

impl SynthesisBackend for EdgeTtsBackend {
    fn id(&self) -> &'static str {
        "edge-tts"
    }

    fn run(&self, command: &SynthesisCommand) -> Result<ProcessOutput, SynthesisError> {
        let line = self.command_line(command);
        debug!(shell = %self.shell, command = %line, "launching synthesis process");

        let mut child = self
            .shell_command(&line)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdout = read_pipe(child.stdout.take());
        let stderr = read_pipe(child.stderr.take());

        let status = match self.wait(&mut child) {
            Ok(Some(status)) => status,
            Ok(None) => {
                // Timeout occurred, kill the process
                let _ = child.kill();
                let _ = child.wait();
                // Grandchildren may still hold the pipes open; leave the readers detached.
                drop((stdout, stderr));
                return Err(SynthesisError::Timeout(self.timeout.unwrap_or_default()));
            }
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        };

        Ok(ProcessOutput {
            exit_code: status.code(),
            stdout: join_pipe(stdout),
            stderr: join_pipe(stderr),
        })
    }
}
