pub mod edge_tts;

use crate::command::SynthesisCommand;
use crate::error::SynthesisError;

/// Captured result of a synthesis process that ran to completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success() -> Self {
        Self {
            exit_code: Some(0),
            ..Default::default()
        }
    }

    pub fn failure(exit_code: i32, stderr: &str) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }
    }

    /// Classify the exit: anything but code 0 is a process failure carrying stderr.
    pub fn check(self) -> Result<Self, SynthesisError> {
        match self.exit_code {
            Some(0) => Ok(self),
            code => Err(SynthesisError::Process {
                status: code
                    .map(|c| format!("exit code {}", c))
                    .unwrap_or_else(|| "a signal".to_string()),
                stderr: self.stderr.trim().to_string(),
            }),
        }
    }
}

/// Trait that all synthesis backends must implement.
/// Each call to `run` is exactly one process launch.
pub trait SynthesisBackend: Send + Sync {
    /// Returns the unique ID of the backend (e.g., "edge-tts")
    fn id(&self) -> &'static str;

    /// Runs the tool once and waits for it to exit.
    /// `Err` means the process could not be started or waited on.
    fn run(&self, command: &SynthesisCommand) -> Result<ProcessOutput, SynthesisError>;
}
