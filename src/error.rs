use std::path::PathBuf;
use std::time::Duration;

/// Every way a synthesis job can end without producing audio.
///
/// `Busy` and `Validation` are reported before any process is launched and
/// are never retried. `Process`, `Launch` and `Timeout` are transient as far
/// as the generator is concerned; once the retry budget is spent the last one
/// is wrapped in `RetriesExhausted`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SynthesisError {
    #[error("a synthesis job is already running, try again later")]
    Busy,

    #[error("invalid request: {0}")]
    Validation(String),

    #[error("synthesis process exited with {status}: {stderr}")]
    Process { status: String, stderr: String },

    #[error("failed to launch synthesis process: {0}")]
    Launch(String),

    #[error("synthesis process timed out after {0:?}")]
    Timeout(Duration),

    #[error("synthesis failed after reaching the retry limit ({budget}): {last}")]
    RetriesExhausted {
        budget: u32,
        last: Box<SynthesisError>,
    },
}

impl SynthesisError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Process { .. } | Self::Launch(_) | Self::Timeout(_)
        )
    }
}

impl From<std::io::Error> for SynthesisError {
    fn from(err: std::io::Error) -> Self {
        Self::Launch(err.to_string())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("not a file name: {}", .0.display())]
    InvalidName(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_process_failures_retry() {
        assert!(SynthesisError::Launch("missing".into()).is_retryable());
        assert!(SynthesisError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(SynthesisError::Process {
            status: "exit status: 1".into(),
            stderr: "boom".into()
        }
        .is_retryable());

        assert!(!SynthesisError::Busy.is_retryable());
        assert!(!SynthesisError::Validation("empty".into()).is_retryable());
    }

    #[test]
    fn test_exhausted_message_names_budget_and_cause() {
        let err = SynthesisError::RetriesExhausted {
            budget: 3,
            last: Box::new(SynthesisError::Launch("No such file".into())),
        };
        let msg = err.to_string();
        assert!(msg.contains("(3)"));
        assert!(msg.contains("No such file"));
    }
}
