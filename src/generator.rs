use crate::backends::{ProcessOutput, SynthesisBackend};
use crate::command::SynthesisCommand;
use crate::dispatcher::Dispatcher;
use crate::error::SynthesisError;
use crate::voices::{neural_voice_id, Language};

use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(1);

type Job = Box<dyn FnOnce() + Send + 'static>;

fn spawn_worker(job: Job) -> io::Result<()> {
    thread::Builder::new()
        .name("tts-job".into())
        .spawn(job)
        .map(|_| ())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub destination: PathBuf,
    pub text: String,
    pub language: Language,
    pub voice_index: usize,
    /// Maximum number of process launches for this request.
    pub max_attempts: u32,
}

impl SynthesisRequest {
    pub fn new(
        destination: impl Into<PathBuf>,
        text: impl Into<String>,
        language: Language,
        voice_index: usize,
    ) -> Self {
        Self {
            destination: destination.into(),
            text: text.into(),
            language,
            voice_index,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    fn to_command(&self) -> Result<SynthesisCommand, SynthesisError> {
        if self.destination.as_os_str().is_empty() {
            return Err(SynthesisError::Validation(
                "destination path must not be empty".into(),
            ));
        }
        if self.text.trim().is_empty() {
            return Err(SynthesisError::Validation(
                "text content must not be empty".into(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(SynthesisError::Validation(
                "retry budget must be at least 1".into(),
            ));
        }
        let voice = self.language.voice_name(self.voice_index).ok_or_else(|| {
            SynthesisError::Validation(format!(
                "no {} voice at index {}",
                self.language, self.voice_index
            ))
        })?;

        Ok(SynthesisCommand::new(
            &neural_voice_id(self.language, voice),
            &self.text,
            &self.destination,
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisOutcome {
    pub result: Result<PathBuf, SynthesisError>,
    /// Process launches consumed; 0 when the request never started.
    pub attempts: u32,
}

impl SynthesisOutcome {
    pub fn success(&self) -> bool {
        self.result.is_ok()
    }

    /// Destination path on success, diagnostic text on failure.
    pub fn message(&self) -> String {
        match &self.result {
            Ok(path) => path.display().to_string(),
            Err(e) => e.to_string(),
        }
    }
}

/// Releases the single-flight gate when dropped, so a panicking backend
/// cannot leave it held.
struct GateGuard(Arc<Mutex<bool>>);

impl Drop for GateGuard {
    fn drop(&mut self) {
        let mut busy = self.0.lock().unwrap_or_else(|e| e.into_inner());
        *busy = false;
    }
}

/// Single-flight, retrying synthesis job runner.
///
/// At most one job runs at a time across all clones. Every submission ends
/// with exactly one callback, delivered through the dispatcher.
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn SynthesisBackend>,
    dispatcher: Dispatcher,
    gate: Arc<Mutex<bool>>,
    backoff: Duration,
}

impl Generator {
    pub fn new(backend: Arc<dyn SynthesisBackend>, dispatcher: Dispatcher) -> Self {
        Self {
            backend,
            dispatcher,
            gate: Arc::new(Mutex::new(false)),
            backoff: DEFAULT_BACKOFF,
        }
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn is_busy(&self) -> bool {
        *self.gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn try_acquire(&self) -> Option<GateGuard> {
        let mut busy = self.gate.lock().unwrap_or_else(|e| e.into_inner());
        if *busy {
            None
        } else {
            *busy = true;
            Some(GateGuard(self.gate.clone()))
        }
    }

    pub fn submit<F>(&self, request: SynthesisRequest, on_complete: F)
    where
        F: FnOnce(SynthesisOutcome) + Send + 'static,
    {
        let Some(guard) = self.try_acquire() else {
            warn!(
                destination = %request.destination.display(),
                "synthesis rejected: job already running"
            );
            self.deliver(
                SynthesisOutcome {
                    result: Err(SynthesisError::Busy),
                    attempts: 0,
                },
                on_complete,
            );
            return;
        };

        let command = match request.to_command() {
            Ok(command) => command,
            Err(e) => {
                error!(error = %e, "synthesis request rejected");
                drop(guard);
                self.deliver(
                    SynthesisOutcome {
                        result: Err(e),
                        attempts: 0,
                    },
                    on_complete,
                );
                return;
            }
        };

        self.start(command, request.max_attempts, guard, on_complete, spawn_worker);
    }

    /// Run the job on a worker from `spawn`. If no worker can be started the
    /// job is dropped with the gate it holds, and the callback gets a launch
    /// error instead.
    fn start<F, S>(
        &self,
        command: SynthesisCommand,
        budget: u32,
        guard: GateGuard,
        on_complete: F,
        spawn: S,
    ) where
        F: FnOnce(SynthesisOutcome) + Send + 'static,
        S: FnOnce(Job) -> io::Result<()>,
    {
        let callback = Arc::new(Mutex::new(Some(on_complete)));

        let worker = self.clone();
        let worker_callback = callback.clone();
        let job: Job = Box::new(move || {
            let outcome = worker.run_attempts(&command, budget);
            drop(guard);
            let on_complete = worker_callback
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .take();
            if let Some(on_complete) = on_complete {
                worker.deliver(outcome, on_complete);
            }
        });

        if let Err(e) = spawn(job) {
            error!(error = %e, "could not start synthesis worker");
            let on_complete = callback.lock().unwrap_or_else(|e| e.into_inner()).take();
            if let Some(on_complete) = on_complete {
                self.deliver(
                    SynthesisOutcome {
                        result: Err(SynthesisError::Launch(format!(
                            "could not start worker thread: {}",
                            e
                        ))),
                        attempts: 0,
                    },
                    on_complete,
                );
            }
        }
    }

    fn run_attempts(&self, command: &SynthesisCommand, budget: u32) -> SynthesisOutcome {
        let mut attempt = 0;
        loop {
            attempt += 1;
            info!(
                backend = self.backend.id(),
                voice = %command.voice_id,
                attempt,
                budget,
                "running synthesis"
            );

            let err = match self.backend.run(command).and_then(ProcessOutput::check) {
                Ok(_) => {
                    info!(
                        destination = %command.destination.display(),
                        attempt,
                        "synthesis succeeded"
                    );
                    return SynthesisOutcome {
                        result: Ok(command.destination.clone()),
                        attempts: attempt,
                    };
                }
                Err(e) => e,
            };

            if !err.is_retryable() {
                error!(error = %err, "synthesis failed");
                return SynthesisOutcome {
                    result: Err(err),
                    attempts: attempt,
                };
            }

            if attempt < budget {
                warn!(error = %err, attempt, budget, "synthesis attempt failed, retrying");
                thread::sleep(self.backoff);
                continue;
            }

            let exhausted = SynthesisError::RetriesExhausted {
                budget,
                last: Box::new(err),
            };
            error!(error = %exhausted, "giving up on synthesis");
            return SynthesisOutcome {
                result: Err(exhausted),
                attempts: attempt,
            };
        }
    }

    fn deliver<F>(&self, outcome: SynthesisOutcome, on_complete: F)
    where
        F: FnOnce(SynthesisOutcome) + Send + 'static,
    {
        self.dispatcher.enqueue(move || on_complete(outcome));
    }
}
