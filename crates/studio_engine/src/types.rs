use std::any::Any;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use studio_core::JobOutcome;
use thiserror::Error;

use crate::generator::GeneratorError;
use crate::persist::PersistError;

/// Human-readable reason a job failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GenerationError {
    message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn from_panic(payload: &(dyn Any + Send)) -> Self {
        Self::new(format!(
            "generation thread panicked: {}",
            panic_message(payload)
        ))
    }
}

impl From<GeneratorError> for GenerationError {
    fn from(err: GeneratorError) -> Self {
        Self::new(format!("video generation failed: {err}"))
    }
}

impl From<PersistError> for GenerationError {
    fn from(err: PersistError) -> Self {
        Self::new(format!("failed to save video: {err}"))
    }
}

/// What the worker thread returns when it exits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    Completed(PathBuf),
    Failed(GenerationError),
    Cancelled,
}

impl From<WorkerOutcome> for JobOutcome {
    fn from(outcome: WorkerOutcome) -> Self {
        match outcome {
            WorkerOutcome::Completed(path) => JobOutcome::Completed(path),
            WorkerOutcome::Failed(err) => JobOutcome::Failed(err.message),
            WorkerOutcome::Cancelled => JobOutcome::Cancelled,
        }
    }
}

/// Cancellation flag shared by a controller (writer) and one worker (reader).
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
