use std::path::PathBuf;

use thiserror::Error;

use crate::request::ValidationError;

/// Strictly increasing per controller; the first job is 1.
pub type JobId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JobState {
    #[default]
    Idle,
    Running,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
}

impl JobState {
    /// A worker thread exists for the job.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Running | Self::Cancelling)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Running => "Running",
            Self::Cancelling => "Cancelling",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
            Self::Cancelled => "Cancelled",
        }
    }
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Completed(PathBuf),
    Failed(String),
    Cancelled,
}

impl JobOutcome {
    pub fn terminal_state(&self) -> JobState {
        match self {
            Self::Completed(_) => JobState::Completed,
            Self::Failed(_) => JobState::Failed,
            Self::Cancelled => JobState::Cancelled,
        }
    }

    pub fn result_path(&self) -> Option<&PathBuf> {
        match self {
            Self::Completed(path) => Some(path),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StartError {
    #[error("a generation job is already running (job {job_id})")]
    AlreadyRunning { job_id: JobId },
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),
    #[error("failed to spawn generation worker: {0}")]
    Spawn(String),
}
