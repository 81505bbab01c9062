use crate::{GenerationRequest, JobId, JobOutcome, StartError};

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Spawn a worker thread for a freshly accepted job.
    SpawnWorker {
        job_id: JobId,
        request: GenerationRequest,
    },
    /// Raise the cancellation flag shared with the job's worker.
    SignalCancel { job_id: JobId },
    /// A start request was refused; nothing was spawned.
    Rejected(StartError),
    /// The job reached its terminal state.
    JobFinished { job_id: JobId, outcome: JobOutcome },
}
