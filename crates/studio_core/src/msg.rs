use crate::{GenerationRequest, JobId, JobOutcome, ProgressEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User clicked Generate.
    StartClicked(GenerationRequest),
    /// User clicked Cancel.
    CancelClicked,
    /// The UI-thread monitor applied a progress event for a job.
    ProgressObserved { job_id: JobId, event: ProgressEvent },
    /// A worker thread returned.
    WorkerExited { job_id: JobId, outcome: JobOutcome },
    /// The UI has shown the terminal result; go back to idle.
    Acknowledged,
    /// UI tick; no state change.
    Tick,
}
