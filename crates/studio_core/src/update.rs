use crate::{Effect, JobLifecycle, Msg, StartError};

/// Pure update function: applies a message to the lifecycle and returns any effects.
pub fn update(mut state: JobLifecycle, msg: Msg) -> (JobLifecycle, Vec<Effect>) {
    let effects = match msg {
        Msg::StartClicked(request) => {
            if let Some(job_id) = state.active_job_id() {
                return (state, vec![Effect::Rejected(StartError::AlreadyRunning { job_id })]);
            }
            if let Err(err) = request.validate() {
                return (state, vec![Effect::Rejected(err.into())]);
            }
            let job_id = state.begin_job();
            vec![Effect::SpawnWorker { job_id, request }]
        }
        Msg::CancelClicked => match state.request_cancel() {
            Some(job_id) => vec![Effect::SignalCancel { job_id }],
            None => Vec::new(),
        },
        Msg::ProgressObserved { job_id, event } => {
            state.apply_progress(job_id, event);
            Vec::new()
        }
        Msg::WorkerExited { job_id, outcome } => match state.apply_exit(job_id, outcome) {
            Some(outcome) => vec![Effect::JobFinished { job_id, outcome }],
            None => Vec::new(),
        },
        Msg::Acknowledged => {
            state.acknowledge();
            Vec::new()
        }
        Msg::Tick => Vec::new(),
    };

    (state, effects)
}
