use std::sync::Arc;
use std::thread::JoinHandle;

use studio_core::{
    controls_for, update, ControlsView, Effect, GenerationRequest, JobId, JobLifecycle,
    JobOutcome, JobState, JobStatus, Msg, PhaseWeights, ProgressEvent, StartError,
};
use studio_logging::{studio_info, studio_warn};

use crate::channel::{ProgressChannel, ProgressReceiver};
use crate::generator::Generator;
use crate::output::{VideoSink, Y4mVideoSink};
use crate::settings::EngineSettings;
use crate::types::{panic_message, CancelFlag, WorkerOutcome};
use crate::worker::GenerationWorker;

/// Handed out by [`JobController::start`]; the holder is the only reader of
/// the job's progress.
#[derive(Debug)]
pub struct JobTicket {
    pub job_id: JobId,
    pub progress: ProgressReceiver,
}

struct ActiveWorker {
    job_id: JobId,
    cancel: CancelFlag,
    handle: JoinHandle<WorkerOutcome>,
}

/// UI-thread owner of the job lifecycle and the single worker thread.
///
/// Every state change goes through [`studio_core::update`]; the controller
/// only interprets the effects it returns. No method blocks on the worker.
pub struct JobController {
    lifecycle: JobLifecycle,
    generator: Arc<dyn Generator>,
    sink: Arc<dyn VideoSink>,
    settings: EngineSettings,
    worker: Option<ActiveWorker>,
}

impl JobController {
    pub fn new(generator: Arc<dyn Generator>, settings: EngineSettings) -> Self {
        let sink = Arc::new(Y4mVideoSink::new(settings.output.clone()));
        Self::with_sink(generator, sink, settings)
    }

    pub fn with_sink(
        generator: Arc<dyn Generator>,
        sink: Arc<dyn VideoSink>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            lifecycle: JobLifecycle::with_weights(settings.weights),
            generator,
            sink,
            settings,
            worker: None,
        }
    }

    /// Starts a job. On success the controller is `Running` before this returns.
    pub fn start(&mut self, request: GenerationRequest) -> Result<JobTicket, StartError> {
        self.reap_finished();
        let request = request.with_overrides(&self.settings.overrides);
        let mut spawned = None;
        for effect in self.dispatch(Msg::StartClicked(request)) {
            match effect {
                Effect::Rejected(err) => {
                    studio_warn!("Start rejected: {}", err);
                    return Err(err);
                }
                Effect::SpawnWorker { job_id, request } => spawned = Some((job_id, request)),
                _ => {}
            }
        }
        let (job_id, request) =
            spawned.ok_or_else(|| StartError::Spawn("no worker was scheduled".into()))?;
        self.spawn_worker(job_id, request)
    }

    fn spawn_worker(
        &mut self,
        job_id: JobId,
        request: GenerationRequest,
    ) -> Result<JobTicket, StartError> {
        let (sender, receiver) = ProgressChannel::bounded(self.settings.channel_capacity);
        let cancel = CancelFlag::new();
        let worker = GenerationWorker::new(
            job_id,
            request,
            self.generator.clone(),
            self.sink.clone(),
            sender,
            cancel.clone(),
        );
        match worker.spawn() {
            Ok(handle) => {
                studio_info!("Spawned worker for job {}", job_id);
                self.worker = Some(ActiveWorker {
                    job_id,
                    cancel,
                    handle,
                });
                Ok(JobTicket {
                    job_id,
                    progress: receiver,
                })
            }
            Err(err) => {
                let message = err.to_string();
                self.dispatch(Msg::WorkerExited {
                    job_id,
                    outcome: JobOutcome::Failed(message.clone()),
                });
                Err(StartError::Spawn(message))
            }
        }
    }

    /// Requests cancellation. Returns `true` only for the call that moved
    /// `Running` to `Cancelling`; repeats and idle calls are no-ops.
    pub fn cancel(&mut self) -> bool {
        let mut signalled = false;
        for effect in self.dispatch(Msg::CancelClicked) {
            if let Effect::SignalCancel { job_id } = effect {
                if let Some(worker) = self.worker.as_ref().filter(|w| w.job_id == job_id) {
                    worker.cancel.raise();
                    studio_info!("Cancellation requested for job {}", job_id);
                    signalled = true;
                }
            }
        }
        signalled
    }

    /// Reaps a finished worker, if any, and returns the current snapshot.
    pub fn poll_status(&mut self) -> JobStatus {
        self.reap_finished();
        self.lifecycle.view()
    }

    /// Records progress the monitor has drained for `job_id`.
    pub fn record_progress(&mut self, job_id: JobId, event: ProgressEvent) {
        self.dispatch(Msg::ProgressObserved { job_id, event });
    }

    /// Returns a terminal job to `Idle`. Returns `false` when nothing was terminal.
    pub fn acknowledge(&mut self) -> bool {
        let was_terminal = self.lifecycle.state().is_terminal();
        self.dispatch(Msg::Acknowledged);
        was_terminal
    }

    pub fn state(&self) -> JobState {
        self.lifecycle.state()
    }

    pub fn controls(&self) -> ControlsView {
        controls_for(self.lifecycle.state())
    }

    pub fn weights(&self) -> PhaseWeights {
        self.lifecycle.weights()
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.lifecycle.consume_dirty()
    }

    fn reap_finished(&mut self) {
        if !self
            .worker
            .as_ref()
            .is_some_and(|worker| worker.handle.is_finished())
        {
            return;
        }
        let Some(worker) = self.worker.take() else {
            return;
        };
        let outcome = match worker.handle.join() {
            Ok(outcome) => JobOutcome::from(outcome),
            Err(payload) => JobOutcome::Failed(format!(
                "generation thread panicked: {}",
                panic_message(payload.as_ref())
            )),
        };
        for effect in self.dispatch(Msg::WorkerExited {
            job_id: worker.job_id,
            outcome,
        }) {
            if let Effect::JobFinished { job_id, outcome } = effect {
                studio_info!("Job {} finished: {:?}", job_id, outcome);
            }
        }
    }

    fn dispatch(&mut self, msg: Msg) -> Vec<Effect> {
        let state = std::mem::take(&mut self.lifecycle);
        let (state, effects) = update(state, msg);
        self.lifecycle = state;
        effects
    }
}

impl Drop for JobController {
    fn drop(&mut self) {
        // The worker is detached; it notices the flag at its next step and exits.
        if let Some(worker) = self.worker.take() {
            worker.cancel.raise();
        }
    }
}
