use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use studio_core::{GenerationRequest, JobId, ProgressEvent};
use studio_logging::{set_current_job, studio_debug, studio_info, studio_warn};

use crate::channel::ProgressSender;
use crate::generator::{GenerationParams, Generator, GeneratorError, StepObserver};
use crate::output::VideoSink;
use crate::types::{CancelFlag, GenerationError, WorkerOutcome};

/// Forwards generator callbacks into the progress channel.
struct ChannelObserver<'a> {
    sender: &'a ProgressSender,
    cancel: &'a CancelFlag,
    total_steps: u32,
}

impl StepObserver for ChannelObserver<'_> {
    /// The reported total is ignored; events always carry the job's step count.
    fn on_step(&self, step_index: u32, _total_steps: u32, time_step: f32) {
        if self.cancel.is_raised() {
            return;
        }
        let total_steps = self.total_steps.max(1);
        let step_index = step_index.min(total_steps - 1);
        self.sender
            .try_push(ProgressEvent::diffusing(step_index, total_steps, time_step));
    }

    fn should_stop(&self) -> bool {
        self.cancel.is_raised()
    }
}

/// Runs one generation job off the UI thread.
///
/// The worker owns the producer end of the progress channel and closes it on
/// every exit path, including panics inside the generator.
pub struct GenerationWorker {
    job_id: JobId,
    request: GenerationRequest,
    generator: Arc<dyn Generator>,
    sink: Arc<dyn VideoSink>,
    progress: ProgressSender,
    cancel: CancelFlag,
}

impl GenerationWorker {
    pub fn new(
        job_id: JobId,
        request: GenerationRequest,
        generator: Arc<dyn Generator>,
        sink: Arc<dyn VideoSink>,
        progress: ProgressSender,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            job_id,
            request,
            generator,
            sink,
            progress,
            cancel,
        }
    }

    pub fn spawn(self) -> io::Result<JoinHandle<WorkerOutcome>> {
        thread::Builder::new()
            .name(format!("generation-{}", self.job_id))
            .spawn(move || self.run())
    }

    /// Runs the job to completion on the calling thread.
    pub fn run(self) -> WorkerOutcome {
        set_current_job(self.job_id);
        studio_info!(
            "Generation started: {} steps at {}",
            self.request.steps,
            self.request.size
        );
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| self.execute())) {
            Ok(outcome) => outcome,
            Err(payload) => WorkerOutcome::Failed(GenerationError::from_panic(payload.as_ref())),
        };
        self.progress.close();
        match &outcome {
            WorkerOutcome::Completed(path) => studio_info!("Video saved to {}", path.display()),
            WorkerOutcome::Failed(err) => studio_warn!("Generation failed: {}", err),
            WorkerOutcome::Cancelled => studio_info!("Generation cancelled"),
        }
        if self.progress.dropped() > 0 {
            studio_debug!(
                "{} progress events coalesced before the UI read them",
                self.progress.dropped()
            );
        }
        set_current_job(0);
        outcome
    }

    fn execute(&self) -> WorkerOutcome {
        let total = self.request.steps;
        self.progress.try_push(ProgressEvent::init(total));
        if self.cancel.is_raised() {
            return WorkerOutcome::Cancelled;
        }

        let params = GenerationParams::resolve(self.request.clone(), &mut rand::thread_rng());
        studio_debug!("Resolved seed {}", params.seed);
        let observer = ChannelObserver {
            sender: &self.progress,
            cancel: &self.cancel,
            total_steps: total,
        };
        let result = self.generator.generate(&params, &observer);
        if self.cancel.is_raised() {
            return WorkerOutcome::Cancelled;
        }
        let video = match result {
            Ok(video) => video,
            Err(GeneratorError::Interrupted) => {
                return WorkerOutcome::Failed(GenerationError::new(
                    "generator stopped without a cancellation request",
                ))
            }
            Err(err) => return WorkerOutcome::Failed(err.into()),
        };
        if video.is_empty() {
            return WorkerOutcome::Failed(GenerationError::new("generator returned no frames"));
        }

        self.progress.try_push(ProgressEvent::saving(total));
        if self.cancel.is_raised() {
            return WorkerOutcome::Cancelled;
        }
        match self.sink.persist(&video, &params) {
            Ok(path) => {
                self.progress.try_push(ProgressEvent::done(total));
                WorkerOutcome::Completed(path)
            }
            Err(err) => WorkerOutcome::Failed(err.into()),
        }
    }
}
