use crate::view_model::JobStatus;
use crate::{describe, JobId, JobOutcome, JobState, PhaseWeights, ProgressEvent};

/// The job a lifecycle currently tracks, active or terminal.
#[derive(Debug, Clone, PartialEq)]
struct JobRecord {
    job_id: JobId,
    progress: Option<ProgressEvent>,
    outcome: Option<JobOutcome>,
    cancel_requested: bool,
}

/// Single-job state machine. Owned by one controller; never shared across threads.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobLifecycle {
    state: JobState,
    last_job_id: JobId,
    current: Option<JobRecord>,
    weights: PhaseWeights,
    dirty: bool,
}

impl JobLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_weights(weights: PhaseWeights) -> Self {
        Self {
            weights,
            ..Self::default()
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn weights(&self) -> PhaseWeights {
        self.weights
    }

    pub fn current_job_id(&self) -> Option<JobId> {
        self.current.as_ref().map(|job| job.job_id)
    }

    /// Active job id, if a worker is running or being cancelled.
    pub fn active_job_id(&self) -> Option<JobId> {
        if self.state.is_active() {
            self.current_job_id()
        } else {
            None
        }
    }

    pub fn view(&self) -> JobStatus {
        let progress = self.current.as_ref().and_then(|job| job.progress);
        let outcome = self.current.as_ref().and_then(|job| job.outcome.clone());
        let fraction = match (&progress, self.state) {
            (_, JobState::Completed) => 1.0,
            (Some(event), _) => self.weights.fraction(event),
            (None, _) => 0.0,
        };
        let description = match (&outcome, &progress) {
            (Some(JobOutcome::Failed(message)), _) => message.clone(),
            (Some(JobOutcome::Cancelled), _) => "Generation cancelled".to_string(),
            (_, Some(event)) => describe(event),
            (_, None) if self.state == JobState::Running => "Waiting for worker...".to_string(),
            _ => String::new(),
        };
        JobStatus {
            job_id: self.current_job_id(),
            state: self.state,
            progress,
            fraction,
            description,
            outcome,
        }
    }

    /// Returns whether a change happened since the last call and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn begin_job(&mut self) -> JobId {
        self.last_job_id += 1;
        let job_id = self.last_job_id;
        self.current = Some(JobRecord {
            job_id,
            progress: None,
            outcome: None,
            cancel_requested: false,
        });
        self.state = JobState::Running;
        self.mark_dirty();
        job_id
    }

    /// Moves `Running` to `Cancelling`. Returns the job to signal, if any.
    pub(crate) fn request_cancel(&mut self) -> Option<JobId> {
        if self.state != JobState::Running {
            return None;
        }
        let job = self.current.as_mut()?;
        job.cancel_requested = true;
        let job_id = job.job_id;
        self.state = JobState::Cancelling;
        self.mark_dirty();
        Some(job_id)
    }

    /// Records the latest applied progress; stale jobs and backwards steps are ignored.
    pub(crate) fn apply_progress(&mut self, job_id: JobId, event: ProgressEvent) -> bool {
        if self.state == JobState::Idle {
            return false;
        }
        let Some(job) = self.current.as_mut().filter(|job| job.job_id == job_id) else {
            return false;
        };
        if job.progress.is_some_and(|prev| !event.supersedes(&prev)) {
            return false;
        }
        if job.progress != Some(event) {
            job.progress = Some(event);
            self.dirty = true;
        }
        true
    }

    /// Resolves the worker's outcome against the cancel-wins policy.
    /// Returns the stored outcome, or `None` when the report is stale or late.
    pub(crate) fn apply_exit(&mut self, job_id: JobId, reported: JobOutcome) -> Option<JobOutcome> {
        if !self.state.is_active() {
            return None;
        }
        let job = self.current.as_mut().filter(|job| job.job_id == job_id)?;
        let outcome = if job.cancel_requested {
            JobOutcome::Cancelled
        } else {
            reported
        };
        job.outcome = Some(outcome.clone());
        self.state = outcome.terminal_state();
        self.mark_dirty();
        Some(outcome)
    }

    pub(crate) fn acknowledge(&mut self) -> bool {
        if !self.state.is_terminal() {
            return false;
        }
        self.state = JobState::Idle;
        self.current = None;
        self.mark_dirty();
        true
    }
}
