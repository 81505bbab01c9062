use crate::{JobId, JobOutcome, JobState, ProgressEvent};

/// Snapshot returned to the UI on every poll.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct JobStatus {
    pub job_id: Option<JobId>,
    pub state: JobState,
    /// Latest progress applied by the monitor, if any arrived yet.
    pub progress: Option<ProgressEvent>,
    /// Normalised completion in `[0, 1]`.
    pub fraction: f32,
    pub description: String,
    /// Set once the job is terminal.
    pub outcome: Option<JobOutcome>,
}

/// Interactivity of the generate/cancel controls and the two result panels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlsView {
    pub generate_enabled: bool,
    pub cancel_visible: bool,
    pub cancel_enabled: bool,
    pub placeholder_visible: bool,
    pub generating_visible: bool,
}

/// Single source of truth for what the user may click in each state.
pub fn controls_for(state: JobState) -> ControlsView {
    let active = state.is_active();
    ControlsView {
        generate_enabled: !active,
        cancel_visible: active,
        cancel_enabled: state == JobState::Running,
        placeholder_visible: !active,
        generating_visible: active,
    }
}
