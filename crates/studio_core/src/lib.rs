//! Studio core: pure job-lifecycle state machine, request model and progress math.
mod effect;
mod lifecycle;
mod msg;
mod progress;
mod request;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use lifecycle::JobLifecycle;
pub use msg::Msg;
pub use progress::{describe, Phase, PhaseWeights, ProgressEvent, WeightsError};
pub use request::{
    GenerationRequest, ParameterOverrides, Resolution, ValidationError, MAX_PIXELS,
    MAX_SAMPLING_STEPS, MAX_SEED, RANDOM_SEED, RESOLUTION_PRESETS,
};
pub use state::{JobId, JobOutcome, JobState, StartError};
pub use update::update;
pub use view_model::{controls_for, ControlsView, JobStatus};
