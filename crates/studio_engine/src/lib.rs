//! Studio engine: worker thread, progress transport and UI-thread job control.
mod channel;
mod controller;
mod filename;
mod generator;
mod monitor;
mod output;
mod persist;
mod settings;
mod types;
mod video;
mod worker;

pub use channel::{ChannelRecv, Drained, ProgressChannel, ProgressReceiver, ProgressSender, DEFAULT_CAPACITY};
pub use controller::{JobController, JobTicket};
pub use filename::video_filename;
pub use generator::{
    shifted_timestep, GenerationParams, Generator, GeneratorError, ModelSettings,
    SimulatedGenerator, StepObserver,
};
pub use monitor::{MonitorTick, ProgressMonitor, ProgressWidget, MAX_TICK, MIN_TICK};
pub use output::{VideoSink, Y4mVideoSink};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use settings::{Clock, EngineSettings, OutputSettings};
pub use types::{CancelFlag, GenerationError, WorkerOutcome};
pub use video::{encode_y4m, TensorError, VideoTensor};
pub use worker::GenerationWorker;
