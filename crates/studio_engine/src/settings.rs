use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use studio_core::{ParameterOverrides, PhaseWeights};

use crate::channel::DEFAULT_CAPACITY;

/// Clock used to stamp manifests; injected so tests stay deterministic.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

/// How finished videos are written to disk.
#[derive(Clone)]
pub struct OutputSettings {
    pub output_dir: PathBuf,
    pub fps: u32,
    /// Sample range the model produces; mapped onto 0..=255.
    pub value_range: (f32, f32),
    pub write_manifest: bool,
    pub created_utc: Clock,
}

impl OutputSettings {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            fps: 16,
            value_range: (-1.0, 1.0),
            write_manifest: true,
            created_utc: Arc::new(|| "1970-01-01T00:00:00Z".to_string()),
        }
    }
}

impl fmt::Debug for OutputSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSettings")
            .field("output_dir", &self.output_dir)
            .field("fps", &self.fps)
            .field("value_range", &self.value_range)
            .field("write_manifest", &self.write_manifest)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub output: OutputSettings,
    pub channel_capacity: usize,
    /// Launch-time values that win over whatever the request carries.
    pub overrides: ParameterOverrides,
    pub weights: PhaseWeights,
}

impl EngineSettings {
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            output: OutputSettings::new(output_dir),
            channel_capacity: DEFAULT_CAPACITY,
            overrides: ParameterOverrides::default(),
            weights: PhaseWeights::default(),
        }
    }
}
