use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use studio_core::{GenerationRequest, ParameterOverrides, PhaseWeights};
use studio_engine::{ModelSettings, DEFAULT_CAPACITY};
use studio_logging::studio_info;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub fps: u32,
    pub write_manifest: bool,
    pub channel_capacity: usize,
    pub weights: PhaseWeights,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("output"),
            fps: 16,
            write_manifest: true,
            channel_capacity: DEFAULT_CAPACITY,
            weights: PhaseWeights::default(),
        }
    }
}

/// Contents of `studio.ron`. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioConfig {
    pub model: ModelSettings,
    pub output: OutputConfig,
    /// Form defaults; CLI flags replace individual fields.
    pub request: GenerationRequest,
    pub overrides: ParameterOverrides,
    pub tick_interval_ms: u64,
    pub step_delay_ms: u64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            model: ModelSettings::default(),
            output: OutputConfig::default(),
            request: GenerationRequest::default(),
            overrides: ParameterOverrides::default(),
            tick_interval_ms: 100,
            step_delay_ms: 40,
        }
    }
}

pub fn load(path: &Path) -> Result<StudioConfig, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            studio_info!("No config at {:?}; using defaults", path);
            return Ok(StudioConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config = ron::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    studio_info!("Loaded config from {:?}", path);
    Ok(config)
}
