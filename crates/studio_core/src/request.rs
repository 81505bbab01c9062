use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Upper bound offered by the steps slider.
pub const MAX_SAMPLING_STEPS: u32 = 1000;
/// Largest seed the model accepts.
pub const MAX_SEED: i64 = 2_147_483_647;
/// Largest frame area accepted, 1280*720.
pub const MAX_PIXELS: u64 = 1280 * 720;
/// Seed value meaning "pick one at random".
pub const RANDOM_SEED: i64 = -1;

/// Sizes the 1.3B text-to-video model was trained for. The first entry is the default.
pub const RESOLUTION_PRESETS: [Resolution; 5] = [
    Resolution::new(480, 832),
    Resolution::new(832, 480),
    Resolution::new(624, 624),
    Resolution::new(704, 544),
    Resolution::new(544, 704),
];

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("prompt must not be empty")]
    EmptyPrompt,
    #[error("resolution {width}*{height} must have positive width and height")]
    InvalidResolution { width: u32, height: u32 },
    #[error("malformed resolution {0:?}, expected WIDTH*HEIGHT")]
    MalformedResolution(String),
    #[error("resolution {width}*{height} exceeds the {max} pixel limit")]
    ResolutionTooLarge { width: u32, height: u32, max: u64 },
    #[error("sampling steps {steps} out of range 1..={max}")]
    StepsOutOfRange { steps: u32, max: u32 },
    #[error("{name} must be a finite number, got {value}")]
    NonFiniteScale { name: &'static str, value: f32 },
    #[error("seed {seed} out of range (use -1 for random, or 0..={max})")]
    SeedOutOfRange { seed: i64, max: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl Default for Resolution {
    fn default() -> Self {
        RESOLUTION_PRESETS[0]
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.width, self.height)
    }
}

/// Parses `W*H` (the form used by the size dropdown) or `WxH`.
impl FromStr for Resolution {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let malformed = || ValidationError::MalformedResolution(raw.to_string());
        let trimmed = raw.trim();
        let (w, h) = trimmed
            .split_once('*')
            .or_else(|| trimmed.split_once(|c: char| c == 'x' || c == 'X'))
            .ok_or_else(malformed)?;
        let width = w.trim().parse::<u32>().map_err(|_| malformed())?;
        let height = h.trim().parse::<u32>().map_err(|_| malformed())?;
        Ok(Self { width, height })
    }
}

/// One text-to-video submission. Immutable once handed to a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationRequest {
    pub prompt: String,
    pub negative_prompt: String,
    pub size: Resolution,
    pub steps: u32,
    pub guide_scale: f32,
    pub shift_scale: f32,
    pub seed: i64,
    pub offload_model: bool,
}

impl Default for GenerationRequest {
    fn default() -> Self {
        Self {
            prompt: String::new(),
            negative_prompt: String::new(),
            size: Resolution::default(),
            steps: 50,
            guide_scale: 6.0,
            shift_scale: 8.0,
            seed: RANDOM_SEED,
            offload_model: true,
        }
    }
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.prompt.trim().is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        if self.size.width == 0 || self.size.height == 0 {
            return Err(ValidationError::InvalidResolution {
                width: self.size.width,
                height: self.size.height,
            });
        }
        if self.size.pixel_count() > MAX_PIXELS {
            return Err(ValidationError::ResolutionTooLarge {
                width: self.size.width,
                height: self.size.height,
                max: MAX_PIXELS,
            });
        }
        if self.steps == 0 || self.steps > MAX_SAMPLING_STEPS {
            return Err(ValidationError::StepsOutOfRange {
                steps: self.steps,
                max: MAX_SAMPLING_STEPS,
            });
        }
        for (name, value) in [
            ("guide_scale", self.guide_scale),
            ("shift_scale", self.shift_scale),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteScale { name, value });
            }
        }
        if self.seed != RANDOM_SEED && !(0..=MAX_SEED).contains(&self.seed) {
            return Err(ValidationError::SeedOutOfRange {
                seed: self.seed,
                max: MAX_SEED,
            });
        }
        Ok(())
    }

    /// Applies host-level overrides on top of the values the user entered.
    pub fn with_overrides(mut self, overrides: &ParameterOverrides) -> Self {
        if let Some(shift) = overrides.sample_shift {
            self.shift_scale = shift;
        }
        if let Some(guide) = overrides.sample_guide_scale {
            self.guide_scale = guide;
        }
        if let Some(offload) = overrides.offload_model {
            self.offload_model = offload;
        }
        self
    }
}

/// Values fixed by the host (command line or config file) that win over
/// whatever the user picked for a single request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverrides {
    pub sample_shift: Option<f32>,
    pub sample_guide_scale: Option<f32>,
    pub offload_model: Option<bool>,
}

impl ParameterOverrides {
    pub fn is_empty(&self) -> bool {
        self.sample_shift.is_none()
            && self.sample_guide_scale.is_none()
            && self.offload_model.is_none()
    }

    /// Fills unset fields from `fallback`, keeping the values already present.
    pub fn or(self, fallback: ParameterOverrides) -> Self {
        Self {
            sample_shift: self.sample_shift.or(fallback.sample_shift),
            sample_guide_scale: self.sample_guide_scale.or(fallback.sample_guide_scale),
            offload_model: self.offload_model.or(fallback.offload_model),
        }
    }
}
