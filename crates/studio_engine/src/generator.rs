use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use studio_core::{GenerationRequest, MAX_SEED};
use studio_logging::studio_info;
use thiserror::Error;

use crate::video::{TensorError, VideoTensor};

/// Receives per-step callbacks from a generator running on the worker thread.
pub trait StepObserver {
    /// Called once per diffusion step with a 0-based index.
    fn on_step(&self, step_index: u32, total_steps: u32, time_step: f32);

    /// Generators should poll this between steps and return
    /// [`GeneratorError::Interrupted`] once it turns true.
    fn should_stop(&self) -> bool;
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error("generation interrupted")]
    Interrupted,
    #[error("model error: {0}")]
    Model(String),
    #[error("invalid model output: {0}")]
    InvalidOutput(String),
}

impl From<TensorError> for GeneratorError {
    fn from(err: TensorError) -> Self {
        GeneratorError::InvalidOutput(err.to_string())
    }
}

/// A request with its seed resolved to a concrete value.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParams {
    pub request: GenerationRequest,
    pub seed: u64,
}

impl GenerationParams {
    /// Replaces a negative seed with a random one in `0..=MAX_SEED`.
    pub fn resolve(request: GenerationRequest, rng: &mut impl Rng) -> Self {
        let seed = if request.seed < 0 {
            rng.gen_range(0..=MAX_SEED) as u64
        } else {
            request.seed as u64
        };
        Self { request, seed }
    }
}

/// The text-to-video model, run synchronously on the worker thread.
pub trait Generator: Send + Sync {
    fn generate(
        &self,
        params: &GenerationParams,
        observer: &dyn StepObserver,
    ) -> Result<VideoTensor, GeneratorError>;
}

/// Where the model lives and how it is placed on devices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub checkpoint_dir: PathBuf,
    /// Keep the T5 text encoder on the CPU.
    pub t5_cpu: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            checkpoint_dir: PathBuf::from("../Wan2.1-T2V-1.3B"),
            t5_cpu: true,
        }
    }
}

/// Flow-matching timestep for `step_index`, on the model's 0..1000 scale.
///
/// Sigmas fall linearly from 1 and are warped by `shift`; larger shifts keep
/// the schedule in the high-noise region for longer.
pub fn shifted_timestep(step_index: u32, total_steps: u32, shift: f32) -> f32 {
    let total = total_steps.max(1) as f32;
    let sigma = 1.0 - step_index.min(total_steps) as f32 / total;
    let shift = shift.max(f32::EPSILON);
    1000.0 * shift * sigma / (1.0 + (shift - 1.0) * sigma)
}

/// Stand-in model that walks the sampling schedule and renders a small
/// seed-dependent clip, for running the studio without weights.
#[derive(Debug, Clone)]
pub struct SimulatedGenerator {
    model: ModelSettings,
    step_delay: Duration,
    frames: usize,
    downscale: u32,
}

impl SimulatedGenerator {
    pub fn new(model: ModelSettings) -> Self {
        Self {
            model,
            step_delay: Duration::from_millis(40),
            frames: 16,
            downscale: 8,
        }
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn with_frames(mut self, frames: usize) -> Self {
        self.frames = frames;
        self
    }

    /// Output is rendered at `1/downscale` of the requested resolution.
    pub fn with_downscale(mut self, downscale: u32) -> Self {
        self.downscale = downscale.max(1);
        self
    }

    fn render(&self, params: &GenerationParams) -> Result<VideoTensor, GeneratorError> {
        let size = params.request.size;
        let width = (size.width / self.downscale).max(1) as usize;
        let height = (size.height / self.downscale).max(1) as usize;
        let frames = self.frames;
        let phase = (params.seed % 360) as f32 / 360.0 * std::f32::consts::TAU;
        let tensor = VideoTensor::from_fn([3, frames, height, width], |c, t, y, x| {
            let u = x as f32 / width as f32;
            let v = y as f32 / height as f32;
            let time = t as f32 / frames.max(1) as f32;
            let offset = c as f32 * std::f32::consts::TAU / 3.0;
            (phase + offset + std::f32::consts::TAU * (u + 0.5 * v + time)).sin()
        })?;
        Ok(tensor)
    }
}

impl Generator for SimulatedGenerator {
    fn generate(
        &self,
        params: &GenerationParams,
        observer: &dyn StepObserver,
    ) -> Result<VideoTensor, GeneratorError> {
        let request = &params.request;
        studio_info!(
            "Sampling {} with {} steps (seed {}, guide {}, shift {}, offload {}, t5 on cpu {}, ckpt {})",
            request.size,
            request.steps,
            params.seed,
            request.guide_scale,
            request.shift_scale,
            request.offload_model,
            self.model.t5_cpu,
            self.model.checkpoint_dir.display()
        );
        let total = request.steps;
        for step in 0..total {
            if observer.should_stop() {
                return Err(GeneratorError::Interrupted);
            }
            if !self.step_delay.is_zero() {
                thread::sleep(self.step_delay);
            }
            observer.on_step(step, total, shifted_timestep(step, total, request.shift_scale));
        }
        if observer.should_stop() {
            return Err(GeneratorError::Interrupted);
        }
        self.render(params)
    }
}
