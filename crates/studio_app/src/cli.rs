use std::path::PathBuf;

use clap::Parser;
use studio_core::{ParameterOverrides, Resolution};

use crate::logging::LogDestination;

/// Headless text-to-video studio: runs one generation job and reports its progress.
#[derive(Debug, Parser)]
#[command(name = "studio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Text prompt describing the video.
    #[arg(long)]
    pub prompt: Option<String>,

    /// Things the video should avoid.
    #[arg(long)]
    pub negative_prompt: Option<String>,

    /// Output resolution as WIDTH*HEIGHT (e.g. 480*832).
    #[arg(long)]
    pub size: Option<Resolution>,

    /// Number of diffusion sampling steps (1-1000).
    #[arg(long)]
    pub steps: Option<u32>,

    /// Classifier-free guidance scale.
    #[arg(long)]
    pub guide_scale: Option<f32>,

    /// Noise schedule shift.
    #[arg(long)]
    pub shift_scale: Option<f32>,

    /// Seed; -1 picks a random one.
    #[arg(long, allow_negative_numbers = true)]
    pub seed: Option<i64>,

    /// Offload model weights to the CPU between forward passes.
    #[arg(long)]
    pub offload_model: Option<bool>,

    /// Checkpoint directory of the model.
    #[arg(long)]
    pub ckpt_dir: Option<PathBuf>,

    /// Keep the T5 text encoder on the CPU.
    #[arg(long)]
    pub t5_cpu: Option<bool>,

    /// Shift that replaces whatever the request asks for.
    #[arg(long)]
    pub sample_shift: Option<f32>,

    /// Guidance scale that replaces whatever the request asks for.
    #[arg(long)]
    pub sample_guide_scale: Option<f32>,

    /// Configuration file (RON). Missing file means built-in defaults.
    #[arg(long, default_value = "studio.ron")]
    pub config: PathBuf,

    /// Directory that receives videos and manifests.
    #[arg(long)]
    pub output_dir: Option<PathBuf>,

    /// Delay per simulated diffusion step, in milliseconds.
    #[arg(long)]
    pub step_delay_ms: Option<u64>,

    /// Request cancellation after this many milliseconds.
    #[arg(long)]
    pub cancel_after_ms: Option<u64>,

    /// Where log output goes.
    #[arg(long, value_enum, default_value_t = LogDestination::File)]
    pub log: LogDestination,
}

impl Cli {
    pub fn overrides(&self) -> ParameterOverrides {
        ParameterOverrides {
            sample_shift: self.sample_shift,
            sample_guide_scale: self.sample_guide_scale,
            offload_model: None,
        }
    }
}
