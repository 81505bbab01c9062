use std::io;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use chrono::Utc;
use studio_core::{GenerationRequest, JobOutcome};
use studio_engine::{
    EngineSettings, JobController, ModelSettings, MonitorTick, ProgressMonitor,
    SimulatedGenerator,
};
use studio_logging::{studio_info, studio_warn};

use crate::cli::Cli;
use crate::config::StudioConfig;
use crate::console::ConsoleWidget;

const IDLE_SLEEP: Duration = Duration::from_millis(10);

/// Everything one run needs, after merging CLI flags over the config file.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub request: GenerationRequest,
    pub model: ModelSettings,
    pub settings: EngineSettings,
    pub tick_interval: Duration,
    pub step_delay: Duration,
    pub cancel_after: Option<Duration>,
}

impl RunPlan {
    /// CLI flags win over the file, the file wins over built-in defaults.
    pub fn resolve(cli: &Cli, config: StudioConfig) -> Self {
        let mut request = config.request;
        if let Some(prompt) = &cli.prompt {
            request.prompt = prompt.clone();
        }
        if let Some(negative) = &cli.negative_prompt {
            request.negative_prompt = negative.clone();
        }
        if let Some(size) = cli.size {
            request.size = size;
        }
        if let Some(steps) = cli.steps {
            request.steps = steps;
        }
        if let Some(guide) = cli.guide_scale {
            request.guide_scale = guide;
        }
        if let Some(shift) = cli.shift_scale {
            request.shift_scale = shift;
        }
        if let Some(seed) = cli.seed {
            request.seed = seed;
        }
        if let Some(offload) = cli.offload_model {
            request.offload_model = offload;
        }

        let mut model = config.model;
        if let Some(dir) = &cli.ckpt_dir {
            model.checkpoint_dir = dir.clone();
        }
        if let Some(t5_cpu) = cli.t5_cpu {
            model.t5_cpu = t5_cpu;
        }

        let output_dir = cli.output_dir.clone().unwrap_or(config.output.dir);
        let mut settings = EngineSettings::default_with_output(output_dir);
        settings.output.fps = config.output.fps;
        settings.output.write_manifest = config.output.write_manifest;
        settings.channel_capacity = config.output.channel_capacity;
        settings.weights = config.output.weights;
        settings.overrides = cli.overrides().or(config.overrides);

        Self {
            request,
            model,
            settings,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            step_delay: Duration::from_millis(cli.step_delay_ms.unwrap_or(config.step_delay_ms)),
            cancel_after: cli.cancel_after_ms.map(Duration::from_millis),
        }
    }
}

/// Runs a single job to its terminal state, driving the monitor from this thread.
pub fn run(plan: RunPlan) -> anyhow::Result<()> {
    let mut settings = plan.settings;
    settings.output.created_utc = Arc::new(|| Utc::now().to_rfc3339());

    let generator =
        Arc::new(SimulatedGenerator::new(plan.model).with_step_delay(plan.step_delay));
    let mut controller = JobController::new(generator, settings);
    let mut monitor = ProgressMonitor::new(plan.tick_interval);
    let mut widget = ConsoleWidget::new(io::stdout());

    let ticket = controller
        .start(plan.request)
        .context("could not start generation")?;
    studio_info!("Started job {}", ticket.job_id);
    monitor.attach(ticket);

    let started = Instant::now();
    let mut cancel_sent = false;
    let status = loop {
        let now = Instant::now();
        if let Some(after) = plan.cancel_after {
            if !cancel_sent && now.duration_since(started) >= after {
                cancel_sent = true;
                if !controller.cancel() {
                    studio_warn!("Cancel requested but no job was running");
                }
            }
        }
        if controller.consume_dirty() {
            widget.show_controls(controller.controls());
        }
        if monitor.is_due(now) {
            match monitor.tick(&mut controller, &mut widget) {
                MonitorTick::Finished(status) => break status,
                MonitorTick::Idle => break controller.poll_status(),
                MonitorTick::Active => {}
            }
        }
        thread::sleep(IDLE_SLEEP);
    };

    controller.acknowledge();
    widget.show_controls(controller.controls());
    match status.outcome {
        Some(JobOutcome::Failed(message)) => bail!("generation failed: {message}"),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;
    use studio_core::{ParameterOverrides, Resolution};

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["studio"];
        full.extend_from_slice(args);
        Cli::try_parse_from(full).unwrap()
    }

    #[test]
    fn cli_wins_over_file_and_file_over_defaults() {
        let mut config = StudioConfig::default();
        config.request.prompt = "from file".into();
        config.request.steps = 30;
        config.request.guide_scale = 4.0;
        config.output.dir = PathBuf::from("file-out");
        config.overrides = ParameterOverrides {
            sample_shift: Some(2.0),
            sample_guide_scale: Some(7.5),
            offload_model: None,
        };

        let plan = RunPlan::resolve(
            &cli(&["--prompt", "cat", "--size", "624*624", "--sample-shift", "3.0"]),
            config,
        );

        assert_eq!(plan.request.prompt, "cat");
        assert_eq!(plan.request.size, Resolution::new(624, 624));
        assert_eq!(plan.request.steps, 30);
        assert_eq!(plan.request.guide_scale, 4.0);
        assert_eq!(plan.request.shift_scale, 8.0);
        assert_eq!(plan.settings.output.output_dir, PathBuf::from("file-out"));
        assert_eq!(plan.settings.overrides.sample_shift, Some(3.0));
        assert_eq!(plan.settings.overrides.sample_guide_scale, Some(7.5));
        assert_eq!(plan.cancel_after, None);
    }

    #[test]
    fn host_flags_configure_the_run() {
        let plan = RunPlan::resolve(
            &cli(&[
                "--output-dir",
                "clips",
                "--step-delay-ms",
                "0",
                "--cancel-after-ms",
                "250",
                "--ckpt-dir",
                "/models/wan",
                "--t5-cpu",
                "false",
            ]),
            StudioConfig::default(),
        );
        assert_eq!(plan.settings.output.output_dir, PathBuf::from("clips"));
        assert_eq!(plan.step_delay, Duration::ZERO);
        assert_eq!(plan.cancel_after, Some(Duration::from_millis(250)));
        assert_eq!(plan.model.checkpoint_dir, PathBuf::from("/models/wan"));
        assert!(!plan.model.t5_cpu);
        assert_eq!(plan.tick_interval, Duration::from_millis(100));
    }
}
