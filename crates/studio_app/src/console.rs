use std::io::Write;

use studio_core::{ControlsView, JobOutcome, JobStatus};
use studio_engine::ProgressWidget;

const BAR_WIDTH: usize = 30;

/// Text rendition of the generation panel: a progress bar line plus the
/// state of the generate/cancel controls.
pub struct ConsoleWidget<W: Write> {
    out: W,
    last_controls: Option<ControlsView>,
}

impl<W: Write> ConsoleWidget<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_controls: None,
        }
    }

    pub fn show_controls(&mut self, controls: ControlsView) {
        if self.last_controls == Some(controls) {
            return;
        }
        self.last_controls = Some(controls);
        let _ = writeln!(self.out, "{}", render_controls(&controls));
        let _ = self.out.flush();
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ProgressWidget for ConsoleWidget<W> {
    fn set_progress(&mut self, fraction: f32, description: &str) {
        let _ = writeln!(self.out, "{}", render_bar(fraction, description));
        let _ = self.out.flush();
    }

    fn on_finished(&mut self, status: &JobStatus) {
        let line = match &status.outcome {
            Some(JobOutcome::Completed(path)) => format!("Video saved to {}", path.display()),
            Some(JobOutcome::Failed(message)) => format!("Error: {message}"),
            Some(JobOutcome::Cancelled) => "Generation cancelled".to_string(),
            None => format!("Job ended in state {}", status.state.label()),
        };
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}

fn render_bar(fraction: f32, description: &str) -> String {
    let fraction = fraction.clamp(0.0, 1.0);
    let filled = (fraction * BAR_WIDTH as f32).round() as usize;
    format!(
        "[{}{}] {:5.1}% {}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        fraction * 100.0,
        description
    )
}

fn render_controls(controls: &ControlsView) -> String {
    let toggle = |on: bool| if on { "on" } else { "off" };
    let mut parts = vec![format!("generate: {}", toggle(controls.generate_enabled))];
    if controls.cancel_visible {
        parts.push(format!("cancel: {}", toggle(controls.cancel_enabled)));
    }
    if controls.generating_visible {
        parts.push("panel: generating".to_string());
    } else if controls.placeholder_visible {
        parts.push("panel: result".to_string());
    }
    format!("<{}>", parts.join(" | "))
}
