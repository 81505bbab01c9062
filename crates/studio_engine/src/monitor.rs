use std::time::{Duration, Instant};

use studio_core::{describe, JobId, JobStatus, ProgressEvent};
use studio_logging::studio_debug;

use crate::channel::ProgressReceiver;
use crate::controller::{JobController, JobTicket};

pub const MIN_TICK: Duration = Duration::from_millis(100);
pub const MAX_TICK: Duration = Duration::from_millis(300);

/// UI-side sink for monitor updates. Called on the UI thread only.
pub trait ProgressWidget {
    fn set_progress(&mut self, fraction: f32, description: &str);

    /// Called exactly once per attached job, with its terminal status.
    fn on_finished(&mut self, status: &JobStatus);
}

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorTick {
    /// No job attached.
    Idle,
    Active,
    Finished(JobStatus),
}

struct Attached {
    job_id: JobId,
    receiver: ProgressReceiver,
    last_applied: Option<ProgressEvent>,
}

/// Periodic UI-thread poller: drains the progress channel, keeps the widget
/// monotonic and reports the terminal status once.
pub struct ProgressMonitor {
    tick_interval: Duration,
    attached: Option<Attached>,
    last_tick: Option<Instant>,
}

impl ProgressMonitor {
    /// `tick_interval` is clamped to 100..=300 ms.
    pub fn new(tick_interval: Duration) -> Self {
        Self {
            tick_interval: tick_interval.clamp(MIN_TICK, MAX_TICK),
            attached: None,
            last_tick: None,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Starts following a job. A previously attached job is dropped silently.
    pub fn attach(&mut self, ticket: JobTicket) {
        if let Some(previous) = self.attached.take() {
            studio_debug!("Monitor detached from job {}", previous.job_id);
        }
        self.attached = Some(Attached {
            job_id: ticket.job_id,
            receiver: ticket.progress,
            last_applied: None,
        });
        self.last_tick = None;
    }

    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_tick {
            Some(last) => now.saturating_duration_since(last) >= self.tick_interval,
            None => true,
        }
    }

    pub fn tick(
        &mut self,
        controller: &mut JobController,
        widget: &mut dyn ProgressWidget,
    ) -> MonitorTick {
        self.last_tick = Some(Instant::now());
        let Some(attached) = self.attached.as_mut() else {
            return MonitorTick::Idle;
        };

        attached.apply_latest(controller, widget);

        let job_id = attached.job_id;
        let status = controller.poll_status();
        if status.job_id != Some(job_id) {
            // Acknowledged or superseded elsewhere; nothing left to report.
            self.attached = None;
            return MonitorTick::Idle;
        }
        if status.state.is_terminal() {
            // The worker may have pushed its last events after the first drain.
            attached.apply_latest(controller, widget);
            let status = controller.poll_status();
            self.attached = None;
            widget.on_finished(&status);
            return MonitorTick::Finished(status);
        }
        MonitorTick::Active
    }
}

impl Attached {
    fn apply_latest(&mut self, controller: &mut JobController, widget: &mut dyn ProgressWidget) {
        let Some(event) = self.receiver.drain_latest().latest else {
            return;
        };
        let fresh = self
            .last_applied
            .map_or(true, |previous| event.supersedes(&previous));
        if fresh {
            self.last_applied = Some(event);
            let fraction = controller.weights().fraction(&event);
            widget.set_progress(fraction, &describe(&event));
            controller.record_progress(self.job_id, event);
        } else {
            studio_debug!("Discarded stale progress {:?}", event.order_key());
        }
    }
}
