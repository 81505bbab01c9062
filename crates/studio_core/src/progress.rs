use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse stage of a job. Ordered by when it occurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Phase {
    Init,
    Diffusing,
    Saving,
    Done,
}

/// One progress sample produced by the worker thread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressEvent {
    /// 0-based, always `< total_steps`.
    pub step_index: u32,
    /// Fixed for the lifetime of a job.
    pub total_steps: u32,
    /// Model-internal diffusion time; descriptive only.
    pub time_step: f32,
    pub phase: Phase,
}

impl ProgressEvent {
    pub fn init(total_steps: u32) -> Self {
        Self {
            step_index: 0,
            total_steps,
            time_step: 0.0,
            phase: Phase::Init,
        }
    }

    pub fn diffusing(step_index: u32, total_steps: u32, time_step: f32) -> Self {
        Self {
            step_index,
            total_steps,
            time_step,
            phase: Phase::Diffusing,
        }
    }

    pub fn saving(total_steps: u32) -> Self {
        Self {
            step_index: total_steps.saturating_sub(1),
            total_steps,
            time_step: 0.0,
            phase: Phase::Saving,
        }
    }

    pub fn done(total_steps: u32) -> Self {
        Self {
            step_index: total_steps.saturating_sub(1),
            total_steps,
            time_step: 0.0,
            phase: Phase::Done,
        }
    }

    /// Position of the event within its job; later events compare greater.
    pub fn order_key(&self) -> (Phase, u32) {
        (self.phase, self.step_index)
    }

    /// True when applying `self` after `previous` would not move progress backwards.
    pub fn supersedes(&self, previous: &ProgressEvent) -> bool {
        self.order_key() >= previous.order_key()
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightsError {
    #[error("phase weights must be finite and non-negative (init {init}, diffusion {diffusion}, save {save})")]
    OutOfRange { init: f32, diffusion: f32, save: f32 },
    #[error("phase weights must sum to 1.0, got {sum}")]
    BadSum { sum: f32 },
}

/// Share of the progress bar given to each phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawWeights", into = "RawWeights")]
pub struct PhaseWeights {
    init: f32,
    diffusion: f32,
    save: f32,
}

impl Default for PhaseWeights {
    /// 1% model init, 89% diffusion, 10% saving.
    fn default() -> Self {
        Self {
            init: 0.01,
            diffusion: 0.89,
            save: 0.10,
        }
    }
}

impl PhaseWeights {
    pub fn new(init: f32, diffusion: f32, save: f32) -> Result<Self, WeightsError> {
        let all = [init, diffusion, save];
        if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(WeightsError::OutOfRange {
                init,
                diffusion,
                save,
            });
        }
        let sum: f32 = all.iter().sum();
        if (sum - 1.0).abs() > 1e-6 {
            return Err(WeightsError::BadSum { sum });
        }
        Ok(Self {
            init,
            diffusion,
            save,
        })
    }

    pub fn init(&self) -> f32 {
        self.init
    }

    pub fn diffusion(&self) -> f32 {
        self.diffusion
    }

    pub fn save(&self) -> f32 {
        self.save
    }

    /// Normalised completion in `[0, 1]` for an event.
    pub fn fraction(&self, event: &ProgressEvent) -> f32 {
        let value = match event.phase {
            Phase::Init => self.init,
            Phase::Diffusing => {
                let total = event.total_steps.max(1) as f32;
                let step = event.step_index.min(event.total_steps) as f32;
                self.init + self.diffusion * (step / total)
            }
            Phase::Saving => self.init + self.diffusion,
            Phase::Done => 1.0,
        };
        value.clamp(0.0, 1.0)
    }
}

#[derive(Serialize, Deserialize)]
struct RawWeights {
    init: f32,
    diffusion: f32,
    save: f32,
}

impl TryFrom<RawWeights> for PhaseWeights {
    type Error = WeightsError;

    fn try_from(raw: RawWeights) -> Result<Self, Self::Error> {
        PhaseWeights::new(raw.init, raw.diffusion, raw.save)
    }
}

impl From<PhaseWeights> for RawWeights {
    fn from(w: PhaseWeights) -> Self {
        Self {
            init: w.init,
            diffusion: w.diffusion,
            save: w.save,
        }
    }
}

/// Human-readable label shown next to the progress bar.
pub fn describe(event: &ProgressEvent) -> String {
    match event.phase {
        Phase::Init => "Initializing model...".to_string(),
        Phase::Diffusing => format!(
            "Diffusion step {}/{} (timestep: {:.2})",
            event.step_index + 1,
            event.total_steps,
            event.time_step
        ),
        Phase::Saving => "Generation finished, saving video...".to_string(),
        Phase::Done => "Video generation complete!".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phases_order_by_occurrence() {
        let init = ProgressEvent::init(10);
        let first = ProgressEvent::diffusing(0, 10, 999.0);
        let last = ProgressEvent::diffusing(9, 10, 10.0);
        let saving = ProgressEvent::saving(10);

        assert!(first.supersedes(&init));
        assert!(last.supersedes(&first));
        assert!(saving.supersedes(&last));
        assert!(!first.supersedes(&last));
        assert!(last.supersedes(&last));
    }

    #[test]
    fn weights_reject_bad_shares() {
        assert!(PhaseWeights::new(0.02, 0.88, 0.10).is_ok());
        assert!(matches!(
            PhaseWeights::new(0.5, 0.5, 0.5),
            Err(WeightsError::BadSum { .. })
        ));
        assert!(matches!(
            PhaseWeights::new(-0.1, 1.0, 0.1),
            Err(WeightsError::OutOfRange { .. })
        ));
    }

    #[test]
    fn zero_total_does_not_divide_by_zero() {
        let weights = PhaseWeights::default();
        let event = ProgressEvent::diffusing(0, 0, 0.0);
        assert!(weights.fraction(&event).is_finite());
    }
}
