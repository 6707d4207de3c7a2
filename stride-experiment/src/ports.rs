//! Collaborators the trial scheduler talks to but does not implement.

use stride_audio::AudioOutput;
use stride_core::{ResponseAction, StimulusEvent, TrialRecord};

use crate::error::Result;
use crate::schedule::OnsetScheduleProvider;

/// Per-condition threshold tracker. Its algorithm is opaque to the
/// scheduler: it receives one scored response and returns the delta (ms)
/// to generate the next comparison with.
pub trait AdaptiveController {
    fn process_response(&mut self, condition_label: &str, was_correct: bool) -> f32;
}

/// Returns the same delta for every response.
#[derive(Debug, Clone, Copy)]
pub struct FixedDeltaController {
    pub delta_ms: f32,
}

impl AdaptiveController for FixedDeltaController {
    fn process_response(&mut self, _condition_label: &str, _was_correct: bool) -> f32 {
        self.delta_ms
    }
}

pub trait WalkingGuide {
    fn begin_motion(&mut self);
    fn is_stationary_capable(&self) -> bool;

    /// False while walk-speed calibration is still running; start signals
    /// are ignored until then.
    fn is_ready(&self) -> bool {
        true
    }

    fn prepare_next_trial(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackState {
    Correct,
    Incorrect,
    Hidden,
}

pub trait FeedbackDisplay {
    fn show(&mut self, state: FeedbackState);
}

/// Durable storage for finalized presentations. Called once per scored or
/// missed presentation.
pub trait PersistenceSink {
    fn persist(&mut self, record: &TrialRecord, event: &StimulusEvent) -> Result<()>;
}

/// Button state sampled once per scheduler step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub left: bool,
    pub right: bool,
}

impl InputState {
    pub const NONE: Self = Self {
        left: false,
        right: false,
    };
    pub const LEFT: Self = Self {
        left: true,
        right: false,
    };
    pub const RIGHT: Self = Self {
        left: false,
        right: true,
    };
    pub const BOTH: Self = Self {
        left: true,
        right: true,
    };

    pub fn either(&self) -> bool {
        self.left || self.right
    }

    pub fn both(&self) -> bool {
        self.left && self.right
    }

    /// The single button held, if exactly one is.
    pub fn action(&self) -> Option<ResponseAction> {
        match (self.left, self.right) {
            (true, false) => Some(ResponseAction::Left),
            (false, true) => Some(ResponseAction::Right),
            _ => None,
        }
    }
}

impl From<ResponseAction> for InputState {
    fn from(action: ResponseAction) -> Self {
        match action {
            ResponseAction::Left => Self::LEFT,
            ResponseAction::Right => Self::RIGHT,
        }
    }
}

/// Everything the scheduler is wired to, passed in at construction.
pub struct Collaborators {
    pub schedule: Box<dyn OnsetScheduleProvider>,
    pub controller: Box<dyn AdaptiveController>,
    pub guide: Box<dyn WalkingGuide>,
    pub feedback: Box<dyn FeedbackDisplay>,
    pub sink: Box<dyn PersistenceSink>,
    pub audio: Box<dyn AudioOutput>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_state_derivations() {
        assert!(InputState::BOTH.both());
        assert!(InputState::BOTH.either());
        assert!(!InputState::LEFT.both());
        assert!(!InputState::NONE.either());
        assert_eq!(InputState::LEFT.action(), Some(ResponseAction::Left));
        assert_eq!(InputState::RIGHT.action(), Some(ResponseAction::Right));
        assert_eq!(InputState::BOTH.action(), None);
        assert_eq!(InputState::from(ResponseAction::Right), InputState::RIGHT);
    }

    #[test]
    fn fixed_controller_ignores_history() {
        let mut c = FixedDeltaController { delta_ms: 30.0 };
        assert_eq!(c.process_response("slow", true), 30.0);
        assert_eq!(c.process_response("natural", false), 30.0);
    }
}
