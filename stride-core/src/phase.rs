use serde::Serialize;

/// Phases a single trial moves through.
///
/// `ResponseWindow` and `CatchSlot` alternate with `ComparisonSchedule`
/// once per scheduled onset; everything else is visited once per trial.
#[derive(Copy, Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum TrialPhase {
    #[default]
    Idle,
    PreTrialWait,
    StandardSequence,
    ComparisonSchedule,
    ResponseWindow,
    CatchSlot,
    TrialEnd,
}

impl TrialPhase {
    pub fn is_in_progress(&self) -> bool {
        !matches!(self, Self::Idle)
    }

    pub fn accepts_response(&self) -> bool {
        matches!(self, Self::ResponseWindow)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_is_the_only_resting_phase() {
        assert!(!TrialPhase::Idle.is_in_progress());
        for phase in [
            TrialPhase::PreTrialWait,
            TrialPhase::StandardSequence,
            TrialPhase::ComparisonSchedule,
            TrialPhase::ResponseWindow,
            TrialPhase::CatchSlot,
            TrialPhase::TrialEnd,
        ] {
            assert!(phase.is_in_progress(), "{phase:?}");
        }
    }

    #[test]
    fn only_response_window_accepts_responses() {
        assert!(TrialPhase::ResponseWindow.accepts_response());
        assert!(!TrialPhase::CatchSlot.accepts_response());
        assert!(!TrialPhase::StandardSequence.accepts_response());
    }
}
