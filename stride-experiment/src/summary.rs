use serde::Serialize;
use stride_core::Condition;
use tracing::info;

use crate::state::TrialEvent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConditionStats {
    pub presented: usize,
    pub catch_slots: usize,
    pub scored: usize,
    pub correct: usize,
    pub missed: usize,
}

impl ConditionStats {
    pub fn accuracy(&self) -> Option<f64> {
        (self.scored > 0).then(|| self.correct as f64 / self.scored as f64)
    }

    pub fn response_rate(&self) -> Option<f64> {
        (self.presented > 0).then(|| self.scored as f64 / self.presented as f64)
    }
}

/// Running tally of a session, folded from scheduler events.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSummary {
    pub trials_completed: usize,
    pub trials_aborted: usize,
    pub stationary: ConditionStats,
    pub slow: ConditionStats,
    pub natural: ConditionStats,
    #[serde(skip)]
    current: Option<Condition>,
}

impl SessionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, event: &TrialEvent) {
        match *event {
            TrialEvent::TrialStarted { condition, .. } => self.current = Some(condition),
            TrialEvent::StimulusPresented { .. } => self.with_current(|s| s.presented += 1),
            TrialEvent::CatchSlot { .. } => self.with_current(|s| s.catch_slots += 1),
            TrialEvent::ResponseScored { correct, .. } => self.with_current(|s| {
                s.scored += 1;
                if correct {
                    s.correct += 1;
                }
            }),
            TrialEvent::ResponseMissed { .. } => self.with_current(|s| s.missed += 1),
            TrialEvent::TrialComplete { .. } => {
                self.trials_completed += 1;
                self.current = None;
            }
            TrialEvent::TrialAborted { .. } => {
                self.trials_aborted += 1;
                self.current = None;
            }
            TrialEvent::StandardTone { .. } | TrialEvent::WalkingStarted => {}
        }
    }

    pub fn observe_all<'a>(&mut self, events: impl IntoIterator<Item = &'a TrialEvent>) {
        for event in events {
            self.observe(event);
        }
    }

    pub fn stats(&self, condition: Condition) -> &ConditionStats {
        match condition {
            Condition::Stationary => &self.stationary,
            Condition::Slow => &self.slow,
            Condition::Natural => &self.natural,
        }
    }

    fn with_current(&mut self, f: impl FnOnce(&mut ConditionStats)) {
        let stats = match self.current {
            Some(Condition::Stationary) => &mut self.stationary,
            Some(Condition::Slow) => &mut self.slow,
            Some(Condition::Natural) => &mut self.natural,
            None => return,
        };
        f(stats);
    }

    pub fn log(&self) {
        info!(
            completed = self.trials_completed,
            aborted = self.trials_aborted,
            "session summary"
        );
        for condition in [Condition::Stationary, Condition::Slow, Condition::Natural] {
            let s = self.stats(condition);
            if s.presented + s.catch_slots == 0 {
                continue;
            }
            info!(
                condition = ?condition,
                presented = s.presented,
                catch = s.catch_slots,
                missed = s.missed,
                accuracy = s.accuracy().map(|a| format!("{:.1}%", a * 100.0)).unwrap_or_default(),
                "condition"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_events_by_condition() {
        let mut summary = SessionSummary::new();
        summary.observe_all(&[
            TrialEvent::TrialStarted {
                trial: 0,
                condition: Condition::Slow,
            },
            TrialEvent::CatchSlot { slot: 1 },
            TrialEvent::ResponseScored {
                window: 2,
                correct: true,
                responded_longer: false,
            },
            TrialEvent::ResponseMissed { window: 3 },
            TrialEvent::TrialComplete { trial: 0 },
            TrialEvent::TrialAborted { trial: 1 },
        ]);

        assert_eq!(summary.trials_completed, 1);
        assert_eq!(summary.trials_aborted, 1);
        assert_eq!(summary.slow.catch_slots, 1);
        assert_eq!(summary.slow.scored, 1);
        assert_eq!(summary.slow.missed, 1);
        assert_eq!(summary.slow.accuracy(), Some(1.0));
        assert_eq!(summary.natural, ConditionStats::default());
    }

    #[test]
    fn events_outside_a_trial_are_ignored() {
        let mut summary = SessionSummary::new();
        summary.observe(&TrialEvent::ResponseMissed { window: 1 });
        assert_eq!(summary.stationary.missed, 0);
        assert_eq!(summary.stationary.accuracy(), None);
        assert_eq!(summary.stationary.response_rate(), None);
    }
}
