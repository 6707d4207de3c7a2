//! Per-trial comparison onset schedules.
//!
//! The first onset is a delay measured from the end of the standard
//! sequence; every later onset is an absolute trial-clock time. This is how
//! the scheduler consumes them, so drift accumulated before onset `k` never
//! moves onset `k + 1`.

use rand::Rng;
use tracing::debug;

use crate::config::{AudioConfig, TimingConfig};

/// Supplies the onset list for a trial.
pub trait OnsetScheduleProvider {
    fn onsets(&self, trial: usize) -> Option<&[f32]>;
}

impl OnsetScheduleProvider for Vec<Vec<f32>> {
    fn onsets(&self, trial: usize) -> Option<&[f32]> {
        self.get(trial).map(Vec::as_slice)
    }
}

/// Precomputed schedules for a whole session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OnsetSchedule {
    trials: Vec<Vec<f32>>,
}

impl OnsetSchedule {
    pub fn from_trials(trials: Vec<Vec<f32>>) -> Self {
        Self { trials }
    }

    pub fn len(&self) -> usize {
        self.trials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trials.is_empty()
    }
}

impl OnsetScheduleProvider for OnsetSchedule {
    fn onsets(&self, trial: usize) -> Option<&[f32]> {
        self.trials.get(trial).map(Vec::as_slice)
    }
}

/// Builds jittered schedules: onsets at least `min_isi_sec` apart, each
/// pushed later by a uniform draw from `[0, jitter_max_sec]`, and none so
/// late that its response window would outlast the trial.
#[derive(Debug, Clone)]
pub struct JitteredScheduleGenerator {
    lead_in_sec: f32,
    first_onset_sec: f32,
    min_isi_sec: f32,
    jitter_max_sec: f32,
    trial_duration_sec: f32,
    tail_sec: f32,
}

impl JitteredScheduleGenerator {
    pub fn new(timing: &TimingConfig, audio: &AudioConfig) -> Self {
        Self {
            lead_in_sec: timing.pre_trial_sec + audio.standard_sequence_sec(),
            first_onset_sec: timing.first_onset_sec,
            min_isi_sec: timing.min_isi_sec.max(0.0),
            jitter_max_sec: timing.jitter_max_sec.max(0.0),
            trial_duration_sec: timing.trial_duration_sec,
            tail_sec: audio.max_comparison_ms / 1000.0 + timing.response_window_sec,
        }
    }

    fn jitter<R: Rng>(&self, rng: &mut R) -> f32 {
        if self.jitter_max_sec > 0.0 {
            rng.random_range(0.0..=self.jitter_max_sec)
        } else {
            0.0
        }
    }

    pub fn generate_trial<R: Rng>(&self, rng: &mut R) -> Vec<f32> {
        let mut onsets = Vec::new();
        let first = self.first_onset_sec + self.jitter(rng);
        let mut at = self.lead_in_sec + first;
        if at + self.tail_sec > self.trial_duration_sec {
            return onsets;
        }
        onsets.push(first);

        // a zero interval would never terminate
        if self.min_isi_sec <= 0.0 && self.jitter_max_sec <= 0.0 {
            return onsets;
        }
        loop {
            at += self.min_isi_sec + self.jitter(rng);
            if at + self.tail_sec > self.trial_duration_sec {
                break;
            }
            onsets.push(at);
        }
        onsets
    }

    pub fn generate<R: Rng>(&self, trials: usize, rng: &mut R) -> OnsetSchedule {
        let schedule = OnsetSchedule::from_trials(
            (0..trials).map(|_| self.generate_trial(rng)).collect(),
        );
        debug!(trials, "onset schedule generated");
        schedule
    }
}
