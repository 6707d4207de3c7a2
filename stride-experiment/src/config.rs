use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::Result;

/// Session structure used by the block design generator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignConfig {
    #[serde(default = "DesignConfig::default_trials_per_block")]
    pub trials_per_block: usize,
    #[serde(default = "DesignConfig::default_blocks_total")]
    pub blocks_total: usize,
    #[serde(default = "DesignConfig::default_practice_blocks")]
    pub practice_blocks: usize,
    #[serde(default = "DesignConfig::default_walk_speed_count")]
    pub walk_speed_count: usize,
    #[serde(default = "DesignConfig::default_proportion_slow")]
    pub proportion_slow: f32,
    /// Leading practice trials run standing still. These trials also give
    /// correctness feedback and bypass the adaptive controller.
    #[serde(default = "DesignConfig::default_standing_still_trials")]
    pub standing_still_trials: usize,
    #[serde(default = "DesignConfig::default_practice_slow_trials")]
    pub practice_slow_trials: usize,
}

impl DesignConfig {
    fn default_trials_per_block() -> usize {
        20
    }
    fn default_blocks_total() -> usize {
        11
    }
    fn default_practice_blocks() -> usize {
        1
    }
    fn default_walk_speed_count() -> usize {
        2
    }
    fn default_proportion_slow() -> f32 {
        0.5
    }
    fn default_standing_still_trials() -> usize {
        2
    }
    fn default_practice_slow_trials() -> usize {
        2
    }

    pub fn total_trials(&self) -> usize {
        self.blocks_total * self.trials_per_block
    }
}

impl Default for DesignConfig {
    fn default() -> Self {
        Self {
            trials_per_block: Self::default_trials_per_block(),
            blocks_total: Self::default_blocks_total(),
            practice_blocks: Self::default_practice_blocks(),
            walk_speed_count: Self::default_walk_speed_count(),
            proportion_slow: Self::default_proportion_slow(),
            standing_still_trials: Self::default_standing_still_trials(),
            practice_slow_trials: Self::default_practice_slow_trials(),
        }
    }
}

/// Within-trial timing, all in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    #[serde(default = "TimingConfig::default_pre_trial_sec")]
    pub pre_trial_sec: f32,
    #[serde(default = "TimingConfig::default_response_window_sec")]
    pub response_window_sec: f32,
    #[serde(default = "TimingConfig::default_trial_duration_sec")]
    pub trial_duration_sec: f32,
    /// Probability that a scheduled onset is left silent.
    #[serde(default = "TimingConfig::default_catch_probability")]
    pub catch_probability: f32,
    /// Presses this soon after trial start are ignored (the start signal
    /// is itself a button press).
    #[serde(default = "TimingConfig::default_response_lockout_sec")]
    pub response_lockout_sec: f32,
    #[serde(default = "TimingConfig::default_feedback_sec")]
    pub feedback_sec: f32,
    #[serde(default = "TimingConfig::default_first_onset_sec")]
    pub first_onset_sec: f32,
    #[serde(default = "TimingConfig::default_min_isi_sec")]
    pub min_isi_sec: f32,
    #[serde(default = "TimingConfig::default_jitter_max_sec")]
    pub jitter_max_sec: f32,
}

impl TimingConfig {
    fn default_pre_trial_sec() -> f32 {
        0.5
    }
    fn default_response_window_sec() -> f32 {
        0.75
    }
    fn default_trial_duration_sec() -> f32 {
        10.0
    }
    fn default_catch_probability() -> f32 {
        0.05
    }
    fn default_response_lockout_sec() -> f32 {
        0.5
    }
    fn default_feedback_sec() -> f32 {
        0.2
    }
    fn default_first_onset_sec() -> f32 {
        1.0
    }
    fn default_min_isi_sec() -> f32 {
        1.5
    }
    fn default_jitter_max_sec() -> f32 {
        0.25
    }

    pub fn presentation_probability(&self) -> f32 {
        1.0 - self.catch_probability
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            pre_trial_sec: Self::default_pre_trial_sec(),
            response_window_sec: Self::default_response_window_sec(),
            trial_duration_sec: Self::default_trial_duration_sec(),
            catch_probability: Self::default_catch_probability(),
            response_lockout_sec: Self::default_response_lockout_sec(),
            feedback_sec: Self::default_feedback_sec(),
            first_onset_sec: Self::default_first_onset_sec(),
            min_isi_sec: Self::default_min_isi_sec(),
            jitter_max_sec: Self::default_jitter_max_sec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "AudioConfig::default_tone_frequency_hz")]
    pub tone_frequency_hz: f32,
    #[serde(default = "AudioConfig::default_tone_amplitude")]
    pub tone_amplitude: f32,
    #[serde(default = "AudioConfig::default_standard_duration_ms")]
    pub standard_duration_ms: f32,
    #[serde(default = "AudioConfig::default_standard_repetitions")]
    pub standard_repetitions: usize,
    #[serde(default = "AudioConfig::default_standard_gap_ms")]
    pub standard_gap_ms: f32,
    #[serde(default = "AudioConfig::default_min_comparison_ms")]
    pub min_comparison_ms: f32,
    #[serde(default = "AudioConfig::default_max_comparison_ms")]
    pub max_comparison_ms: f32,
    #[serde(default = "AudioConfig::default_ramp_duration_ms")]
    pub ramp_duration_ms: f32,
    #[serde(default = "AudioConfig::default_sample_rate")]
    pub sample_rate: u32,
    /// Starting delta as a fraction of the standard (large, so early
    /// comparisons are easy).
    #[serde(default = "AudioConfig::default_initial_delta_fraction")]
    pub initial_delta_fraction: f32,
}

impl AudioConfig {
    fn default_tone_frequency_hz() -> f32 {
        1000.0
    }
    fn default_tone_amplitude() -> f32 {
        0.8
    }
    fn default_standard_duration_ms() -> f32 {
        100.0
    }
    fn default_standard_repetitions() -> usize {
        3
    }
    fn default_standard_gap_ms() -> f32 {
        500.0
    }
    fn default_min_comparison_ms() -> f32 {
        10.0
    }
    fn default_max_comparison_ms() -> f32 {
        1000.0
    }
    fn default_ramp_duration_ms() -> f32 {
        5.0
    }
    fn default_sample_rate() -> u32 {
        44_100
    }
    fn default_initial_delta_fraction() -> f32 {
        0.75
    }

    pub fn initial_delta_ms(&self) -> f32 {
        self.standard_duration_ms * self.initial_delta_fraction
    }

    /// `(standard + gap) * repetitions`, in seconds.
    pub fn standard_sequence_sec(&self) -> f32 {
        (self.standard_duration_ms + self.standard_gap_ms) / 1000.0
            * self.standard_repetitions as f32
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tone_frequency_hz: Self::default_tone_frequency_hz(),
            tone_amplitude: Self::default_tone_amplitude(),
            standard_duration_ms: Self::default_standard_duration_ms(),
            standard_repetitions: Self::default_standard_repetitions(),
            standard_gap_ms: Self::default_standard_gap_ms(),
            min_comparison_ms: Self::default_min_comparison_ms(),
            max_comparison_ms: Self::default_max_comparison_ms(),
            ramp_duration_ms: Self::default_ramp_duration_ms(),
            sample_rate: Self::default_sample_rate(),
            initial_delta_fraction: Self::default_initial_delta_fraction(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    #[serde(default)]
    pub design: DesignConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub audio: AudioConfig,
}

fn clamp_unit(name: &str, value: f32) -> f32 {
    if (0.0..=1.0).contains(&value) {
        return value;
    }
    let clamped = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    warn!(value, clamped, "{name} outside [0, 1]");
    clamped
}

fn non_negative(name: &str, value: f32) -> f32 {
    if value >= 0.0 {
        return value;
    }
    warn!(value, "{name} is negative, using 0");
    0.0
}

impl ExperimentConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Clamps values that would otherwise corrupt audio or block counts.
    pub fn sanitized(mut self) -> Self {
        let d = &mut self.design;
        d.proportion_slow = clamp_unit("proportion_slow", d.proportion_slow);
        if d.practice_blocks > d.blocks_total {
            warn!(
                practice_blocks = d.practice_blocks,
                blocks_total = d.blocks_total,
                "more practice blocks than blocks"
            );
            d.practice_blocks = d.blocks_total;
        }

        let t = &mut self.timing;
        t.catch_probability = clamp_unit("catch_probability", t.catch_probability);
        t.pre_trial_sec = non_negative("pre_trial_sec", t.pre_trial_sec);
        t.response_window_sec = non_negative("response_window_sec", t.response_window_sec);
        t.trial_duration_sec = non_negative("trial_duration_sec", t.trial_duration_sec);
        t.jitter_max_sec = non_negative("jitter_max_sec", t.jitter_max_sec);

        let a = &mut self.audio;
        a.tone_amplitude = clamp_unit("tone_amplitude", a.tone_amplitude);
        a.ramp_duration_ms = non_negative("ramp_duration_ms", a.ramp_duration_ms);
        a.min_comparison_ms = non_negative("min_comparison_ms", a.min_comparison_ms);
        if a.max_comparison_ms < a.min_comparison_ms {
            warn!(
                min = a.min_comparison_ms,
                max = a.max_comparison_ms,
                "comparison bounds inverted, swapping"
            );
            std::mem::swap(&mut a.min_comparison_ms, &mut a.max_comparison_ms);
        }
        self
    }

    /// Reads `path`, or writes the defaults there when it does not exist.
    /// Unreadable or malformed files fall back to defaults with a warning.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if path.exists() {
            return match fs::read_to_string(path) {
                Ok(contents) => match Self::from_toml_str(&contents) {
                    Ok(cfg) => cfg.sanitized(),
                    Err(err) => {
                        warn!("failed to parse config {}: {err}; using defaults", path.display());
                        Self::default()
                    }
                },
                Err(err) => {
                    warn!("failed to read config {}: {err}; using defaults", path.display());
                    Self::default()
                }
            };
        }

        let defaults = Self::default();
        match toml::to_string_pretty(&defaults) {
            Ok(text) => {
                if let Err(err) = fs::write(path, text) {
                    warn!("failed to write default config to {}: {err}", path.display());
                }
            }
            Err(err) => warn!("failed to serialize default config: {err}"),
        }
        defaults
    }
}
