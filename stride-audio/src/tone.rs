//! Ramped sine tones.
//!
//! A rectangular-windowed tone produces an audible click at onset and
//! offset. Every tone here is shaped by a raised-cosine ramp at both ends
//! so the only cue the listener gets is its duration.

use std::f64::consts::PI;

use tracing::warn;

pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Mono sample buffer ready for playback.
#[derive(Debug, Clone, PartialEq)]
pub struct ToneBuffer {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl ToneBuffer {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }

    pub fn peak(&self) -> f32 {
        self.samples.iter().fold(0.0, |m, s| m.max(s.abs()))
    }
}

/// `ceil(duration_sec * sample_rate)`, at least one sample.
pub fn sample_count(duration_sec: f32, sample_rate: u32) -> usize {
    let raw = (duration_sec * sample_rate as f32).ceil();
    if raw.is_finite() && raw >= 1.0 { raw as usize } else { 1 }
}

/// Ramp length in samples, capped at half the signal so onset and offset
/// ramps never overlap.
pub fn ramp_samples(ramp_duration_ms: f32, sample_rate: u32, sample_count: usize) -> usize {
    let raw = (ramp_duration_ms / 1000.0 * sample_rate as f32).ceil();
    let ramp = if raw.is_finite() && raw > 0.0 { raw as usize } else { 0 };
    ramp.min(sample_count / 2)
}

/// Gain applied to sample `index`. The offset ramp is the exact mirror of
/// the onset ramp, so the first and last samples are both silent.
pub fn envelope_gain(index: usize, sample_count: usize, ramp_samples: usize) -> f32 {
    if ramp_samples == 0 || index >= sample_count {
        return 1.0;
    }
    let from_edge = if index < ramp_samples {
        index
    } else if index >= sample_count - ramp_samples {
        sample_count - 1 - index
    } else {
        return 1.0;
    };
    let fraction = from_edge as f64 / ramp_samples as f64;
    (0.5 * (1.0 - (PI * fraction).cos())) as f32
}

/// Synthesizes a raised-cosine windowed sine tone.
///
/// Out-of-range inputs are clamped rather than rejected: amplitude into
/// `[0, 1]`, negative or non-finite durations to a single sample, a zero
/// sample rate to [`DEFAULT_SAMPLE_RATE`].
pub fn synthesize(
    duration_sec: f32,
    frequency_hz: f32,
    amplitude: f32,
    sample_rate: u32,
    ramp_duration_ms: f32,
) -> ToneBuffer {
    let sample_rate = if sample_rate == 0 {
        warn!("sample rate of 0 requested, using {DEFAULT_SAMPLE_RATE}");
        DEFAULT_SAMPLE_RATE
    } else {
        sample_rate
    };
    let amplitude = if (0.0..=1.0).contains(&amplitude) {
        amplitude
    } else {
        let clamped = if amplitude.is_nan() { 0.0 } else { amplitude.clamp(0.0, 1.0) };
        warn!(amplitude, clamped, "tone amplitude outside [0, 1]");
        clamped
    };

    let count = sample_count(duration_sec, sample_rate);
    let ramp = ramp_samples(ramp_duration_ms, sample_rate, count);
    let step = 2.0 * PI * frequency_hz as f64 / sample_rate as f64;

    let samples = (0..count)
        .map(|i| {
            let s = amplitude as f64 * (step * i as f64).sin();
            s as f32 * envelope_gain(i, count, ramp)
        })
        .collect();

    ToneBuffer {
        samples,
        sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: u32 = 44_100;

    #[test]
    fn sample_count_matches_duration() {
        for ms in [10.0f32, 25.0, 75.0, 100.0, 175.0, 333.0, 1000.0] {
            let buf = synthesize(ms / 1000.0, 1000.0, 0.8, SR, 5.0);
            let expected = (ms / 1000.0 * SR as f32).ceil() as usize;
            assert_eq!(buf.len(), expected, "{ms} ms");
        }
    }

    #[test]
    fn edges_are_silent() {
        for ms in [10.0f32, 50.0, 100.0, 1000.0] {
            let buf = synthesize(ms / 1000.0, 1000.0, 0.8, SR, 5.0);
            let s = buf.samples();
            assert_abs_diff_eq!(s[0], 0.0, epsilon = 1e-6);
            assert_abs_diff_eq!(s[s.len() - 1], 0.0, epsilon = 1e-6);
        }
    }

    #[test]
    fn envelope_is_symmetric() {
        let count = sample_count(0.1, SR);
        let ramp = ramp_samples(5.0, SR, count);
        let env: Vec<f32> = (0..count).map(|i| envelope_gain(i, count, ramp)).collect();
        let reversed: Vec<f32> = env.iter().rev().cloned().collect();
        for (a, b) in env.iter().zip(&reversed) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(env[count / 2], 1.0);
    }

    #[test]
    fn samples_stay_inside_envelope() {
        let buf = synthesize(0.05, 1000.0, 0.5, SR, 5.0);
        let count = buf.len();
        let ramp = ramp_samples(5.0, SR, count);
        for (i, s) in buf.samples().iter().enumerate() {
            assert!(s.abs() <= 0.5 * envelope_gain(i, count, ramp) + 1e-6);
        }
        assert!(buf.peak() > 0.49);
    }

    #[test]
    fn ramp_never_exceeds_half_the_tone() {
        let count = sample_count(0.004, SR);
        assert_eq!(ramp_samples(5.0, SR, count), count / 2);
        assert_eq!(ramp_samples(5.0, SR, 10_000), 221);
        assert_eq!(ramp_samples(0.0, SR, 10_000), 0);
        assert_eq!(ramp_samples(-3.0, SR, 10_000), 0);
    }

    #[test]
    fn degenerate_inputs_are_clamped() {
        assert_eq!(synthesize(0.0, 1000.0, 0.8, SR, 5.0).len(), 1);
        assert_eq!(synthesize(-1.0, 1000.0, 0.8, SR, 5.0).len(), 1);
        assert_eq!(synthesize(f32::NAN, 1000.0, 0.8, SR, 5.0).len(), 1);

        let loud = synthesize(0.1, 1000.0, 3.0, SR, 5.0);
        assert!(loud.peak() <= 1.0 + 1e-6);

        let default_rate = synthesize(0.1, 1000.0, 0.8, 0, 5.0);
        assert_eq!(default_rate.sample_rate(), DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn no_ramp_leaves_the_sine_untouched() {
        let buf = synthesize(0.01, 441.0, 1.0, SR, 0.0);
        let step = 2.0 * std::f64::consts::PI * 441.0 / SR as f64;
        assert_abs_diff_eq!(buf.samples()[25], (step * 25.0).sin() as f32, epsilon = 1e-6);
    }

    #[test]
    fn duration_reported_from_samples() {
        let buf = synthesize(0.1, 1000.0, 0.8, SR, 5.0);
        assert_abs_diff_eq!(buf.duration_secs(), 0.1, epsilon = 1.0 / SR as f32);
    }
}
