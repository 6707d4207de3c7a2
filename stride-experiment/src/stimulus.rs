//! Stimulus preparation: the single writer of [`AuditoryParameters`].

use rand::Rng;
use stride_audio::{ToneBuffer, synthesize};
use stride_core::{AuditoryParameters, StimulusEvent};
use tracing::debug;

use crate::config::AudioConfig;

/// Draws the direction of the next comparison, offsets the standard by the
/// current delta, clamps into `[min_comparison_ms, max_comparison_ms]` and
/// synthesizes the tone.
pub fn prepare_next<R: Rng>(
    current: &AuditoryParameters,
    audio: &AudioConfig,
    rng: &mut R,
) -> (AuditoryParameters, ToneBuffer) {
    let mut next = current.clone();
    let delta = current.delta_ms.abs();
    next.comparison_is_longer = rng.random::<f32>() < 0.5;

    let raw = if next.comparison_is_longer {
        current.standard_duration_ms + delta
    } else {
        current.standard_duration_ms - delta
    };
    let raw = if raw.is_nan() { current.standard_duration_ms } else { raw };
    next.comparison_duration_ms = raw.max(audio.min_comparison_ms).min(audio.max_comparison_ms);

    let buffer = synthesize(
        next.comparison_duration_ms / 1000.0,
        next.tone_frequency_hz,
        next.tone_amplitude,
        audio.sample_rate,
        audio.ramp_duration_ms,
    );

    debug!(
        comparison_ms = next.comparison_duration_ms,
        delta_ms = delta,
        longer = next.comparison_is_longer,
        "next comparison prepared"
    );
    (next, buffer)
}

/// Owns the live parameters and the buffers synthesized from them.
#[derive(Debug, Clone)]
pub struct StimulusPreparer {
    audio: AudioConfig,
    params: AuditoryParameters,
    standard: ToneBuffer,
    comparison: Option<ToneBuffer>,
}

impl StimulusPreparer {
    /// Synthesizes the standard once; no comparison exists until the first
    /// [`prepare_next`](Self::prepare_next).
    pub fn new(audio: &AudioConfig) -> Self {
        let params = AuditoryParameters::new(
            audio.standard_duration_ms,
            audio.tone_frequency_hz,
            audio.tone_amplitude,
            audio.initial_delta_ms(),
        );
        let standard = synthesize(
            audio.standard_duration_ms / 1000.0,
            audio.tone_frequency_hz,
            audio.tone_amplitude,
            audio.sample_rate,
            audio.ramp_duration_ms,
        );
        Self {
            audio: audio.clone(),
            params,
            standard,
            comparison: None,
        }
    }

    pub fn prepare_next<R: Rng>(&mut self, rng: &mut R) -> &AuditoryParameters {
        let (params, buffer) = prepare_next(&self.params, &self.audio, rng);
        self.params = params;
        self.comparison = Some(buffer);
        &self.params
    }

    pub fn set_delta(&mut self, delta_ms: f32) {
        self.params.delta_ms = delta_ms;
    }

    pub fn parameters(&self) -> &AuditoryParameters {
        &self.params
    }

    pub fn snapshot(&self, onset_time: f32) -> StimulusEvent {
        self.params.snapshot(onset_time)
    }

    pub fn standard_buffer(&self) -> &ToneBuffer {
        &self.standard
    }

    pub fn comparison_buffer(&self) -> Option<&ToneBuffer> {
        self.comparison.as_ref()
    }

    pub fn standard_interval_sec(&self) -> f32 {
        (self.audio.standard_duration_ms + self.audio.standard_gap_ms) / 1000.0
    }

    pub fn standard_repetitions(&self) -> usize {
        self.audio.standard_repetitions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use stride_core::ComparisonType;

    #[test]
    fn comparison_stays_inside_bounds_for_any_delta() {
        let audio = AudioConfig::default();
        let mut rng = StdRng::seed_from_u64(21);
        for delta in [0.0f32, 10.0, 75.0, 99.0, 500.0, 10_000.0, -10_000.0] {
            let mut params = AuditoryParameters::new(100.0, 1000.0, 0.8, delta);
            for _ in 0..20 {
                let (next, buf) = prepare_next(&params, &audio, &mut rng);
                assert!(
                    (10.0..=1000.0).contains(&next.comparison_duration_ms),
                    "delta {delta}: {}",
                    next.comparison_duration_ms
                );
                let expected = (next.comparison_duration_ms / 1000.0 * 44_100.0).ceil() as usize;
                assert_eq!(buf.len(), expected);
                params = next;
            }
        }
    }

    #[test]
    fn direction_matches_duration() {
        let audio = AudioConfig::default();
        let mut rng = StdRng::seed_from_u64(22);
        let params = AuditoryParameters::new(100.0, 1000.0, 0.8, 40.0);
        for _ in 0..50 {
            let (next, _) = prepare_next(&params, &audio, &mut rng);
            match next.comparison_type() {
                ComparisonType::Longer => assert_eq!(next.comparison_duration_ms, 140.0),
                ComparisonType::Shorter => assert_eq!(next.comparison_duration_ms, 60.0),
            }
        }
    }

    #[test]
    fn both_directions_are_drawn() {
        let audio = AudioConfig::default();
        let mut rng = StdRng::seed_from_u64(23);
        let params = AuditoryParameters::new(100.0, 1000.0, 0.8, 40.0);
        let longer = (0..1000)
            .filter(|_| prepare_next(&params, &audio, &mut rng).0.comparison_is_longer)
            .count();
        assert!((400..=600).contains(&longer), "{longer}");
    }

    #[test]
    fn preparer_starts_without_a_comparison() {
        let mut prep = StimulusPreparer::new(&AudioConfig::default());
        assert!(prep.comparison_buffer().is_none());
        assert_eq!(prep.parameters().delta_ms, 75.0);
        assert_eq!(prep.standard_buffer().len(), 4410);

        prep.prepare_next(&mut StdRng::seed_from_u64(24));
        assert!(prep.comparison_buffer().is_some());
    }

    #[test]
    fn snapshot_is_independent_of_later_preparation() {
        let mut prep = StimulusPreparer::new(&AudioConfig::default());
        let mut rng = StdRng::seed_from_u64(25);
        prep.prepare_next(&mut rng);
        let event = prep.snapshot(3.0);
        let frozen = event;

        prep.set_delta(5.0);
        for _ in 0..10 {
            prep.prepare_next(&mut rng);
        }
        assert_eq!(event, frozen);
        assert!((event.comparison_duration_ms() - 100.0).abs() == 75.0);
    }
}
