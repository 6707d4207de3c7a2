use tracing::debug;

use crate::tone::ToneBuffer;

/// Playback device seen by the trial scheduler. Playback is fire-and-forget:
/// the scheduler does its own timing and never waits on the device.
pub trait AudioOutput {
    fn play(&mut self, buffer: &ToneBuffer);
    fn stop_all(&mut self);
}

/// Discards audio. Used when no device is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullOutput;

impl AudioOutput for NullOutput {
    fn play(&mut self, buffer: &ToneBuffer) {
        debug!(
            samples = buffer.len(),
            duration_ms = buffer.duration_secs() * 1000.0,
            "tone dropped (no audio device)"
        );
    }

    fn stop_all(&mut self) {}
}

/// Keeps the duration of every buffer it was asked to play.
#[derive(Debug, Default, Clone)]
pub struct RecordingOutput {
    pub played_ms: Vec<f32>,
    pub stops: usize,
}

impl AudioOutput for RecordingOutput {
    fn play(&mut self, buffer: &ToneBuffer) {
        self.played_ms.push(buffer.duration_secs() * 1000.0);
    }

    fn stop_all(&mut self) {
        self.stops += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tone::synthesize;

    #[test]
    fn recording_output_logs_durations() {
        let mut out = RecordingOutput::default();
        out.play(&synthesize(0.1, 1000.0, 0.8, 44_100, 5.0));
        out.play(&synthesize(0.025, 1000.0, 0.8, 44_100, 5.0));
        out.stop_all();
        assert_eq!(out.played_ms.len(), 2);
        assert!((out.played_ms[0] - 100.0).abs() < 0.05);
        assert_eq!(out.stops, 1);
    }
}
