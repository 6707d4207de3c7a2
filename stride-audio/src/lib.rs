pub mod output;
pub mod tone;

pub use output::{AudioOutput, NullOutput, RecordingOutput};
pub use tone::{DEFAULT_SAMPLE_RATE, ToneBuffer, envelope_gain, ramp_samples, sample_count, synthesize};
