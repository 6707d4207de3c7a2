use serde::{Deserialize, Serialize};

/// Whether a comparison tone was shorter or longer than the standard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComparisonType {
    Shorter = 0,
    Longer = 1,
}

impl ComparisonType {
    pub fn from_is_longer(is_longer: bool) -> Self {
        if is_longer { Self::Longer } else { Self::Shorter }
    }

    pub fn is_longer(&self) -> bool {
        matches!(self, Self::Longer)
    }
}

/// Live generating parameters for the auditory stimuli.
///
/// Only the stimulus preparation step writes to this, and only between
/// presentations. Anything that needs to know what was actually played
/// reads a [`StimulusEvent`] instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditoryParameters {
    pub standard_duration_ms: f32,
    pub comparison_duration_ms: f32,
    pub tone_frequency_hz: f32,
    pub tone_amplitude: f32,
    pub comparison_is_longer: bool,
    pub delta_ms: f32,
}

impl AuditoryParameters {
    /// Starts with the comparison equal to the standard.
    pub fn new(
        standard_duration_ms: f32,
        tone_frequency_hz: f32,
        tone_amplitude: f32,
        delta_ms: f32,
    ) -> Self {
        Self {
            standard_duration_ms,
            comparison_duration_ms: standard_duration_ms,
            tone_frequency_hz,
            tone_amplitude,
            comparison_is_longer: true,
            delta_ms,
        }
    }

    pub fn comparison_type(&self) -> ComparisonType {
        ComparisonType::from_is_longer(self.comparison_is_longer)
    }

    /// Freezes the parameters as presented at `onset_time` (trial seconds).
    pub fn snapshot(&self, onset_time: f32) -> StimulusEvent {
        StimulusEvent {
            standard_duration_ms: self.standard_duration_ms,
            comparison_duration_ms: self.comparison_duration_ms,
            comparison_type: self.comparison_type(),
            tone_frequency_hz: self.tone_frequency_hz,
            onset_time,
        }
    }
}

/// What was presented at one comparison onset.
///
/// Fields are private and there are no mutating methods: a snapshot is
/// built once by [`AuditoryParameters::snapshot`] and only ever read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StimulusEvent {
    standard_duration_ms: f32,
    comparison_duration_ms: f32,
    comparison_type: ComparisonType,
    tone_frequency_hz: f32,
    onset_time: f32,
}

impl StimulusEvent {
    pub fn standard_duration_ms(&self) -> f32 {
        self.standard_duration_ms
    }

    pub fn comparison_duration_ms(&self) -> f32 {
        self.comparison_duration_ms
    }

    pub fn comparison_duration_sec(&self) -> f32 {
        self.comparison_duration_ms / 1000.0
    }

    pub fn comparison_type(&self) -> ComparisonType {
        self.comparison_type
    }

    pub fn tone_frequency_hz(&self) -> f32 {
        self.tone_frequency_hz
    }

    pub fn onset_time(&self) -> f32 {
        self.onset_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_survives_parameter_mutation() {
        let mut params = AuditoryParameters::new(100.0, 1000.0, 0.8, 75.0);
        params.comparison_duration_ms = 175.0;
        params.comparison_is_longer = true;

        let event = params.snapshot(2.5);
        let before = event;

        params.comparison_duration_ms = 25.0;
        params.comparison_is_longer = false;
        params.delta_ms = 10.0;
        params.tone_frequency_hz = 500.0;

        assert_eq!(event, before);
        assert_eq!(event.comparison_duration_ms(), 175.0);
        assert_eq!(event.comparison_type(), ComparisonType::Longer);
        assert_eq!(event.tone_frequency_hz(), 1000.0);
        assert_eq!(event.onset_time(), 2.5);
    }

    #[test]
    fn new_parameters_start_at_standard() {
        let params = AuditoryParameters::new(100.0, 1000.0, 0.8, 75.0);
        assert_eq!(params.comparison_duration_ms, params.standard_duration_ms);
        assert_eq!(params.comparison_type(), ComparisonType::Longer);
    }
}
