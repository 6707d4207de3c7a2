//! Scoring a button press against the snapshot of what was played.

use rand::Rng;
use serde::Serialize;
use stride_core::{ResponseAction, ResponseData, StimulusEvent, TrialRecord};
use tracing::debug;

/// Which button means "longer". Drawn once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResponseMapping {
    RightIsLonger,
    LeftIsLonger,
}

impl ResponseMapping {
    pub fn assign<R: Rng>(rng: &mut R) -> Self {
        if rng.random::<f32>() < 0.5 {
            Self::LeftIsLonger
        } else {
            Self::RightIsLonger
        }
    }

    pub fn responded_longer(&self, action: ResponseAction) -> bool {
        matches!(
            (self, action),
            (Self::RightIsLonger, ResponseAction::Right) | (Self::LeftIsLonger, ResponseAction::Left)
        )
    }

    pub fn button_for(&self, longer: bool) -> ResponseAction {
        match (self, longer) {
            (Self::RightIsLonger, true) | (Self::LeftIsLonger, false) => ResponseAction::Right,
            (Self::RightIsLonger, false) | (Self::LeftIsLonger, true) => ResponseAction::Left,
        }
    }

    /// Shown to the experimenter.
    pub fn describe(&self) -> &'static str {
        match self {
            Self::RightIsLonger => "L:Shorter R:Longer",
            Self::LeftIsLonger => "L:Longer R:Shorter",
        }
    }

    /// Instruction labels for the participant, as `[longer, shorter]`.
    pub fn instruction_labels(&self) -> [&'static str; 2] {
        match self {
            Self::RightIsLonger => ["Right click", "Left click"],
            Self::LeftIsLonger => ["Left click", "Right click"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoredResponse {
    pub correct: bool,
    pub responded_longer: bool,
}

/// Scores `action` against `snapshot` and writes the outcome into the open
/// window of `record`. A second call for the same window is rejected and
/// leaves the first outcome in place.
pub fn score(
    snapshot: &StimulusEvent,
    mapping: ResponseMapping,
    action: ResponseAction,
    response_time: f32,
    record: &mut TrialRecord,
) -> stride_core::Result<ScoredResponse> {
    let responded_longer = mapping.responded_longer(action);
    let correct = responded_longer == snapshot.comparison_type().is_longer();

    record.record_response(ResponseData {
        action,
        response_time,
        responded_longer,
        correct,
    })?;

    debug!(
        window = record.window_index(),
        responded_longer,
        was_longer = snapshot.comparison_type().is_longer(),
        correct,
        "response scored"
    );
    Ok(ScoredResponse {
        correct,
        responded_longer,
    })
}
