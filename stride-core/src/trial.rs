use serde::{Deserialize, Serialize};

use crate::error::{Result, TrialError};

/// Walking condition of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Stationary,
    Slow,
    Natural,
}

impl Condition {
    pub fn code(self) -> u8 {
        match self {
            Condition::Stationary => 0,
            Condition::Slow => 1,
            Condition::Natural => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Condition::Stationary),
            1 => Some(Condition::Slow),
            2 => Some(Condition::Natural),
            _ => None,
        }
    }

    /// Key for per-condition adaptive controller state. Stationary trials
    /// have no controller of their own.
    pub fn controller_label(self) -> Option<&'static str> {
        match self {
            Condition::Stationary => None,
            Condition::Slow => Some("slow"),
            Condition::Natural => Some("natural"),
        }
    }

    pub fn is_stationary(self) -> bool {
        matches!(self, Condition::Stationary)
    }
}

/// A binary button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseAction {
    Left,
    Right,
}

/// Written once, when the trial starts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialContext {
    pub trial_number: usize,
    pub block_id: usize,
    pub trial_in_block: usize,
    pub condition: Condition,
    pub is_stationary: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResponseData {
    pub action: ResponseAction,
    /// Trial-relative seconds.
    pub response_time: f32,
    pub responded_longer: bool,
    pub correct: bool,
}

impl ResponseData {
    /// 1 for a "longer" judgement, 0 for "shorter".
    pub fn response_code(&self) -> u8 {
        u8::from(self.responded_longer)
    }
}

/// Context of the running trial plus the response to the currently open
/// presentation window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrialRecord {
    pub context: TrialContext,
    /// 1-based index of the open window; 0 when no response is valid.
    window_index: usize,
    last_click_time: Option<f32>,
    response: Option<ResponseData>,
}

impl TrialRecord {
    pub fn new(context: TrialContext) -> Self {
        Self {
            context,
            window_index: 0,
            last_click_time: None,
            response: None,
        }
    }

    pub fn window_index(&self) -> usize {
        self.window_index
    }

    pub fn is_window_open(&self) -> bool {
        self.window_index > 0
    }

    /// Opens window `index` and clears the previous window's response.
    pub fn open_window(&mut self, index: usize) {
        self.window_index = index;
        self.response = None;
    }

    pub fn close_window(&mut self) {
        self.window_index = 0;
    }

    pub fn note_click(&mut self, trial_time: f32) {
        self.last_click_time = Some(trial_time);
    }

    pub fn last_click_time(&self) -> Option<f32> {
        self.last_click_time
    }

    /// Write-once per window: a second write is rejected and leaves the
    /// first response in place.
    pub fn record_response(&mut self, data: ResponseData) -> Result<()> {
        if !self.is_window_open() {
            return Err(TrialError::NoOpenWindow);
        }
        if self.response.is_some() {
            return Err(TrialError::AlreadyResponded {
                window: self.window_index,
            });
        }
        self.response = Some(data);
        Ok(())
    }

    pub fn response(&self) -> Option<&ResponseData> {
        self.response.as_ref()
    }

    pub fn has_responded(&self) -> bool {
        self.response.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TrialContext {
        TrialContext {
            trial_number: 4,
            block_id: 0,
            trial_in_block: 4,
            condition: Condition::Natural,
            is_stationary: false,
        }
    }

    fn response(correct: bool) -> ResponseData {
        ResponseData {
            action: ResponseAction::Right,
            response_time: 3.1,
            responded_longer: true,
            correct,
        }
    }

    #[test]
    fn condition_codes_round_trip() {
        for c in [Condition::Stationary, Condition::Slow, Condition::Natural] {
            assert_eq!(Condition::from_code(c.code()), Some(c));
        }
        assert_eq!(Condition::from_code(7), None);
    }

    #[test]
    fn stationary_has_no_controller_label() {
        assert_eq!(Condition::Stationary.controller_label(), None);
        assert_eq!(Condition::Slow.controller_label(), Some("slow"));
        assert_eq!(Condition::Natural.controller_label(), Some("natural"));
    }

    #[test]
    fn response_requires_open_window() {
        let mut record = TrialRecord::new(context());
        assert_eq!(
            record.record_response(response(true)),
            Err(TrialError::NoOpenWindow)
        );
    }

    #[test]
    fn second_response_is_rejected() {
        let mut record = TrialRecord::new(context());
        record.open_window(2);
        record.record_response(response(true)).unwrap();

        let err = record.record_response(response(false)).unwrap_err();
        assert_eq!(err, TrialError::AlreadyResponded { window: 2 });
        assert!(record.response().unwrap().correct);
    }

    #[test]
    fn opening_a_window_clears_the_previous_response() {
        let mut record = TrialRecord::new(context());
        record.open_window(1);
        record.record_response(response(true)).unwrap();
        record.close_window();
        record.open_window(2);
        assert!(!record.has_responded());
        assert_eq!(record.window_index(), 2);
    }
}
