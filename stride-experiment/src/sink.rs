use serde::Serialize;
use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};
use stride_core::{ComparisonType, Condition, StimulusEvent, TrialRecord};

use crate::error::Result;
use crate::ports::PersistenceSink;

/// One finalized presentation, flattened for storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub trial_number: usize,
    pub block_id: usize,
    pub trial_in_block: usize,
    pub condition: Condition,
    pub is_stationary: bool,
    pub window: usize,
    pub onset_time: f32,
    pub standard_duration_ms: f32,
    pub comparison_duration_ms: f32,
    pub comparison_type: ComparisonType,
    pub tone_frequency_hz: f32,
    pub click_time: Option<f32>,
    pub responded: bool,
    pub response_time: Option<f32>,
    pub responded_longer: Option<bool>,
    pub correct: Option<bool>,
}

impl EventRow {
    pub fn new(record: &TrialRecord, event: &StimulusEvent) -> Self {
        let response = record.response();
        Self {
            trial_number: record.context.trial_number,
            block_id: record.context.block_id,
            trial_in_block: record.context.trial_in_block,
            condition: record.context.condition,
            is_stationary: record.context.is_stationary,
            window: record.window_index(),
            onset_time: event.onset_time(),
            standard_duration_ms: event.standard_duration_ms(),
            comparison_duration_ms: event.comparison_duration_ms(),
            comparison_type: event.comparison_type(),
            tone_frequency_hz: event.tone_frequency_hz(),
            click_time: record.last_click_time(),
            responded: response.is_some(),
            response_time: response.map(|r| r.response_time),
            responded_longer: response.map(|r| r.responded_longer),
            correct: response.map(|r| r.correct),
        }
    }
}

/// Writes one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> PersistenceSink for JsonLinesSink<W> {
    fn persist(&mut self, record: &TrialRecord, event: &StimulusEvent) -> Result<()> {
        serde_json::to_writer(&mut self.writer, &EventRow::new(record, event))?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps rows in memory. Clones share storage, so one handle can be given
/// to the scheduler and another kept for reading.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    rows: Arc<Mutex<Vec<EventRow>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> Vec<EventRow> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PersistenceSink for MemorySink {
    fn persist(&mut self, record: &TrialRecord, event: &StimulusEvent) -> Result<()> {
        self.rows
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(EventRow::new(record, event));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_core::{AuditoryParameters, ResponseAction, ResponseData, TrialContext};

    fn record() -> TrialRecord {
        let mut r = TrialRecord::new(TrialContext {
            trial_number: 3,
            block_id: 0,
            trial_in_block: 3,
            condition: Condition::Slow,
            is_stationary: false,
        });
        r.open_window(2);
        r
    }

    fn event() -> StimulusEvent {
        AuditoryParameters::new(100.0, 1000.0, 0.8, 75.0).snapshot(4.25)
    }

    #[test]
    fn json_lines_one_object_per_row() {
        let mut sink = JsonLinesSink::new(Vec::new());
        let mut r = record();
        sink.persist(&r, &event()).unwrap();
        r.record_response(ResponseData {
            action: ResponseAction::Left,
            response_time: 4.6,
            responded_longer: false,
            correct: false,
        })
        .unwrap();
        sink.persist(&r, &event()).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let missed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(missed["responded"], false);
        assert_eq!(missed["condition"], "slow");
        assert_eq!(missed["window"], 2);
        assert!(missed["correct"].is_null());

        let scored: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(scored["responded"], true);
        assert_eq!(scored["correct"], false);
        assert_eq!(scored["comparison_type"], "Longer");
    }

    #[test]
    fn memory_sink_clones_share_rows() {
        let reader = MemorySink::new();
        let mut writer = reader.clone();
        writer.persist(&record(), &event()).unwrap();
        assert_eq!(reader.len(), 1);
        assert_eq!(reader.rows()[0].onset_time, 4.25);
    }
}
