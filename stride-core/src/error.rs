use thiserror::Error;

/// Errors raised while writing the response half of a trial record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrialError {
    #[error("response already recorded for window {window}")]
    AlreadyResponded { window: usize },

    #[error("no response window is open")]
    NoOpenWindow,
}

pub type Result<T> = std::result::Result<T, TrialError>;
