pub mod error;
pub mod phase;
pub mod stimulus;
pub mod trial;

pub use error::{Result, TrialError};
pub use phase::TrialPhase;
pub use stimulus::{AuditoryParameters, ComparisonType, StimulusEvent};
pub use trial::{Condition, ResponseAction, ResponseData, TrialContext, TrialRecord};
