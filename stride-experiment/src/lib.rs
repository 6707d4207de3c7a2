pub mod config;
pub mod design;
pub mod error;
pub mod ports;
pub mod schedule;
pub mod scorer;
pub mod sink;
pub mod state;
pub mod stimulus;
pub mod summary;

pub use config::{AudioConfig, DesignConfig, ExperimentConfig, TimingConfig};
pub use design::{BlockDesign, DesignRow};
pub use error::{ExperimentError, Result};
pub use ports::{
    AdaptiveController, Collaborators, FeedbackDisplay, FeedbackState, FixedDeltaController,
    InputState, PersistenceSink, WalkingGuide,
};
pub use schedule::{JitteredScheduleGenerator, OnsetSchedule, OnsetScheduleProvider};
pub use scorer::{ResponseMapping, ScoredResponse};
pub use sink::{EventRow, JsonLinesSink, MemorySink};
pub use state::{CatchPolicy, TrialEvent, TrialStateMachine};
pub use stimulus::StimulusPreparer;
pub use summary::{ConditionStats, SessionSummary};
