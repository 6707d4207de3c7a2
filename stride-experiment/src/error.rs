use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperimentError {
    #[error("no onset schedule for trial {trial}")]
    MissingSchedule { trial: usize },

    #[error("trial {trial} is already in progress")]
    TrialInProgress { trial: usize },

    #[error("trial {trial} is past the end of the block design ({len} trials)")]
    DesignExhausted { trial: usize, len: usize },

    #[error("no stimulus has been presented in this window")]
    NoSnapshot,

    #[error(transparent)]
    Trial(#[from] stride_core::TrialError),

    #[error("config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExperimentError>;
