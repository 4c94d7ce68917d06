pub mod app_config;
pub mod collection;
pub mod config;
pub mod records;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use collection::{BatchSummary, CollectionResult, CollectionStatus, SkippedRecord, TaskDetail};
pub use config::{load_app_config, load_app_config_from_env};
pub use records::{
    FromRecord, PetClinic, PetRegistration, Record, RecordError, WeatherObservation,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
