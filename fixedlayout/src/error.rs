use crate::data::ObjectId;
use thiserror::Error;

/// Failures reported by the external collaborators. They are logged and
/// otherwise leave the affected object blank; none of them ends the view.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Composition of {0} could not be loaded: {1}")]
    CompositionFailed(ObjectId, String),

    #[error("Historical request for {0} failed: {1}")]
    RequestFailed(ObjectId, String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access layout document")]
    Io(#[from] std::io::Error),

    #[error("Invalid layout document")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Grid size must be positive, got [{0}, {1}]")]
    InvalidGrid(i64, i64),

    #[error("Invalid setting: {0}")]
    Invalid(String),
}
