use crate::data::DEFAULT_FUTURE_CAPACITY;
use crate::error::ConfigError;

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewOptions {
    /// Grid-unit size of elements created by a drop.
    pub default_dimensions: [u32; 2],
    /// Pixel size of drag handles.
    pub drag_handle_size: [u32; 2],
    /// Sort key used when no time system is active.
    pub default_domain_key: String,
    pub future_capacity: usize,
    pub drop_commit_message: String,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            default_dimensions: [2, 1],
            drag_handle_size: [6, 6],
            default_domain_key: "utc".to_string(),
            future_capacity: DEFAULT_FUTURE_CAPACITY,
            drop_commit_message: "Dropped an element.".to_string(),
        }
    }
}

impl ViewOptions {
    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }
}
