use crate::data::{Datum, DatumValue};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValueMetadata {
    pub key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    /// Hint name to priority; lower values rank first.
    #[serde(default)]
    pub hints: BTreeMap<String, i32>,
}

impl ValueMetadata {
    pub fn new(key: &str, name: &str) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn hint(mut self, hint: &str, priority: i32) -> Self {
        self.hints.insert(hint.to_string(), priority);
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TelemetryMetadata {
    values: Vec<ValueMetadata>,
}

impl TelemetryMetadata {
    pub fn new(values: Vec<ValueMetadata>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[ValueMetadata] {
        &self.values
    }

    pub fn value(&self, key: &str) -> Option<&ValueMetadata> {
        self.values.iter().find(|v| v.key == key)
    }

    /// Values carrying every hint in `hints`, best ranked first.
    pub fn values_for_hints(&self, hints: &[&str]) -> Vec<&ValueMetadata> {
        let mut matching: Vec<&ValueMetadata> = self
            .values
            .iter()
            .filter(|v| hints.iter().all(|h| v.hints.contains_key(*h)))
            .collect();
        matching.sort_by_key(|v| {
            hints
                .iter()
                .map(|h| v.hints.get(*h).copied().unwrap_or(i32::MAX))
                .collect::<Vec<_>>()
        });
        matching
    }
}

pub trait ValueFormatter {
    fn format(&self, value: &DatumValue) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Limit {
    pub name: String,
    pub css_class: String,
}

pub trait LimitEvaluator {
    fn evaluate(&self, datum: &Datum, range_key: &str) -> Option<Limit>;
}
