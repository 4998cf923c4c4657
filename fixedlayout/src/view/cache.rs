use crate::data::ObjectId;

use std::collections::HashMap;

/// Last formatted datum for one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayEntry {
    pub name: String,
    pub value: String,
    pub alarm_class: Option<String>,
}

/// Survives proxy regeneration for the lifetime of the view. Entries for
/// objects that are no longer tracked are simply never read again.
#[derive(Debug, Default)]
pub struct DisplayCache {
    entries: HashMap<ObjectId, DisplayEntry>,
}

impl DisplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, object: &ObjectId) -> Option<&DisplayEntry> {
        self.entries.get(object)
    }

    pub fn record(&mut self, object: &ObjectId, name: &str, value: &str, alarm_class: Option<String>) {
        self.entries.insert(
            object.clone(),
            DisplayEntry {
                name: name.to_string(),
                value: value.to_string(),
                alarm_class,
            },
        );
    }

    /// Blank value for a newly tracked object, so it never shows a stale
    /// or missing placeholder.
    pub fn initialize(&mut self, object: &ObjectId, name: &str) {
        self.record(object, name, "", None);
    }

    /// Forgets values and alarm classes but keeps names.
    pub fn reset_values(&mut self) {
        for entry in self.entries.values_mut() {
            entry.value.clear();
            entry.alarm_class = None;
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
