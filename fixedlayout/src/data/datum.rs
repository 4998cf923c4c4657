use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DatumValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl DatumValue {
    pub fn try_as_f64(&self) -> Option<f64> {
        match *self {
            DatumValue::Int(i) => Some(i as f64),
            DatumValue::UInt(u) => Some(u as f64),
            DatumValue::Float(f) if f.is_finite() => Some(f),
            _ => None,
        }
    }
}

impl std::fmt::Display for DatumValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatumValue::Bool(x) => write!(f, "{}", x),
            DatumValue::Int(x) => write!(f, "{}", x),
            DatumValue::UInt(x) => write!(f, "{}", x),
            DatumValue::Float(x) => write!(f, "{}", x),
            DatumValue::Text(x) => write!(f, "{}", x),
        }
    }
}

impl From<f64> for DatumValue {
    fn from(v: f64) -> Self {
        DatumValue::Float(v)
    }
}

impl From<i64> for DatumValue {
    fn from(v: i64) -> Self {
        DatumValue::Int(v)
    }
}

impl From<&str> for DatumValue {
    fn from(v: &str) -> Self {
        DatumValue::Text(v.to_string())
    }
}

/// One telemetry point: an opaque key/value record. Which key orders the
/// points is decided by the buffer holding it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Datum {
    fields: BTreeMap<String, DatumValue>,
}

impl Datum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: &str, value: impl Into<DatumValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<DatumValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&DatumValue> {
        self.fields.get(key)
    }

    /// Numeric value of `key`, if present and numeric.
    pub fn domain_value(&self, key: &str) -> Option<f64> {
        self.get(key)?.try_as_f64()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &DatumValue)> {
        self.fields.iter()
    }
}

impl std::fmt::Display for Datum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DATUM")?;
        for (k, v) in &self.fields {
            write!(f, " {}: {}", k, v)?;
        }
        Ok(())
    }
}
