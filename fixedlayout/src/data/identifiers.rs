use std::str::FromStr;

pub type Generation = u64;
pub type ListenerId = usize;

/// Identity of a tracked object. Keys both the telemetry buffers and the
/// display cache.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct ObjectId {
    pub namespace: String,
    pub key: String,
}

impl ObjectId {
    pub fn new(namespace: &str, key: &str) -> Self {
        Self {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    pub fn from_key(key: &str) -> Self {
        Self::new("", key)
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.namespace.is_empty() {
            write!(f, "{}", self.key)
        } else {
            write!(f, "{}:{}", self.namespace, self.key)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidObjectId;

impl FromStr for ObjectId {
    type Err = InvalidObjectId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (namespace, key) = match s.split_once(':') {
            Some((ns, key)) => (ns, key),
            None => ("", s),
        };
        if key.is_empty() {
            return Err(InvalidObjectId);
        }
        Ok(Self::new(namespace, key))
    }
}

/// A tracked object as handed to us by the composition provider.
#[derive(Debug, Clone, PartialEq)]
pub struct DomainObject {
    pub id: ObjectId,
    pub name: String,
    pub kind: String,
}

impl DomainObject {
    pub fn new(id: ObjectId, name: &str, kind: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            kind: kind.to_string(),
        }
    }
}

/// Time window `[start, end]` in domain units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub start: f64,
    pub end: f64,
}

impl Bounds {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, t: f64) -> bool {
        t >= self.start && t <= self.end
    }
}

impl std::fmt::Display for Bounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
