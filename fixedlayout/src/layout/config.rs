//! Layout document: the externally owned list of element entries plus the
//! grid they are positioned on. Entries are shared handles so a selection
//! can find "the same entry" again by pointer identity.

use crate::data::ObjectId;
use crate::error::ConfigError;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};

pub const TELEMETRY_ELEMENT: &str = "fixed.telemetry";
pub const DEFAULT_GRID_SIZE: GridSize = GridSize { x: 64, y: 16 };

pub type ElementRef = Arc<RwLock<ElementConfig>>;
pub type SharedConfiguration = Arc<RwLock<Configuration>>;

/// Pixel size of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "[i64; 2]", into = "[i64; 2]")]
pub struct GridSize {
    pub x: u32,
    pub y: u32,
}

impl GridSize {
    pub fn new(x: u32, y: u32) -> Result<Self, ConfigError> {
        Self::try_from([i64::from(x), i64::from(y)])
    }
}

impl TryFrom<[i64; 2]> for GridSize {
    type Error = ConfigError;

    fn try_from([x, y]: [i64; 2]) -> Result<Self, Self::Error> {
        match (u32::try_from(x), u32::try_from(y)) {
            (Ok(gx), Ok(gy)) if gx > 0 && gy > 0 => Ok(Self { x: gx, y: gy }),
            _ => Err(ConfigError::InvalidGrid(x, y)),
        }
    }
}

impl From<GridSize> for [i64; 2] {
    fn from(g: GridSize) -> Self {
        [i64::from(g.x), i64::from(g.y)]
    }
}

impl Default for GridSize {
    fn default() -> Self {
        DEFAULT_GRID_SIZE
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementConfig {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub x: i64,
    #[serde(default)]
    pub y: i64,
    #[serde(default)]
    pub width: i64,
    #[serde(default)]
    pub height: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fill: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub titled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x2: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y2: Option<i64>,
}

impl ElementConfig {
    pub fn new(kind: &str, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            kind: kind.to_string(),
            x,
            y,
            width,
            height,
            ..Default::default()
        }
    }

    pub fn telemetry(id: &ObjectId, x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            id: Some(id.to_string()),
            ..Self::new(TELEMETRY_ELEMENT, x, y, width, height)
        }
    }

    /// The tracked object this entry displays, if any.
    pub fn object_id(&self) -> Option<ObjectId> {
        self.id.as_deref()?.parse().ok()
    }

    pub fn into_ref(self) -> ElementRef {
        Arc::new(RwLock::new(self))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct LayoutDocument {
    #[serde(default)]
    layout_grid: GridSize,
    #[serde(default)]
    elements: Vec<ElementConfig>,
}

#[derive(Debug, Default)]
pub struct Configuration {
    pub layout_grid: GridSize,
    pub elements: Vec<ElementRef>,
}

impl Configuration {
    pub fn new(layout_grid: GridSize) -> Self {
        Self {
            layout_grid,
            elements: Vec::new(),
        }
    }

    pub fn shared(self) -> SharedConfiguration {
        Arc::new(RwLock::new(self))
    }

    pub fn push(&mut self, entry: ElementConfig) -> ElementRef {
        let entry = entry.into_ref();
        self.elements.push(entry.clone());
        entry
    }

    pub fn position_of(&self, entry: &ElementRef) -> Option<usize> {
        self.elements.iter().position(|e| Arc::ptr_eq(e, entry))
    }

    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        let doc: LayoutDocument = serde_yaml::from_str(s)?;
        Ok(Self {
            layout_grid: doc.layout_grid,
            elements: doc.elements.into_iter().map(ElementConfig::into_ref).collect(),
        })
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        let doc = LayoutDocument {
            layout_grid: self.layout_grid,
            elements: self.elements.iter().map(|e| e.read().clone()).collect(),
        };
        Ok(serde_yaml::to_string(&doc)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }
}
