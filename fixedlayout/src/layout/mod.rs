mod config;
mod handles;
mod proxy;

pub use config::{
    Configuration, ElementConfig, ElementRef, GridSize, SharedConfiguration, DEFAULT_GRID_SIZE,
    TELEMETRY_ELEMENT,
};
pub use handles::{DragHandle, HandleKind, HandleSet};
pub use proxy::{ElementKind, ElementProxy, Geometry, PixelStyle, ProxyModel};
