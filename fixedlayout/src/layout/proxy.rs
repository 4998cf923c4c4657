//! Element proxies
//! Display-ready wrappers derived from the layout document on every
//! regeneration. A proxy never owns its entry; it holds the shared handle and
//! the entry's position in the document.

use crate::data::ObjectId;
use crate::layout::{Configuration, ElementRef, GridSize, HandleSet, TELEMETRY_ELEMENT};
use crate::view::{DisplayCache, DisplayEntry};

use std::{collections::HashMap, sync::Arc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Telemetry,
    Box,
    Line,
    Text,
    Image,
}

impl ElementKind {
    pub fn from_type(kind: &str) -> Option<Self> {
        match kind {
            TELEMETRY_ELEMENT => Some(Self::Telemetry),
            "fixed.box" => Some(Self::Box),
            "fixed.line" => Some(Self::Line),
            "fixed.text" => Some(Self::Text),
            "fixed.image" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Position and size in grid units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

/// Position and size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelStyle {
    pub left: i64,
    pub top: i64,
    pub width: i64,
    pub height: i64,
}

impl PixelStyle {
    pub fn from_geometry(g: Geometry, grid: GridSize) -> Self {
        let (gx, gy) = (i64::from(grid.x), i64::from(grid.y));
        Self {
            left: g.x.saturating_mul(gx),
            top: g.y.saturating_mul(gy),
            width: g.width.saturating_mul(gx),
            height: g.height.saturating_mul(gy),
        }
    }

    pub fn css(&self) -> [(&'static str, String); 4] {
        [
            ("left", format!("{}px", self.left)),
            ("top", format!("{}px", self.top)),
            ("width", format!("{}px", self.width)),
            ("height", format!("{}px", self.height)),
        ]
    }
}

impl std::fmt::Display for PixelStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .css()
            .iter()
            .map(|(k, v)| format!("{}: {}", k, v))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

#[derive(Debug, Clone)]
pub struct ElementProxy {
    element: ElementRef,
    index: usize,
    kind: ElementKind,
    object: Option<ObjectId>,
    pub style: PixelStyle,
    pub template: String,
    pub display: Option<DisplayEntry>,
}

impl ElementProxy {
    /// `None` for entry types the view does not render.
    pub fn new(element: ElementRef, index: usize, grid: GridSize) -> Option<Self> {
        let (kind, template, object) = {
            let entry = element.read();
            let kind = ElementKind::from_type(&entry.kind)?;
            let object = match kind {
                ElementKind::Telemetry => entry.object_id(),
                _ => None,
            };
            (kind, entry.kind.clone(), object)
        };

        let mut proxy = Self {
            element,
            index,
            kind,
            object,
            style: PixelStyle::default(),
            template,
            display: None,
        };
        proxy.restyle(grid);
        Some(proxy)
    }

    pub fn element(&self) -> &ElementRef {
        &self.element
    }

    /// Position of the underlying entry in the layout document.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn object_id(&self) -> Option<&ObjectId> {
        self.object.as_ref()
    }

    pub fn geometry(&self) -> Geometry {
        let e = self.element.read();
        match self.kind {
            ElementKind::Line => {
                let (x2, y2) = (e.x2.unwrap_or(e.x), e.y2.unwrap_or(e.y));
                Geometry {
                    x: e.x.min(x2),
                    y: e.y.min(y2),
                    width: x2.saturating_sub(e.x).saturating_abs().max(1),
                    height: y2.saturating_sub(e.y).saturating_abs().max(1),
                }
            }
            _ => Geometry {
                x: e.x,
                y: e.y,
                width: e.width,
                height: e.height,
            },
        }
    }

    pub fn restyle(&mut self, grid: GridSize) {
        self.style = PixelStyle::from_geometry(self.geometry(), grid);
    }
}

/// Current proxies, the selection among them and the object index used to
/// route refreshed values.
pub struct ProxyModel {
    proxies: Vec<ElementProxy>,
    by_object: HashMap<ObjectId, Vec<usize>>,
    selected: Option<usize>,
    handles: Option<HandleSet>,
    grid: GridSize,
    handle_size: [u32; 2],
}

impl ProxyModel {
    pub fn new(grid: GridSize, handle_size: [u32; 2]) -> Self {
        Self {
            proxies: Vec::new(),
            by_object: HashMap::new(),
            selected: None,
            handles: None,
            grid,
            handle_size,
        }
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn proxies(&self) -> &[ElementProxy] {
        &self.proxies
    }

    pub fn get(&self, i: usize) -> Option<&ElementProxy> {
        self.proxies.get(i)
    }

    pub fn proxies_for(&self, object: &ObjectId) -> &[usize] {
        self.by_object.get(object).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rebuilds every proxy from `config`. Telemetry proxies pick up their
    /// cached display entry so redisplay does not flash blank. A selected
    /// entry that survives the edit stays selected.
    pub fn regenerate(&mut self, config: &Configuration, cache: &DisplayCache) {
        let previous = self.selected().map(|p| p.element.clone());

        self.proxies = config
            .elements
            .iter()
            .enumerate()
            .filter_map(|(i, e)| ElementProxy::new(e.clone(), i, self.grid))
            .collect();

        self.by_object.clear();
        for (i, proxy) in self.proxies.iter_mut().enumerate() {
            if let Some(id) = &proxy.object {
                proxy.display = cache.get(id).cloned();
                self.by_object.entry(id.clone()).or_default().push(i);
            }
        }

        self.selected = None;
        self.handles = None;
        if let Some(previous) = previous {
            if let Some(i) = self
                .proxies
                .iter()
                .position(|p| Arc::ptr_eq(&p.element, &previous))
            {
                self.select(i);
            }
        }
    }

    /// Pushes the cached entry for `object` into every proxy showing it.
    pub fn apply_display(&mut self, object: &ObjectId, entry: Option<&DisplayEntry>) -> usize {
        let Some(indices) = self.by_object.get(object) else {
            return 0;
        };
        for &i in indices {
            self.proxies[i].display = entry.cloned();
        }
        indices.len()
    }

    pub fn set_grid(&mut self, grid: GridSize) {
        self.grid = grid;
        for proxy in self.proxies.iter_mut() {
            proxy.restyle(grid);
        }
        self.regenerate_handles();
    }

    pub fn select(&mut self, i: usize) -> bool {
        if i >= self.proxies.len() {
            return false;
        }
        self.selected = Some(i);
        self.regenerate_handles();
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
        self.handles = None;
    }

    pub fn selected(&self) -> Option<&ElementProxy> {
        self.selected.and_then(|i| self.proxies.get(i))
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_selected(&self, proxy: &ElementProxy) -> bool {
        self.selected()
            .is_some_and(|s| Arc::ptr_eq(&s.element, &proxy.element))
    }

    pub fn handles(&self) -> &[crate::layout::DragHandle] {
        self.handles.as_ref().map(|h| h.resize.as_slice()).unwrap_or(&[])
    }

    pub fn move_handle(&self) -> Option<&crate::layout::DragHandle> {
        self.handles.as_ref().map(|h| &h.move_handle)
    }

    /// Re-reads the selected entry's geometry after an in-place edit.
    pub fn refresh_selection_style(&mut self) {
        let grid = self.grid;
        if let Some(proxy) = self.selected.and_then(|i| self.proxies.get_mut(i)) {
            proxy.restyle(grid);
        }
        self.regenerate_handles();
    }

    fn regenerate_handles(&mut self) {
        self.handles = self
            .selected()
            .map(|p| HandleSet::for_element(p, self.grid, self.handle_size));
    }
}
