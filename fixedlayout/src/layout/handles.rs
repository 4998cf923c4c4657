use crate::layout::{ElementKind, ElementProxy, GridSize, PixelStyle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Move,
    Resize,
    /// End point of a line, 0 for `(x, y)` and 1 for `(x2, y2)`.
    Endpoint(usize),
}

/// A grabbable point, positioned on the grid and centred in pixel space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragHandle {
    pub kind: HandleKind,
    pub x: i64,
    pub y: i64,
    pub style: PixelStyle,
}

impl DragHandle {
    fn at(kind: HandleKind, x: i64, y: i64, grid: GridSize, size: [u32; 2]) -> Self {
        let (w, h) = (i64::from(size[0]), i64::from(size[1]));
        Self {
            kind,
            x,
            y,
            style: PixelStyle {
                left: x.saturating_mul(i64::from(grid.x)).saturating_sub(w / 2),
                top: y.saturating_mul(i64::from(grid.y)).saturating_sub(h / 2),
                width: w,
                height: h,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandleSet {
    pub move_handle: DragHandle,
    pub resize: Vec<DragHandle>,
}

impl HandleSet {
    pub fn for_element(proxy: &ElementProxy, grid: GridSize, size: [u32; 2]) -> Self {
        let g = proxy.geometry();
        let move_handle = DragHandle::at(HandleKind::Move, g.x, g.y, grid, size);

        let resize = match proxy.kind() {
            ElementKind::Line => {
                let entry = proxy.element().read();
                let (x2, y2) = (entry.x2.unwrap_or(entry.x), entry.y2.unwrap_or(entry.y));
                vec![
                    DragHandle::at(HandleKind::Endpoint(0), entry.x, entry.y, grid, size),
                    DragHandle::at(HandleKind::Endpoint(1), x2, y2, grid, size),
                ]
            }
            _ => vec![DragHandle::at(
                HandleKind::Resize,
                g.x.saturating_add(g.width),
                g.y.saturating_add(g.height),
                grid,
                size,
            )],
        };

        Self {
            move_handle,
            resize,
        }
    }
}
