//! Layout and hit-testing for folders drawn as an NxN grid of their contents.
//!
//! Drawing and tap handling both go through [`GridState`], so a point that
//! lands inside a drawn cell always maps back to that cell's index.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::common::collections::HashMap;
use crate::model::folder::FolderItem;
use crate::model::metrics::DeviceMetrics;
use crate::sys::geometry::{Point, Rect, Size};

/// Row-major index of a sub-cell inside an expanded folder.
pub type CellIndex = usize;

/// Opaque reference to an icon bitmap owned by the icon loader.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IconHandle(pub u64);

pub trait IconSource {
    /// Returns `None` while only a placeholder/low-res icon is available; the
    /// cell is retried on the next frame.
    fn icon_for(&self, item: &FolderItem) -> Option<IconHandle>;
}

pub trait Canvas {
    fn draw_background(&mut self, bounds: Rect);
    fn draw_icon(&mut self, icon: IconHandle, bounds: Rect);
    fn draw_open_indicator(&mut self, bounds: Rect);
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TapTarget {
    /// The reserved last cell.
    OpenFolder,
    /// Content item at this index.
    Launch(usize),
}

impl TapTarget {
    pub fn for_cell(index: CellIndex, span: u32, item_count: usize) -> Option<TapTarget> {
        let last = (span * span) as usize - 1;
        if index == last {
            Some(TapTarget::OpenFolder)
        } else if index < last && index < item_count {
            Some(TapTarget::Launch(index))
        } else {
            None
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridState {
    pub span: u32,
    pub cell_w: i32,
    pub cell_h: i32,
    pub border_space: i32,
    pub icon_size: i32,
    pub start_x: i32,
    pub start_y: i32,
}

impl GridState {
    /// Centers a `span x span` block of device-sized cells in the view.
    /// Returns `None` until the metrics describe a drawable cell.
    pub fn compute(span: u32, metrics: &DeviceMetrics, view_w: i32, view_h: i32) -> Option<Self> {
        if !metrics.is_ready() || span == 0 {
            return None;
        }
        let n = span as i32;
        let content_w = n * metrics.cell_width + (n - 1) * metrics.border_space;
        let content_h = n * metrics.cell_height + (n - 1) * metrics.border_space;
        Some(GridState {
            span,
            cell_w: metrics.cell_width,
            cell_h: metrics.cell_height,
            border_space: metrics.border_space,
            icon_size: metrics.icon_size,
            start_x: (view_w - content_w) / 2,
            start_y: (view_h - content_h) / 2,
        })
    }

    #[inline]
    pub fn cell_count(&self) -> usize { (self.span * self.span) as usize }

    #[inline]
    pub fn open_indicator_cell(&self) -> CellIndex { self.cell_count() - 1 }

    pub fn cell_rect(&self, index: CellIndex) -> Rect {
        let span = self.span as usize;
        let (row, col) = ((index / span) as i32, (index % span) as i32);
        let left = self.start_x + col * (self.cell_w + self.border_space);
        let top = self.start_y + row * (self.cell_h + self.border_space);
        Rect::from_xywh(
            f64::from(left),
            f64::from(top),
            f64::from(self.cell_w),
            f64::from(self.cell_h),
        )
    }

    pub fn icon_rect(&self, index: CellIndex) -> Rect {
        let cell = self.cell_rect(index);
        let left = cell.origin.x as i32 + (self.cell_w - self.icon_size) / 2;
        let top = cell.origin.y as i32 + (self.cell_h - self.icon_size) / 2;
        Rect::from_xywh(
            f64::from(left),
            f64::from(top),
            f64::from(self.icon_size),
            f64::from(self.icon_size),
        )
    }

    pub fn open_indicator_rect(&self, ratio: f64) -> Rect {
        let cell = self.cell_rect(self.open_indicator_cell());
        let size = (f64::from(self.cell_w.min(self.cell_h)) * ratio) as i32;
        let cx = cell.origin.x as i32 + self.cell_w / 2;
        let cy = cell.origin.y as i32 + self.cell_h / 2;
        Rect::from_xywh(
            f64::from(cx - size / 2),
            f64::from(cy - size / 2),
            f64::from(size / 2 * 2),
            f64::from(size / 2 * 2),
        )
    }

    /// Inverse of [`GridState::cell_rect`]. Points left of or above the grid
    /// miss; points past the far edges clamp to the last row/column.
    pub fn cell_at(&self, x: f64, y: f64) -> Option<CellIndex> {
        let rel_x = x - f64::from(self.start_x);
        let rel_y = y - f64::from(self.start_y);
        if rel_x < 0.0 || rel_y < 0.0 {
            return None;
        }
        let last = self.span - 1;
        let col = ((rel_x / f64::from(self.cell_w + self.border_space)) as u32).min(last);
        let row = ((rel_y / f64::from(self.cell_h + self.border_space)) as u32).min(last);
        Some((row * self.span + col) as usize)
    }
}

#[derive(Debug)]
pub struct ExpandedGridRenderer {
    view: Size,
    /// Geometry together with the metrics it was computed from.
    cached: Option<(DeviceMetrics, GridState)>,
    icon_cache: HashMap<CellIndex, IconHandle>,
    open_indicator_ratio: f64,
    reported_not_ready: bool,
}

impl ExpandedGridRenderer {
    pub fn new(open_indicator_ratio: f64) -> Self {
        ExpandedGridRenderer {
            view: Size::default(),
            cached: None,
            icon_cache: HashMap::default(),
            open_indicator_ratio,
            reported_not_ready: false,
        }
    }

    pub fn set_view_size(&mut self, width: i32, height: i32) {
        let view = Size::new(f64::from(width), f64::from(height));
        if view != self.view {
            self.view = view;
            self.cached = None;
        }
    }

    /// Drops derived geometry and resolved icons. Called after every span change.
    pub fn invalidate(&mut self) {
        self.cached = None;
        self.icon_cache.clear();
        self.reported_not_ready = false;
    }

    pub fn clear_icon_cache(&mut self) { self.icon_cache.clear(); }

    pub fn cached_icon_count(&self) -> usize { self.icon_cache.len() }

    pub fn grid_state(&mut self, span: u32, metrics: &DeviceMetrics) -> Option<GridState> {
        if let Some((source, state)) = self.cached
            && state.span == span
            && source == *metrics
        {
            return Some(state);
        }
        let state =
            GridState::compute(span, metrics, self.view.width as i32, self.view.height as i32);
        match state {
            Some(state) => {
                trace!(?state, "Computed expanded grid");
                self.cached = Some((*metrics, state));
                self.reported_not_ready = false;
            }
            None => {
                if !self.reported_not_ready {
                    warn!(
                        cell_w = metrics.cell_width,
                        cell_h = metrics.cell_height,
                        icon = metrics.icon_size,
                        "Device metrics not ready, skipping expanded grid"
                    );
                    self.reported_not_ready = true;
                }
                self.cached = None;
            }
        }
        state
    }

    /// Draws content icons row-major into cells `0..span²-1` and the open
    /// indicator into the last cell. Returns false when nothing was drawn.
    pub fn render<C, S>(
        &mut self,
        canvas: &mut C,
        items: &[FolderItem],
        span: u32,
        metrics: &DeviceMetrics,
        icons: &S,
    ) -> bool
    where
        C: Canvas + ?Sized,
        S: IconSource + ?Sized,
    {
        let Some(grid) = self.grid_state(span, metrics) else {
            return false;
        };

        let side = self.view.width.min(self.view.height);
        canvas.draw_background(Rect::new(
            Point::new((self.view.width - side) / 2.0, (self.view.height - side) / 2.0),
            Size::new(side, side),
        ));

        let max_icons = grid.open_indicator_cell();
        for (index, item) in items.iter().enumerate().take(max_icons) {
            let icon = match self.icon_cache.get(&index) {
                Some(icon) => Some(*icon),
                None => {
                    let resolved = icons.icon_for(item);
                    if let Some(icon) = resolved {
                        self.icon_cache.insert(index, icon);
                    }
                    resolved
                }
            };
            if let Some(icon) = icon {
                canvas.draw_icon(icon, grid.icon_rect(index));
            }
        }

        canvas.draw_open_indicator(grid.open_indicator_rect(self.open_indicator_ratio));
        true
    }

    pub fn hit_test(
        &mut self,
        x: f64,
        y: f64,
        span: u32,
        metrics: &DeviceMetrics,
    ) -> Option<CellIndex> {
        self.grid_state(span, metrics)?.cell_at(x, y)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum DrawCommand {
    Background(Rect),
    Icon { icon: IconHandle, bounds: Rect },
    OpenIndicator(Rect),
}

/// Canvas that records draw calls.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DisplayList(pub Vec<DrawCommand>);

impl DisplayList {
    pub fn icons(&self) -> impl Iterator<Item = (IconHandle, Rect)> + '_ {
        self.0.iter().filter_map(|cmd| match cmd {
            DrawCommand::Icon { icon, bounds } => Some((*icon, *bounds)),
            _ => None,
        })
    }
}

impl Canvas for DisplayList {
    fn draw_background(&mut self, bounds: Rect) { self.0.push(DrawCommand::Background(bounds)); }

    fn draw_icon(&mut self, icon: IconHandle, bounds: Rect) {
        self.0.push(DrawCommand::Icon { icon, bounds });
    }

    fn draw_open_indicator(&mut self, bounds: Rect) {
        self.0.push(DrawCommand::OpenIndicator(bounds));
    }
}
