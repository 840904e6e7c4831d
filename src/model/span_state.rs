use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Persisted per-folder option bits.
    #[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[serde(transparent)]
    pub struct FolderOptions: u32 {
        const EXPANDED = 1 << 0;
    }
}

/// A block of cells anchored at its top-left cell.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    pub cell_x: u32,
    pub cell_y: u32,
    pub span_x: u32,
    pub span_y: u32,
}

impl Region {
    pub const fn new(cell_x: u32, cell_y: u32, span_x: u32, span_y: u32) -> Self {
        Region { cell_x, cell_y, span_x, span_y }
    }

    pub const fn square(cell_x: u32, cell_y: u32, span: u32) -> Self {
        Region::new(cell_x, cell_y, span, span)
    }

    pub fn right(&self) -> u32 { self.cell_x + self.span_x }

    pub fn bottom(&self) -> u32 { self.cell_y + self.span_y }

    pub fn contains_cell(&self, x: u32, y: u32) -> bool {
        (self.cell_x..self.right()).contains(&x) && (self.cell_y..self.bottom()).contains(&y)
    }

    pub fn overlaps(&self, other: &Region) -> bool {
        self.cell_x < other.right()
            && other.cell_x < self.right()
            && self.cell_y < other.bottom()
            && other.cell_y < self.bottom()
    }

    pub fn fits_in(&self, cols: u32, rows: u32) -> bool {
        self.span_x > 0 && self.span_y > 0 && self.right() <= cols && self.bottom() <= rows
    }

    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.cell_y..self.bottom())
            .flat_map(move |y| (self.cell_x..self.right()).map(move |x| (x, y)))
    }

    /// Center of the region in cell units.
    pub fn center(&self) -> (f64, f64) {
        (
            self.cell_x as f64 + self.span_x as f64 / 2.0,
            self.cell_y as f64 + self.span_y as f64 / 2.0,
        )
    }
}

/// Footprint record of one folder. Only the span engine writes to it.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanState {
    span_x: u32,
    span_y: u32,
    cell_x: u32,
    cell_y: u32,
    #[serde(default)]
    options: FolderOptions,
}

impl SpanState {
    pub fn new(span: u32, cell_x: u32, cell_y: u32) -> Self {
        let span = span.max(1);
        let mut options = FolderOptions::empty();
        options.set(FolderOptions::EXPANDED, span > 1);
        SpanState {
            span_x: span,
            span_y: span,
            cell_x,
            cell_y,
            options,
        }
    }

    pub fn span(&self) -> u32 {
        debug_assert_eq!(self.span_x, self.span_y, "folder span must stay square");
        self.span_x
    }

    pub fn span_x(&self) -> u32 { self.span_x }

    pub fn span_y(&self) -> u32 { self.span_y }

    pub fn cell_x(&self) -> u32 { self.cell_x }

    pub fn cell_y(&self) -> u32 { self.cell_y }

    pub fn options(&self) -> FolderOptions { self.options }

    pub fn region(&self) -> Region {
        Region::new(self.cell_x, self.cell_y, self.span_x, self.span_y)
    }

    /// Whether the folder should draw its contents as a grid. A stale
    /// `EXPANDED` bit on a 1x1 or non-square record does not count.
    pub fn is_expanded(&self) -> bool {
        self.options.contains(FolderOptions::EXPANDED)
            && self.span_x > 1
            && self.span_y > 1
            && self.span_x == self.span_y
    }

    pub(crate) fn apply(&mut self, span: u32, cell_x: u32, cell_y: u32) {
        self.options.set(FolderOptions::EXPANDED, span > 1);
        self.span_x = span;
        self.span_y = span;
        self.cell_x = cell_x;
        self.cell_y = cell_y;
    }
}

impl Default for SpanState {
    fn default() -> Self { SpanState::new(1, 0, 0) }
}
