use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::model::folder::{Folder, ItemId};
use crate::model::occupancy::Occupancy;
use crate::model::span_state::{Region, SpanState};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("region {region:?} is not vacant")]
pub struct Rejected {
    pub region: Region,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("no vacant {span}x{span} area on the grid")]
pub struct NoSpaceError {
    pub span: u32,
}

/// Outcome of a committed mutation.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpanChange {
    pub folder: ItemId,
    pub old: SpanState,
    pub new: SpanState,
}

impl SpanChange {
    pub fn is_noop(&self) -> bool { self.old == self.new }
}

/// The only writer of folder footprints.
///
/// Every call holds `&mut` on both the occupancy grid and the folder, so the
/// release/test/commit sequence cannot interleave with another mutation.
#[derive(Debug, Clone, Copy)]
pub struct SpanEngine {
    max_span: u32,
}

impl SpanEngine {
    pub fn new(max_span: u32) -> Self { SpanEngine { max_span: max_span.max(1) } }

    pub fn max_span(&self) -> u32 { self.max_span }

    /// Largest span that both the configuration and the grid allow.
    pub fn span_limit<O: Occupancy + ?Sized>(&self, grid: &O) -> u32 {
        self.max_span.min(grid.cols()).min(grid.rows()).max(1)
    }

    /// Moves/resizes `folder` to a `span x span` block at `(cell_x, cell_y)`.
    ///
    /// Out-of-range spans and anchors are clamped. If the clamped block is
    /// not vacant the folder keeps its previous claim and state.
    pub fn attempt<O: Occupancy + ?Sized>(
        &self,
        grid: &mut O,
        folder: &mut Folder,
        span: u32,
        cell_x: u32,
        cell_y: u32,
    ) -> Result<SpanChange, Rejected> {
        let span = span.clamp(1, self.span_limit(grid));
        let cell_x = cell_x.min(grid.cols() - span);
        let cell_y = cell_y.min(grid.rows() - span);
        let target = Region::square(cell_x, cell_y, span);

        let id = folder.id();
        let old = folder.state();
        let original = grid.claim_of(id);

        grid.mark_unoccupied(id);
        if !grid.is_region_vacant(target) {
            if let Some(original) = original {
                grid.mark_occupied(id, original);
            }
            trace!(?id, ?target, "Span change blocked");
            return Err(Rejected { region: target });
        }

        grid.mark_occupied(id, target);
        folder.commit_span(span, cell_x, cell_y);
        let change = SpanChange { folder: id, old, new: folder.state() };

        debug_assert_eq!(grid.claim_of(id), Some(folder.state().region()));
        debug_assert_eq!(folder.state().span_x(), folder.state().span_y());
        debug!(?id, from = ?old.region(), to = ?target, "Applied span change");
        Ok(change)
    }

    /// Grows (or shrinks) to `span`, keeping the anchor when possible and
    /// otherwise relocating to the nearest vacant block.
    pub fn expand_to_span<O: Occupancy + ?Sized>(
        &self,
        grid: &mut O,
        folder: &mut Folder,
        span: u32,
    ) -> Result<SpanChange, NoSpaceError> {
        let span = span.clamp(1, self.span_limit(grid));
        let state = folder.state();

        if let Ok(change) = self.attempt(grid, folder, span, state.cell_x(), state.cell_y()) {
            return Ok(change);
        }

        // Search with our own cells released so they count as free.
        let id = folder.id();
        let original = grid.claim_of(id);
        grid.mark_unoccupied(id);
        let found = grid.find_nearest_vacant(state.region().center(), span, span);
        if let Some(original) = original {
            grid.mark_occupied(id, original);
        }

        let Some((cell_x, cell_y)) = found else {
            debug!(?id, span, "No space to expand folder");
            return Err(NoSpaceError { span });
        };
        trace!(?id, cell_x, cell_y, span, "Relocating folder to expand");
        self.attempt(grid, folder, span, cell_x, cell_y).map_err(|_| NoSpaceError { span })
    }

    /// Shrinks to 1x1 at the current anchor. A 1x1 folder is left untouched.
    pub fn collapse_to_one_by_one<O: Occupancy + ?Sized>(
        &self,
        grid: &mut O,
        folder: &mut Folder,
    ) -> SpanChange {
        let state = folder.state();
        if state.span() == 1 {
            return SpanChange { folder: folder.id(), old: state, new: state };
        }
        match self.attempt(grid, folder, 1, state.cell_x(), state.cell_y()) {
            Ok(change) => change,
            Err(rejected) => {
                // The anchor cell is part of our own claim, so this only
                // happens when the folder was never placed on the grid.
                debug_assert!(false, "collapse rejected: {rejected}");
                SpanChange { folder: folder.id(), old: state, new: state }
            }
        }
    }
}
