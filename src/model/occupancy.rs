use tracing::trace;

use super::span_state::Region;
use super::folder::ItemId;
use crate::common::collections::HashMap;

/// Cell-claim bookkeeping for one workspace page.
///
/// Implementations must keep claims disjoint: a cell belongs to at most one
/// occupant at a time.
pub trait Occupancy {
    fn cols(&self) -> u32;

    fn rows(&self) -> u32;

    /// True when every cell of `region` lies on the grid and is unclaimed.
    fn is_region_vacant(&self, region: Region) -> bool;

    /// The region currently claimed by `id`, if any.
    fn claim_of(&self, id: ItemId) -> Option<Region>;

    fn mark_occupied(&mut self, id: ItemId, region: Region);

    fn mark_unoccupied(&mut self, id: ItemId);

    /// Finds the vacant `min_w x min_h` block whose center is closest to
    /// `seed` (in cell units). Ties resolve to the first block in row-major
    /// order.
    fn find_nearest_vacant(&self, seed: (f64, f64), min_w: u32, min_h: u32) -> Option<(u32, u32)>;
}

#[derive(Debug, Clone)]
pub struct GridOccupancy {
    cols: u32,
    rows: u32,
    cells: Vec<Option<ItemId>>,
    claims: HashMap<ItemId, Region>,
}

impl GridOccupancy {
    pub fn new(cols: u32, rows: u32) -> Self {
        GridOccupancy {
            cols,
            rows,
            cells: vec![None; (cols * rows) as usize],
            claims: HashMap::default(),
        }
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize { (y * self.cols + x) as usize }

    pub fn owner_at(&self, x: u32, y: u32) -> Option<ItemId> {
        if x >= self.cols || y >= self.rows {
            return None;
        }
        self.cells[self.index(x, y)]
    }

    pub fn is_occupied(&self, x: u32, y: u32) -> bool { self.owner_at(x, y).is_some() }

    pub fn occupied_count(&self) -> usize { self.cells.iter().filter(|c| c.is_some()).count() }

    pub fn claims(&self) -> impl Iterator<Item = (ItemId, Region)> + '_ {
        self.claims.iter().map(|(id, region)| (*id, *region))
    }
}

impl Occupancy for GridOccupancy {
    fn cols(&self) -> u32 { self.cols }

    fn rows(&self) -> u32 { self.rows }

    fn is_region_vacant(&self, region: Region) -> bool {
        region.fits_in(self.cols, self.rows)
            && region.cells().all(|(x, y)| self.cells[self.index(x, y)].is_none())
    }

    fn claim_of(&self, id: ItemId) -> Option<Region> { self.claims.get(&id).copied() }

    fn mark_occupied(&mut self, id: ItemId, region: Region) {
        debug_assert!(
            region.fits_in(self.cols, self.rows),
            "claim {region:?} does not fit a {}x{} grid",
            self.cols,
            self.rows
        );
        if self.claims.contains_key(&id) {
            self.mark_unoccupied(id);
        }
        for (x, y) in region.cells() {
            if x >= self.cols || y >= self.rows {
                continue;
            }
            let idx = self.index(x, y);
            debug_assert!(
                self.cells[idx].is_none(),
                "cell ({x}, {y}) already claimed by {:?}",
                self.cells[idx]
            );
            self.cells[idx] = Some(id);
        }
        trace!(?id, ?region, "Marked cells occupied");
        self.claims.insert(id, region);
    }

    fn mark_unoccupied(&mut self, id: ItemId) {
        let Some(region) = self.claims.remove(&id) else { return };
        for (x, y) in region.cells() {
            if x >= self.cols || y >= self.rows {
                continue;
            }
            let idx = self.index(x, y);
            if self.cells[idx] == Some(id) {
                self.cells[idx] = None;
            }
        }
        trace!(?id, ?region, "Marked cells unoccupied");
    }

    fn find_nearest_vacant(&self, seed: (f64, f64), min_w: u32, min_h: u32) -> Option<(u32, u32)> {
        if min_w == 0 || min_h == 0 || min_w > self.cols || min_h > self.rows {
            return None;
        }
        let mut best: Option<((u32, u32), f64)> = None;
        for y in 0..=(self.rows - min_h) {
            for x in 0..=(self.cols - min_w) {
                let candidate = Region::new(x, y, min_w, min_h);
                if !self.is_region_vacant(candidate) {
                    continue;
                }
                let (cx, cy) = candidate.center();
                let distance = f64::hypot(cx - seed.0, cy - seed.1);
                if best.is_none_or(|(_, d)| distance < d) {
                    best = Some(((x, y), distance));
                }
            }
        }
        best.map(|(cell, _)| cell)
    }
}
