use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};
use thiserror::Error;
use tracing::{debug, info};

use super::engine::{NoSpaceError, Rejected, SpanChange, SpanEngine};
use crate::actor::persistence::SpanStateWriter;
use crate::actor::resize_frame::{PointerEvent, ResizeContext, ResizeFrame, ResizeIntent};
use crate::common::config::{Config, Settings};
use crate::model::folder::{Folder, FolderItem, ItemId};
use crate::model::metrics::DeviceMetrics;
use crate::model::occupancy::{GridOccupancy, Occupancy};
use crate::model::span_state::{Region, SpanState};
use crate::ui::expanded_folder::{Canvas, CellIndex, ExpandedGridRenderer, IconSource, TapTarget};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("no folder with id {0:?}")]
    UnknownFolder(ItemId),
    #[error("no occupant with id {0:?}")]
    UnknownOccupant(ItemId),
    #[error("region {0:?} overlaps another occupant")]
    Occupied(Region),
    #[error("region {region:?} does not fit a {cols}x{rows} grid with max span {max_span}")]
    OutOfBounds {
        region: Region,
        cols: u32,
        rows: u32,
        max_span: u32,
    },
    #[error(transparent)]
    NoSpace(#[from] NoSpaceError),
    #[error(transparent)]
    Rejected(#[from] Rejected),
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Occupant {
    /// A shortcut or widget that never resizes.
    Item { label: String },
    Folder,
}

/// One page of the launcher grid and everything placed on it.
pub struct Workspace {
    grid: GridOccupancy,
    metrics: DeviceMetrics,
    settings: Settings,
    engine: SpanEngine,
    occupants: SlotMap<ItemId, Occupant>,
    folders: SecondaryMap<ItemId, Folder>,
    resize_frame: Option<ResizeFrame>,
    writer: Box<dyn SpanStateWriter>,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("grid", &self.grid)
            .field("metrics", &self.metrics)
            .field("occupants", &self.occupants)
            .field("resize_frame", &self.resize_frame)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    pub fn new(config: &Config, writer: Box<dyn SpanStateWriter>) -> Self {
        let metrics = config.device;
        Workspace {
            grid: GridOccupancy::new(metrics.grid_cols, metrics.grid_rows),
            metrics,
            settings: config.settings.clone(),
            engine: SpanEngine::new(config.settings.resize.max_span),
            occupants: SlotMap::with_key(),
            folders: SecondaryMap::new(),
            resize_frame: None,
            writer,
        }
    }

    pub fn grid(&self) -> &GridOccupancy { &self.grid }

    pub fn metrics(&self) -> &DeviceMetrics { &self.metrics }

    pub fn engine(&self) -> &SpanEngine { &self.engine }

    pub fn folder(&self, id: ItemId) -> Option<&Folder> { self.folders.get(id) }

    pub fn folders(&self) -> impl Iterator<Item = &Folder> + '_ { self.folders.values() }

    pub fn occupant(&self, id: ItemId) -> Option<&Occupant> { self.occupants.get(id) }

    pub fn resize_frame(&self) -> Option<&ResizeFrame> { self.resize_frame.as_ref() }

    fn check_placement(&self, region: Region) -> Result<(), WorkspaceError> {
        let max_span = self.engine.span_limit(&self.grid);
        let too_big = region.span_x > max_span || region.span_y > max_span;
        if too_big || !region.fits_in(self.grid.cols(), self.grid.rows()) {
            return Err(WorkspaceError::OutOfBounds {
                region,
                cols: self.grid.cols(),
                rows: self.grid.rows(),
                max_span,
            });
        }
        if !self.grid.is_region_vacant(region) {
            return Err(WorkspaceError::Occupied(region));
        }
        Ok(())
    }

    pub fn add_item(&mut self, label: impl Into<String>, region: Region) -> Result<ItemId, WorkspaceError> {
        if !region.fits_in(self.grid.cols(), self.grid.rows()) {
            return Err(WorkspaceError::OutOfBounds {
                region,
                cols: self.grid.cols(),
                rows: self.grid.rows(),
                max_span: self.engine.span_limit(&self.grid),
            });
        }
        if !self.grid.is_region_vacant(region) {
            return Err(WorkspaceError::Occupied(region));
        }
        let id = self.occupants.insert(Occupant::Item { label: label.into() });
        self.grid.mark_occupied(id, region);
        Ok(id)
    }

    pub fn add_folder(
        &mut self,
        title: impl Into<String>,
        state: SpanState,
        items: Vec<FolderItem>,
    ) -> Result<ItemId, WorkspaceError> {
        let region = state.region();
        self.check_placement(region)?;

        let id = self.occupants.insert(Occupant::Folder);
        let renderer = ExpandedGridRenderer::new(self.settings.expanded.open_indicator_ratio);
        let mut folder = Folder::new(id, title, state, items, renderer);
        sync_view_size(&mut folder, &self.metrics);
        self.grid.mark_occupied(id, region);
        self.folders.insert(id, folder);
        debug!(?id, ?region, "Added folder");
        Ok(id)
    }

    pub fn remove(&mut self, id: ItemId) -> Result<(), WorkspaceError> {
        if self.occupants.remove(id).is_none() {
            return Err(WorkspaceError::UnknownOccupant(id));
        }
        self.grid.mark_unoccupied(id);
        if self.folders.remove(id).is_some() {
            self.writer.remove_span_state(id);
            debug!(?id, "Removed folder");
        }
        if self.resize_frame.as_ref().is_some_and(|f| f.folder() == id) {
            self.resize_frame = None;
        }
        Ok(())
    }

    fn after_commit(&mut self, change: &SpanChange) {
        if change.is_noop() {
            return;
        }
        let Some(folder) = self.folders.get_mut(change.folder) else { return };
        sync_view_size(folder, &self.metrics);
        self.writer.update_span_state(change.folder, change.new);
        if let Some(frame) = &mut self.resize_frame
            && frame.folder() == change.folder
            && frame.session().is_none()
        {
            frame.refresh(folder, &self.metrics);
        }
    }

    pub fn attempt(
        &mut self,
        id: ItemId,
        span: u32,
        cell_x: u32,
        cell_y: u32,
    ) -> Result<SpanChange, WorkspaceError> {
        let folder = self.folders.get_mut(id).ok_or(WorkspaceError::UnknownFolder(id))?;
        let change = self.engine.attempt(&mut self.grid, folder, span, cell_x, cell_y)?;
        self.after_commit(&change);
        Ok(change)
    }

    pub fn expand_to_span(&mut self, id: ItemId, span: u32) -> Result<SpanChange, WorkspaceError> {
        let folder = self.folders.get_mut(id).ok_or(WorkspaceError::UnknownFolder(id))?;
        let change = self.engine.expand_to_span(&mut self.grid, folder, span)?;
        info!(?id, span = change.new.span(), "Expanded folder");
        self.after_commit(&change);
        Ok(change)
    }

    pub fn collapse_to_one_by_one(&mut self, id: ItemId) -> Result<SpanChange, WorkspaceError> {
        let folder = self.folders.get_mut(id).ok_or(WorkspaceError::UnknownFolder(id))?;
        let change = self.engine.collapse_to_one_by_one(&mut self.grid, folder);
        self.after_commit(&change);
        Ok(change)
    }

    /// Puts the resize frame around `id`, replacing any other frame.
    pub fn show_resize_frame(&mut self, id: ItemId) -> Result<(), WorkspaceError> {
        if !self.folders.contains_key(id) {
            return Err(WorkspaceError::UnknownFolder(id));
        }
        self.hide_resize_frame();
        let frame = ResizeFrame::new(&self.folders[id], &self.metrics, &self.settings);
        self.resize_frame = Some(frame);
        Ok(())
    }

    /// Drops the frame, ending any gesture in progress.
    pub fn hide_resize_frame(&mut self) {
        let Some(mut frame) = self.resize_frame.take() else { return };
        if let Some(folder) = self.folders.get(frame.folder()) {
            frame.cancel_session(folder, &self.metrics, &*self.writer);
        }
    }

    /// Routes a screen-space pointer event to the resize frame.
    pub fn handle_pointer(&mut self, event: PointerEvent) -> bool {
        let Some(frame) = self.resize_frame.as_mut() else {
            return false;
        };
        let Some(folder) = self.folders.get_mut(frame.folder()) else {
            return false;
        };
        let mut ctx = ResizeContext {
            engine: &self.engine,
            grid: &mut self.grid,
            folder,
            metrics: &self.metrics,
            writer: &*self.writer,
        };
        let handled = frame.handle_pointer(event, &mut ctx);
        sync_view_size(ctx.folder, ctx.metrics);
        handled
    }

    pub fn drain_intents(&mut self) -> Vec<ResizeIntent> {
        self.resize_frame.as_mut().map(ResizeFrame::drain_intents).unwrap_or_default()
    }

    /// Sub-cell under a folder-local point.
    pub fn expanded_cell_index(&mut self, id: ItemId, x: f64, y: f64) -> Option<CellIndex> {
        let metrics = self.metrics;
        self.folders.get_mut(id)?.expanded_cell_index(x, y, &metrics)
    }

    pub fn tap(&mut self, id: ItemId, x: f64, y: f64) -> Option<TapTarget> {
        let metrics = self.metrics;
        self.folders.get_mut(id)?.tap(x, y, &metrics)
    }

    pub fn render_folder<C, S>(&mut self, id: ItemId, canvas: &mut C, icons: &S) -> Result<bool, WorkspaceError>
    where
        C: Canvas + ?Sized,
        S: IconSource + ?Sized,
    {
        let metrics = self.metrics;
        let folder = self.folders.get_mut(id).ok_or(WorkspaceError::UnknownFolder(id))?;
        Ok(folder.render(canvas, &metrics, icons))
    }

    /// Applies new pixel metrics. Grid dimensions are fixed for the lifetime
    /// of the workspace.
    pub fn set_metrics(&mut self, metrics: DeviceMetrics) {
        if (metrics.grid_cols, metrics.grid_rows) != (self.grid.cols(), self.grid.rows()) {
            debug!(
                cols = metrics.grid_cols,
                rows = metrics.grid_rows,
                "Ignoring grid size change on a live workspace"
            );
        }
        self.metrics = DeviceMetrics {
            grid_cols: self.grid.cols(),
            grid_rows: self.grid.rows(),
            ..metrics
        };
        for folder in self.folders.values_mut() {
            sync_view_size(folder, &self.metrics);
        }
        if let Some(frame) = &mut self.resize_frame
            && let Some(folder) = self.folders.get(frame.folder())
        {
            frame.refresh(folder, &self.metrics);
        }
    }
}

/// The expanded renderer lays out inside the folder's own screen bounds.
fn sync_view_size(folder: &mut Folder, metrics: &DeviceMetrics) {
    let bounds = metrics.region_rect(folder.state().region());
    folder.set_view_size(bounds.size.width as i32, bounds.size.height as i32);
}
