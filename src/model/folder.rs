use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

use super::metrics::DeviceMetrics;
use super::span_state::SpanState;
use crate::ui::expanded_folder::{Canvas, CellIndex, ExpandedGridRenderer, IconSource, TapTarget};

new_key_type! {
    /// Anything that claims cells on a workspace: folders, shortcuts, widgets.
    pub struct ItemId;
}

/// One shortcut stored inside a folder.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct FolderItem {
    /// Stable key of the launch target (package/activity, URL, ...).
    pub target: String,
    #[serde(default)]
    pub title: String,
}

impl FolderItem {
    pub fn new(target: impl Into<String>, title: impl Into<String>) -> Self {
        FolderItem {
            target: target.into(),
            title: title.into(),
        }
    }
}

#[derive(Debug)]
pub struct Folder {
    id: ItemId,
    title: String,
    state: SpanState,
    items: Vec<FolderItem>,
    renderer: ExpandedGridRenderer,
}

impl Folder {
    pub fn new(
        id: ItemId,
        title: impl Into<String>,
        state: SpanState,
        items: Vec<FolderItem>,
        renderer: ExpandedGridRenderer,
    ) -> Self {
        Folder {
            id,
            title: title.into(),
            state,
            items,
            renderer,
        }
    }

    #[inline]
    pub fn id(&self) -> ItemId { self.id }

    #[inline]
    pub fn title(&self) -> &str { &self.title }

    #[inline]
    pub fn state(&self) -> SpanState { self.state }

    #[inline]
    pub fn items(&self) -> &[FolderItem] { &self.items }

    pub fn set_items(&mut self, items: Vec<FolderItem>) {
        self.items = items;
        self.renderer.clear_icon_cache();
    }

    pub fn renderer(&self) -> &ExpandedGridRenderer { &self.renderer }

    pub fn set_view_size(&mut self, width: i32, height: i32) {
        self.renderer.set_view_size(width, height);
    }

    /// Writes a validated footprint. Callers hold the occupancy grid and have
    /// already claimed the new region.
    pub(crate) fn commit_span(&mut self, span: u32, cell_x: u32, cell_y: u32) {
        self.state.apply(span, cell_x, cell_y);
        self.renderer.invalidate();
    }

    /// Draws the expanded grid. Returns false when there was nothing to draw
    /// (collapsed folder, or metrics not ready yet).
    pub fn render<C, S>(&mut self, canvas: &mut C, metrics: &DeviceMetrics, icons: &S) -> bool
    where
        C: Canvas + ?Sized,
        S: IconSource + ?Sized,
    {
        if !self.state.is_expanded() {
            return false;
        }
        self.renderer.render(canvas, &self.items, self.state.span(), metrics, icons)
    }

    /// Sub-cell under a folder-local point, if the folder is expanded.
    pub fn expanded_cell_index(&mut self, x: f64, y: f64, metrics: &DeviceMetrics) -> Option<CellIndex> {
        if !self.state.is_expanded() {
            return None;
        }
        self.renderer.hit_test(x, y, self.state.span(), metrics)
    }

    pub fn tap(&mut self, x: f64, y: f64, metrics: &DeviceMetrics) -> Option<TapTarget> {
        let index = self.expanded_cell_index(x, y, metrics)?;
        TapTarget::for_cell(index, self.state.span(), self.items.len())
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;
    use crate::ui::expanded_folder::{DisplayList, IconHandle};

    struct Icons;

    impl IconSource for Icons {
        fn icon_for(&self, _: &FolderItem) -> Option<IconHandle> { Some(IconHandle(7)) }
    }

    fn folder(span: u32, items: usize) -> Folder {
        let mut ids: SlotMap<ItemId, ()> = SlotMap::with_key();
        let items = (0..items).map(|i| FolderItem::new(format!("t{i}"), "")).collect();
        let mut folder =
            Folder::new(ids.insert(()), "f", SpanState::new(span, 0, 0), items, ExpandedGridRenderer::new(0.3));
        let metrics = DeviceMetrics::default();
        let bounds = metrics.region_rect(folder.state().region());
        folder.set_view_size(bounds.size.width as i32, bounds.size.height as i32);
        folder
    }

    #[test]
    fn collapsed_folder_draws_nothing() {
        let mut f = folder(1, 3);
        let mut canvas = DisplayList::default();
        assert!(!f.render(&mut canvas, &DeviceMetrics::default(), &Icons));
        assert_eq!(f.tap(10.0, 10.0, &DeviceMetrics::default()), None);
    }

    #[test]
    fn new_items_drop_cached_icons() {
        let mut f = folder(2, 3);
        let mut canvas = DisplayList::default();
        assert!(f.render(&mut canvas, &DeviceMetrics::default(), &Icons));
        assert_eq!(f.renderer().cached_icon_count(), 3);

        f.set_items(vec![FolderItem::new("only", "Only")]);
        assert_eq!(f.renderer().cached_icon_count(), 0);
        assert_eq!(f.items().len(), 1);
        assert_eq!(f.tap(10.0, 10.0, &DeviceMetrics::default()), Some(TapTarget::Launch(0)));
    }

    #[test]
    fn commit_invalidates_renderer() {
        let mut f = folder(2, 3);
        let mut canvas = DisplayList::default();
        f.render(&mut canvas, &DeviceMetrics::default(), &Icons);
        f.commit_span(3, 0, 0);
        assert_eq!(f.state().span(), 3);
        assert_eq!(f.renderer().cached_icon_count(), 0);
    }
}
