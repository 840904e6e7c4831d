use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator};
use tracing::{debug, trace};

use super::animation::SnapAnimation;
use super::persistence::SpanStateWriter;
use crate::common::config::{AnimationSettings, ResizeSettings, Settings};
use crate::layout_engine::{SpanChange, SpanEngine};
use crate::model::folder::{Folder, ItemId};
use crate::model::metrics::DeviceMetrics;
use crate::model::occupancy::Occupancy;
use crate::sys::geometry::{Point, Rect, RectExt, Round};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    fn index(self) -> usize {
        match self {
            Corner::TopLeft => 0,
            Corner::TopRight => 1,
            Corner::BottomLeft => 2,
            Corner::BottomRight => 3,
        }
    }

    pub fn is_left(self) -> bool { matches!(self, Corner::TopLeft | Corner::BottomLeft) }

    pub fn is_top(self) -> bool { matches!(self, Corner::TopLeft | Corner::TopRight) }

    /// Sign applied to (dx, dy) so that dragging away from the folder grows it.
    fn signs(self) -> (f64, f64) {
        (
            if self.is_left() { -1.0 } else { 1.0 },
            if self.is_top() { -1.0 } else { 1.0 },
        )
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Move,
    Up,
    Cancel,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
}

impl PointerEvent {
    pub fn new(phase: PointerPhase, x: f64, y: f64) -> Self { PointerEvent { phase, x, y } }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResizeSession {
    pub corner: Corner,
    /// Span steps already applied during this drag.
    pub running_span_increment: i32,
    pub origin: Point,
}

/// What the view layer should do in response to pointer input.
#[derive(Debug, Clone, PartialEq)]
pub enum ResizeIntent {
    /// Per-corner handle alpha, indexed TL, TR, BL, BR.
    Highlight { corner: Corner, alphas: [f64; 4] },
    ResetHandles,
    SnapFrame(SnapAnimation),
    SpanChanged(SpanChange),
}

/// Everything a drag step needs to mutate a folder.
pub struct ResizeContext<'a, O: Occupancy + ?Sized> {
    pub engine: &'a SpanEngine,
    pub grid: &'a mut O,
    pub folder: &'a mut Folder,
    pub metrics: &'a DeviceMetrics,
    pub writer: &'a dyn SpanStateWriter,
}

/// The overlay drawn around a folder while it is being resized.
#[derive(Debug)]
pub struct ResizeFrame {
    folder: ItemId,
    frame: Rect,
    session: Option<ResizeSession>,
    snap: Option<SnapAnimation>,
    resize: ResizeSettings,
    animation: AnimationSettings,
    intents: Vec<ResizeIntent>,
}

impl ResizeFrame {
    pub fn new(folder: &Folder, metrics: &DeviceMetrics, settings: &Settings) -> Self {
        ResizeFrame {
            folder: folder.id(),
            frame: frame_for(folder, metrics, settings.resize.background_padding),
            session: None,
            snap: None,
            resize: settings.resize,
            animation: settings.animation,
            intents: Vec::new(),
        }
    }

    pub fn folder(&self) -> ItemId { self.folder }

    /// Bounds the frame is at or heading to.
    pub fn frame(&self) -> Rect { self.frame }

    pub fn session(&self) -> Option<&ResizeSession> { self.session.as_ref() }

    pub fn snap(&self) -> Option<&SnapAnimation> { self.snap.as_ref() }

    pub fn drain_intents(&mut self) -> Vec<ResizeIntent> { std::mem::take(&mut self.intents) }

    fn corner_at(&self, local: Point) -> Option<Corner> {
        let size = self.frame.size;
        let touch = self.resize.touch_target_width();
        let left = local.x <= touch;
        let right = local.x >= size.width - touch;
        let top = local.y <= touch;
        let bottom = local.y >= size.height - touch;
        match (left, right, top, bottom) {
            (true, _, true, _) => Some(Corner::TopLeft),
            (_, true, true, _) => Some(Corner::TopRight),
            (true, _, _, true) => Some(Corner::BottomLeft),
            (_, true, _, true) => Some(Corner::BottomRight),
            _ => None,
        }
    }

    /// Starts a drag if `(x, y)` lands on one of the corner handles.
    pub fn begin_session(&mut self, x: f64, y: f64) -> bool {
        let point = Point::new(x, y);
        if !self.frame.contains(point) {
            return false;
        }
        let local = Point::new(x - self.frame.origin.x, y - self.frame.origin.y);
        let Some(corner) = self.corner_at(local) else {
            trace!(?local, "Pointer down outside resize handles");
            return false;
        };

        if let Some(previous) = self.session.take() {
            debug!(?previous, "Replacing unfinished resize session");
        }
        debug!(?corner, ?local, size = ?self.frame.size, "Began resize session");
        self.session = Some(ResizeSession {
            corner,
            running_span_increment: 0,
            origin: point,
        });

        let mut alphas = [self.resize.dimmed_handle_alpha; 4];
        alphas[corner.index()] = 1.0;
        self.intents.push(ResizeIntent::Highlight { corner, alphas });
        true
    }

    /// Evaluates the drag and commits at most one span step.
    pub fn on_drag<O: Occupancy + ?Sized>(
        &mut self,
        x: f64,
        y: f64,
        ctx: &mut ResizeContext<'_, O>,
    ) -> Option<SpanChange> {
        let session = self.session?;
        if !ctx.metrics.is_ready() {
            return None;
        }

        let (sign_x, sign_y) = session.corner.signs();
        let h_frac = sign_x * (x - session.origin.x) / f64::from(ctx.metrics.cell_width);
        let v_frac = sign_y * (y - session.origin.y) / f64::from(ctx.metrics.cell_height);
        let combined = (h_frac + v_frac) / 2.0 - f64::from(session.running_span_increment);
        let delta = if combined > self.resize.threshold {
            1
        } else if combined < -self.resize.threshold {
            -1
        } else {
            0
        };
        trace!(?session.corner, h_frac, v_frac, combined, delta, "Evaluated resize drag");
        if delta == 0 {
            return None;
        }

        let state = ctx.folder.state();
        let limit = ctx.engine.span_limit(&*ctx.grid) as i32;
        let current = state.span() as i32;
        let new_span = (current + delta).clamp(1, limit);
        let actual = new_span - current;
        if actual == 0 {
            return None;
        }

        let mut cell_x = state.cell_x() as i32;
        let mut cell_y = state.cell_y() as i32;
        if session.corner.is_left() {
            cell_x -= actual;
        }
        if session.corner.is_top() {
            cell_y -= actual;
        }
        let cell_x = cell_x.clamp(0, ctx.grid.cols() as i32 - new_span);
        let cell_y = cell_y.clamp(0, ctx.grid.rows() as i32 - new_span);

        match ctx.engine.attempt(
            ctx.grid,
            ctx.folder,
            new_span as u32,
            cell_x as u32,
            cell_y as u32,
        ) {
            Ok(change) => {
                if let Some(session) = self.session.as_mut() {
                    session.running_span_increment += actual;
                }
                let target = frame_for(ctx.folder, ctx.metrics, self.resize.background_padding);
                self.snap_to(target);
                self.intents.push(ResizeIntent::SpanChanged(change));
                Some(change)
            }
            Err(rejected) => {
                trace!(%rejected, "Resize step rejected");
                None
            }
        }
    }

    /// Finishes the gesture. The folder keeps whatever span was last committed.
    pub fn end_session(&mut self, folder: &Folder, metrics: &DeviceMetrics, writer: &dyn SpanStateWriter) -> bool {
        let Some(session) = self.session.take() else {
            return false;
        };
        if let Some(snap) = self.snap.take() {
            self.frame = snap.finish();
        }
        writer.update_span_state(folder.id(), folder.state());
        self.intents.push(ResizeIntent::ResetHandles);

        let target = frame_for(folder, metrics, self.resize.background_padding);
        if target != self.frame {
            self.snap_to(target);
        }
        debug!(corner = ?session.corner, steps = session.running_span_increment, state = ?folder.state(), "Ended resize session");
        true
    }

    pub fn cancel_session(&mut self, folder: &Folder, metrics: &DeviceMetrics, writer: &dyn SpanStateWriter) -> bool {
        if self.session.is_some() {
            debug!("Resize session cancelled");
        }
        self.end_session(folder, metrics, writer)
    }

    pub fn handle_pointer<O: Occupancy + ?Sized>(
        &mut self,
        event: PointerEvent,
        ctx: &mut ResizeContext<'_, O>,
    ) -> bool {
        match event.phase {
            PointerPhase::Down => self.begin_session(event.x, event.y),
            PointerPhase::Move => {
                if self.session.is_none() {
                    return false;
                }
                self.on_drag(event.x, event.y, ctx);
                true
            }
            PointerPhase::Up => {
                if self.session.is_none() {
                    return false;
                }
                self.on_drag(event.x, event.y, ctx);
                self.end_session(ctx.folder, ctx.metrics, ctx.writer)
            }
            PointerPhase::Cancel => self.cancel_session(ctx.folder, ctx.metrics, ctx.writer),
        }
    }

    /// Re-derives the frame after metrics change outside a gesture.
    pub fn refresh(&mut self, folder: &Folder, metrics: &DeviceMetrics) {
        self.snap = None;
        self.frame = frame_for(folder, metrics, self.resize.background_padding);
    }

    fn snap_to(&mut self, target: Rect) {
        let now = Instant::now();
        let from = match self.snap {
            Some(snap) => snap.frame_at(now),
            None => self.frame,
        };
        let duration = if self.animation.animate {
            self.resize.snap_duration
        } else {
            Duration::ZERO
        };
        let snap = SnapAnimation::new(from, target, now, duration, self.animation.easing);
        self.snap = Some(snap);
        self.frame = target;
        self.intents.push(ResizeIntent::SnapFrame(snap));
    }
}

/// Alpha of every handle when no corner is active.
pub fn reset_alphas() -> [f64; 4] {
    let mut alphas = [0.0; 4];
    for corner in Corner::iter() {
        alphas[corner.index()] = 1.0;
    }
    alphas
}

/// Screen bounds of the resize frame around `folder`.
pub fn frame_for(folder: &Folder, metrics: &DeviceMetrics, padding: f64) -> Rect {
    metrics.region_rect(folder.state().region()).outset(padding).round()
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use pretty_assertions::assert_eq;
    use slotmap::SlotMap;

    use super::*;
    use crate::model::occupancy::GridOccupancy;
    use crate::model::span_state::{Region, SpanState};
    use crate::ui::expanded_folder::ExpandedGridRenderer;

    #[derive(Default)]
    struct Recorder(RefCell<Vec<(ItemId, SpanState)>>);

    impl SpanStateWriter for Recorder {
        fn update_span_state(&self, id: ItemId, state: SpanState) {
            self.0.borrow_mut().push((id, state));
        }

        fn remove_span_state(&self, _: ItemId) {}
    }

    fn metrics() -> DeviceMetrics {
        DeviceMetrics {
            cell_width: 100,
            cell_height: 100,
            border_space: 0,
            icon_size: 50,
            grid_cols: 8,
            grid_rows: 8,
            grid_origin: Point::default(),
        }
    }

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.resize.background_padding = 10.0;
        settings.resize.dimmed_handle_alpha = 0.25;
        settings
    }

    struct Fixture {
        grid: GridOccupancy,
        folder: Folder,
        engine: SpanEngine,
        metrics: DeviceMetrics,
        writer: Recorder,
        _ids: SlotMap<ItemId, ()>,
    }

    impl Fixture {
        fn new(span: u32, x: u32, y: u32) -> Self {
            let mut ids = SlotMap::with_key();
            let id = ids.insert(());
            let mut grid = GridOccupancy::new(8, 8);
            grid.mark_occupied(id, Region::square(x, y, span));
            let folder = Folder::new(
                id,
                "f",
                SpanState::new(span, x, y),
                Vec::new(),
                ExpandedGridRenderer::new(0.3),
            );
            Fixture {
                grid,
                folder,
                engine: SpanEngine::new(3),
                metrics: metrics(),
                writer: Recorder::default(),
                _ids: ids,
            }
        }

        fn ctx(&mut self) -> ResizeContext<'_, GridOccupancy> {
            ResizeContext {
                engine: &self.engine,
                grid: &mut self.grid,
                folder: &mut self.folder,
                metrics: &self.metrics,
                writer: &self.writer,
            }
        }

        fn frame(&self) -> ResizeFrame { ResizeFrame::new(&self.folder, &self.metrics, &settings()) }
    }

    #[test]
    fn frame_is_folder_bounds_outset_by_padding() {
        let fx = Fixture::new(2, 1, 1);
        assert_eq!(fx.frame().frame(), Rect::from_xywh(90.0, 90.0, 220.0, 220.0));
    }

    #[test]
    fn begin_hits_only_corner_regions() {
        let fx = Fixture::new(2, 1, 1);
        let mut frame = fx.frame();
        // outside the frame entirely
        assert!(!frame.begin_session(50.0, 50.0));
        // middle of an edge
        assert!(!frame.begin_session(200.0, 95.0));
        assert!(frame.session().is_none());
        assert!(frame.drain_intents().is_empty());

        assert!(frame.begin_session(305.0, 305.0));
        assert_eq!(frame.session().unwrap().corner, Corner::BottomRight);
        assert_eq!(
            frame.drain_intents(),
            vec![ResizeIntent::Highlight {
                corner: Corner::BottomRight,
                alphas: [0.25, 0.25, 0.25, 1.0],
            }]
        );

        assert!(frame.begin_session(95.0, 100.0));
        assert_eq!(frame.session().unwrap().corner, Corner::TopLeft);
        assert!(frame.begin_session(300.0, 92.0));
        assert_eq!(frame.session().unwrap().corner, Corner::TopRight);
        assert!(frame.begin_session(100.0, 300.0));
        assert_eq!(frame.session().unwrap().corner, Corner::BottomLeft);
    }

    #[test]
    fn small_drags_stay_below_threshold() {
        let mut fx = Fixture::new(1, 0, 0);
        let mut frame = fx.frame();
        assert!(frame.begin_session(105.0, 105.0));
        assert_eq!(frame.on_drag(165.0, 165.0, &mut fx.ctx()), None);
        assert_eq!(fx.folder.state().span(), 1);
    }

    #[test]
    fn running_increment_prevents_repeat_steps() {
        let mut fx = Fixture::new(1, 0, 0);
        let mut frame = fx.frame();
        frame.begin_session(105.0, 105.0);

        assert!(frame.on_drag(175.0, 175.0, &mut fx.ctx()).is_some());
        assert_eq!(fx.folder.state().span(), 2);
        // same position again: combined is now 0.7 - 1
        assert_eq!(frame.on_drag(175.0, 175.0, &mut fx.ctx()), None);
        assert!(frame.on_drag(345.0, 345.0, &mut fx.ctx()).is_some());
        assert_eq!(fx.folder.state().span(), 3);
        // dragging back shrinks
        assert!(frame.on_drag(105.0, 105.0, &mut fx.ctx()).is_some());
        assert_eq!(fx.folder.state().span(), 2);
        assert_eq!(frame.session().unwrap().running_span_increment, 1);
    }

    #[test]
    fn span_is_clamped_to_max() {
        let mut fx = Fixture::new(3, 0, 0);
        let mut frame = fx.frame();
        frame.begin_session(305.0, 305.0);
        assert_eq!(frame.on_drag(600.0, 600.0, &mut fx.ctx()), None);
        assert_eq!(fx.folder.state().span(), 3);
    }

    #[test]
    fn successful_step_snaps_frame() {
        let mut fx = Fixture::new(1, 0, 0);
        let mut frame = fx.frame();
        frame.begin_session(105.0, 105.0);
        frame.drain_intents();
        let change = frame.on_drag(255.0, 255.0, &mut fx.ctx()).unwrap();

        let intents = frame.drain_intents();
        assert_eq!(intents.len(), 2);
        let ResizeIntent::SnapFrame(snap) = intents[0] else {
            panic!("expected snap, got {intents:?}");
        };
        assert_eq!(snap.from(), Rect::from_xywh(-10.0, -10.0, 120.0, 120.0));
        assert_eq!(snap.to(), Rect::from_xywh(-10.0, -10.0, 220.0, 220.0));
        assert_eq!(intents[1], ResizeIntent::SpanChanged(change));
        assert_eq!(frame.frame(), snap.to());
    }

    #[test]
    fn end_persists_and_resets_handles() {
        let mut fx = Fixture::new(1, 0, 0);
        let mut frame = fx.frame();
        let mut ctx = fx.ctx();
        assert!(frame.handle_pointer(PointerEvent::new(PointerPhase::Down, 105.0, 105.0), &mut ctx));
        assert!(frame.handle_pointer(PointerEvent::new(PointerPhase::Up, 255.0, 255.0), &mut ctx));
        assert!(frame.session().is_none());
        assert!(frame.snap().is_none());
        assert!(frame.drain_intents().contains(&ResizeIntent::ResetHandles));

        let writes = fx.writer.0.borrow();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0].1, SpanState::new(2, 0, 0));
    }

    #[test]
    fn cancel_keeps_last_committed_step() {
        let mut fx = Fixture::new(1, 2, 2);
        let mut frame = fx.frame();
        frame.begin_session(305.0, 305.0);
        frame.on_drag(400.0, 400.0, &mut fx.ctx());
        assert_eq!(fx.folder.state().span(), 2);

        let mut ctx = fx.ctx();
        assert!(frame.handle_pointer(PointerEvent::new(PointerPhase::Cancel, 0.0, 0.0), &mut ctx));
        assert_eq!(fx.folder.state(), SpanState::new(2, 2, 2));
        assert_eq!(fx.grid.claim_of(fx.folder.id()), Some(Region::square(2, 2, 2)));
        assert_eq!(fx.writer.0.borrow().len(), 1);
    }

    #[test]
    fn moves_without_session_are_ignored() {
        let mut fx = Fixture::new(1, 0, 0);
        let mut frame = fx.frame();
        let mut ctx = fx.ctx();
        assert!(!frame.handle_pointer(PointerEvent::new(PointerPhase::Move, 500.0, 500.0), &mut ctx));
        assert!(!frame.handle_pointer(PointerEvent::new(PointerPhase::Up, 500.0, 500.0), &mut ctx));
        assert!(!frame.handle_pointer(PointerEvent::new(PointerPhase::Cancel, 0.0, 0.0), &mut ctx));
        assert!(fx.writer.0.borrow().is_empty());
    }

    #[test]
    fn reset_alphas_are_opaque() {
        assert_eq!(reset_alphas(), [1.0; 4]);
    }
}
