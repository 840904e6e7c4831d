//! Fire-and-forget storage of committed folder footprints.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};

use crate::actor;
use crate::common::collections::BTreeMap;
use crate::model::folder::ItemId;
use crate::model::span_state::SpanState;

pub trait SpanStateWriter {
    /// Records the committed state of a folder. Must not block.
    fn update_span_state(&self, id: ItemId, state: SpanState);

    /// Forgets a folder that left the workspace.
    fn remove_span_state(&self, id: ItemId);
}

/// Writer for callers that do not persist anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullWriter;

impl SpanStateWriter for NullWriter {
    fn update_span_state(&self, _: ItemId, _: SpanState) {}

    fn remove_span_state(&self, _: ItemId) {}
}

#[derive(Debug)]
pub enum Event {
    SpanStateChanged(ItemId, SpanState),
    Removed(ItemId),
}

pub type Sender = actor::Sender<Event>;
pub type Receiver = actor::Receiver<Event>;

impl SpanStateWriter for Sender {
    fn update_span_state(&self, id: ItemId, state: SpanState) {
        self.send(Event::SpanStateChanged(id, state));
    }

    fn remove_span_state(&self, id: ItemId) { self.send(Event::Removed(id)); }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PersistedLayout {
    pub folders: BTreeMap<ItemId, SpanState>,
}

impl PersistedLayout {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        let buf = std::fs::read_to_string(path)?;
        Ok(ron::from_str(&buf)?)
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let text = ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())?;
        std::fs::write(path, text)?;
        Ok(())
    }
}

pub struct PersistenceActor {
    rx: Receiver,
    layout: PersistedLayout,
    path: Option<PathBuf>,
    dirty: bool,
}

impl PersistenceActor {
    /// Without a path the actor only keeps the layout in memory.
    pub fn new(rx: Receiver, path: Option<PathBuf>) -> Self {
        PersistenceActor {
            rx,
            layout: PersistedLayout::default(),
            path,
            dirty: false,
        }
    }

    pub fn spawn(path: Option<PathBuf>) -> (Sender, Self) {
        let (tx, rx) = actor::channel();
        (tx, Self::new(rx, path))
    }

    /// Runs until every sender is dropped and returns the final layout.
    pub async fn run(mut self) -> PersistedLayout {
        while let Some((span, event)) = self.rx.recv().await {
            let _guard = span.enter();
            self.handle_event(event);
        }
        self.flush();
        self.layout
    }

    #[instrument(name = "persistence::handle_event", skip(self))]
    fn handle_event(&mut self, event: Event) {
        match event {
            Event::SpanStateChanged(id, state) => {
                if self.layout.folders.insert(id, state) != Some(state) {
                    self.dirty = true;
                }
            }
            Event::Removed(id) => {
                if self.layout.folders.remove(&id).is_some() {
                    self.dirty = true;
                }
            }
        }
    }

    fn flush(&mut self) {
        if !self.dirty {
            return;
        }
        let Some(path) = &self.path else {
            self.dirty = false;
            return;
        };
        match self.layout.save(path) {
            Ok(()) => {
                debug!(path = %path.display(), folders = self.layout.folders.len(), "Saved layout");
                self.dirty = false;
            }
            Err(e) => error!("Could not save layout to {}: {e:?}", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use slotmap::SlotMap;

    use super::*;

    #[test_log::test(tokio::test)]
    async fn actor_collects_updates_and_writes_ron() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("layout.ron");
        let mut ids: SlotMap<ItemId, ()> = SlotMap::with_key();
        let (a, b) = (ids.insert(()), ids.insert(()));

        let (tx, actor) = PersistenceActor::spawn(Some(path.clone()));
        tx.update_span_state(a, SpanState::new(2, 0, 0));
        tx.update_span_state(b, SpanState::new(1, 3, 3));
        tx.update_span_state(a, SpanState::new(3, 0, 0));
        tx.remove_span_state(b);
        drop(tx);

        let layout = actor.run().await;
        assert_eq!(layout.folders.len(), 1);
        assert_eq!(layout.folders[&a], SpanState::new(3, 0, 0));
        assert_eq!(PersistedLayout::load(&path).unwrap(), layout);
    }

    #[test_log::test(tokio::test)]
    async fn memory_only_actor_keeps_layout() {
        let mut ids: SlotMap<ItemId, ()> = SlotMap::with_key();
        let id = ids.insert(());
        let (tx, actor) = PersistenceActor::spawn(None);
        tx.update_span_state(id, SpanState::new(2, 1, 1));
        drop(tx);
        let layout = actor.run().await;
        assert_eq!(layout.folders[&id].span(), 2);
    }
}
