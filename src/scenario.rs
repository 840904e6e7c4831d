//! Scripted workspace sessions, used by `foldergrid simulate`.

use std::hash::{Hash, Hasher};
use std::time::Duration;

use rustc_hash::FxHasher;
use serde::{Deserialize, Serialize};
use serde_with::{DurationMilliSeconds, serde_as};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::actor::persistence::SpanStateWriter;
use crate::actor::resize_frame::{Corner, PointerEvent, ResizeIntent, reset_alphas};
use crate::common::collections::HashMap;
use crate::common::config::Config;
use crate::layout_engine::{Workspace, WorkspaceError};
use crate::model::folder::{FolderItem, ItemId};
use crate::model::metrics::DeviceMetrics;
use crate::model::span_state::{Region, SpanState};
use crate::sys::geometry::Rect;
use crate::ui::expanded_folder::{DisplayList, IconHandle, IconSource, TapTarget};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScenarioError {
    #[error("no folder titled {0:?}")]
    UnknownFolder(String),
    #[error("folder title {0:?} is used twice")]
    DuplicateFolder(String),
    #[error("invalid device metrics: {}", .0.join("; "))]
    InvalidDevice(Vec<String>),
    #[error("placing {name:?}: {source}")]
    Placement {
        name: String,
        #[source]
        source: WorkspaceError,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    /// Overrides the configured device metrics.
    #[serde(default)]
    pub device: Option<DeviceMetrics>,
    #[serde(default)]
    pub items: Vec<ItemSpec>,
    #[serde(default)]
    pub folders: Vec<FolderSpec>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ItemSpec {
    pub label: String,
    pub region: Region,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FolderSpec {
    pub title: String,
    #[serde(default = "one")]
    pub span: u32,
    pub cell_x: u32,
    pub cell_y: u32,
    #[serde(default)]
    pub items: Vec<FolderItem>,
}

fn one() -> u32 { 1 }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum Action {
    ShowFrame(String),
    HideFrame,
    Pointer(PointerEvent),
    Attempt { folder: String, span: u32, cell_x: u32, cell_y: u32 },
    Expand { folder: String, span: u32 },
    Collapse(String),
    Tap { folder: String, x: f64, y: f64 },
    Render(String),
}

#[serde_as]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum IntentReport {
    Highlight { corner: Corner, alphas: [f64; 4] },
    ResetHandles { alphas: [f64; 4] },
    SnapFrame {
        from: Rect,
        to: Rect,
        #[serde_as(as = "DurationMilliSeconds<u64>")]
        duration_ms: Duration,
        /// Frames the caller draws at the configured rate.
        frames: u32,
    },
    SpanChanged { old: SpanState, new: SpanState },
}

impl IntentReport {
    pub fn new(intent: &ResizeIntent, fps: f64) -> Self {
        match intent {
            ResizeIntent::Highlight { corner, alphas } => IntentReport::Highlight {
                corner: *corner,
                alphas: *alphas,
            },
            ResizeIntent::ResetHandles => IntentReport::ResetHandles { alphas: reset_alphas() },
            ResizeIntent::SnapFrame(snap) => IntentReport::SnapFrame {
                from: snap.from(),
                to: snap.to(),
                duration_ms: snap.duration(),
                frames: snap.frame_count(fps),
            },
            ResizeIntent::SpanChanged(change) => IntentReport::SpanChanged {
                old: change.old,
                new: change.new,
            },
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Frame { shown: bool },
    Pointer { handled: bool, intents: Vec<IntentReport> },
    Mutation { result: Result<SpanState, String> },
    Tap { target: Option<TapTarget> },
    Render { drawn: bool, commands: DisplayList },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FolderReport {
    pub title: String,
    pub state: SpanState,
    pub expanded: bool,
    pub frame: Rect,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Report {
    pub outcomes: Vec<Outcome>,
    pub folders: Vec<FolderReport>,
    pub occupied_cells: usize,
}

/// Stands in for the icon loader: every item resolves to a stable handle
/// derived from its launch target.
#[derive(Debug, Default, Clone, Copy)]
pub struct HashedIcons;

impl IconSource for HashedIcons {
    fn icon_for(&self, item: &FolderItem) -> Option<IconHandle> {
        let mut hasher = FxHasher::default();
        item.target.hash(&mut hasher);
        Some(IconHandle(hasher.finish()))
    }
}

struct Runner {
    workspace: Workspace,
    titles: HashMap<String, ItemId>,
    order: Vec<(String, ItemId)>,
    padding: f64,
    fps: f64,
}

impl Runner {
    fn folder(&self, title: &str) -> Result<ItemId, ScenarioError> {
        self.titles.get(title).copied().ok_or_else(|| ScenarioError::UnknownFolder(title.to_owned()))
    }

    fn step(&mut self, action: &Action) -> Result<Outcome, ScenarioError> {
        Ok(match action {
            Action::ShowFrame(title) => {
                let id = self.folder(title)?;
                Outcome::Frame { shown: self.workspace.show_resize_frame(id).is_ok() }
            }
            Action::HideFrame => {
                self.workspace.hide_resize_frame();
                Outcome::Frame { shown: false }
            }
            Action::Pointer(event) => {
                let handled = self.workspace.handle_pointer(*event);
                let fps = self.fps;
                let intents = self
                    .workspace
                    .drain_intents()
                    .iter()
                    .map(|intent| IntentReport::new(intent, fps))
                    .collect();
                Outcome::Pointer { handled, intents }
            }
            Action::Attempt { folder, span, cell_x, cell_y } => {
                let id = self.folder(folder)?;
                mutation(self.workspace.attempt(id, *span, *cell_x, *cell_y).map(|c| c.new))
            }
            Action::Expand { folder, span } => {
                let id = self.folder(folder)?;
                mutation(self.workspace.expand_to_span(id, *span).map(|c| c.new))
            }
            Action::Collapse(folder) => {
                let id = self.folder(folder)?;
                mutation(self.workspace.collapse_to_one_by_one(id).map(|c| c.new))
            }
            Action::Tap { folder, x, y } => {
                let id = self.folder(folder)?;
                Outcome::Tap { target: self.workspace.tap(id, *x, *y) }
            }
            Action::Render(folder) => {
                let id = self.folder(folder)?;
                let mut commands = DisplayList::default();
                let drawn = self
                    .workspace
                    .render_folder(id, &mut commands, &HashedIcons)
                    .unwrap_or(false);
                Outcome::Render { drawn, commands }
            }
        })
    }

    fn report(self, outcomes: Vec<Outcome>) -> Report {
        let ws = &self.workspace;
        let padding = self.padding;
        let folders = self
            .order
            .iter()
            .filter_map(|(title, id)| {
                let folder = ws.folder(*id)?;
                let state = folder.state();
                Some(FolderReport {
                    title: title.clone(),
                    state,
                    expanded: state.is_expanded(),
                    frame: ws.metrics().region_rect(state.region()).outset(padding),
                })
            })
            .collect();
        Report {
            outcomes,
            folders,
            occupied_cells: ws.grid().occupied_count(),
        }
    }
}

fn mutation(result: Result<SpanState, WorkspaceError>) -> Outcome {
    Outcome::Mutation { result: result.map_err(|e| e.to_string()) }
}

impl Scenario {
    pub fn parse(text: &str) -> anyhow::Result<Scenario> { Ok(ron::from_str(text)?) }

    #[instrument(skip_all, fields(folders = self.folders.len(), actions = self.actions.len()))]
    pub fn run(&self, config: &Config, writer: Box<dyn SpanStateWriter>) -> Result<Report, ScenarioError> {
        let mut config = config.clone();
        if let Some(device) = self.device {
            let issues = device.validate();
            if !issues.is_empty() {
                return Err(ScenarioError::InvalidDevice(issues));
            }
            config.device = device;
        }
        let mut runner = Runner {
            workspace: Workspace::new(&config, writer),
            titles: HashMap::default(),
            order: Vec::new(),
            padding: config.settings.resize.background_padding,
            fps: config.settings.animation.fps,
        };

        for item in &self.items {
            runner
                .workspace
                .add_item(item.label.clone(), item.region)
                .map_err(|source| ScenarioError::Placement { name: item.label.clone(), source })?;
        }
        for folder in &self.folders {
            if runner.titles.contains_key(&folder.title) {
                return Err(ScenarioError::DuplicateFolder(folder.title.clone()));
            }
            let state = SpanState::new(folder.span, folder.cell_x, folder.cell_y);
            let id = runner
                .workspace
                .add_folder(folder.title.clone(), state, folder.items.clone())
                .map_err(|source| ScenarioError::Placement { name: folder.title.clone(), source })?;
            runner.titles.insert(folder.title.clone(), id);
            runner.order.push((folder.title.clone(), id));
        }

        let mut outcomes = Vec::with_capacity(self.actions.len());
        for action in &self.actions {
            let outcome = runner.step(action)?;
            debug!(?action, ?outcome, "Scenario step");
            outcomes.push(outcome);
        }
        Ok(runner.report(outcomes))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::actor::persistence::NullWriter;

    const SCENARIO: &str = r#"
        (
            device: Some((
                cell_width: 100,
                cell_height: 100,
                border_space: 0,
                icon_size: 50,
                grid_cols: 8,
                grid_rows: 8,
            )),
            items: [(label: "clock", region: (cell_x: 0, cell_y: 0, span_x: 1, span_y: 1))],
            folders: [
                (
                    title: "Games",
                    cell_x: 2,
                    cell_y: 2,
                    items: [(target: "chess"), (target: "go"), (target: "tetris", title: "Tetris")],
                ),
            ],
            actions: [
                ShowFrame("Games"),
                Pointer((phase: Down, x: 300.0, y: 300.0)),
                Pointer((phase: Move, x: 400.0, y: 400.0)),
                Pointer((phase: Up, x: 400.0, y: 400.0)),
                Tap(folder: "Games", x: 150.0, y: 150.0),
                Tap(folder: "Games", x: 50.0, y: 50.0),
                Render("Games"),
                Expand(folder: "Games", span: 9),
                Collapse("Games"),
                Attempt(folder: "Games", span: 2, cell_x: 0, cell_y: 0),
            ],
        )
    "#;

    #[test_log::test]
    fn runs_scripted_session() {
        let scenario = Scenario::parse(SCENARIO).unwrap();
        let report = scenario.run(&Config::default(), Box::new(NullWriter)).unwrap();

        let outcomes = &report.outcomes;
        assert_eq!(outcomes.len(), 10);
        assert_eq!(outcomes[0], Outcome::Frame { shown: true });
        let Outcome::Pointer { handled: true, intents } = &outcomes[2] else {
            panic!("unexpected {:?}", outcomes[2]);
        };
        assert!(intents.contains(&IntentReport::SpanChanged {
            old: SpanState::new(1, 2, 2),
            new: SpanState::new(2, 2, 2),
        }));
        assert_eq!(outcomes[4], Outcome::Tap { target: Some(TapTarget::OpenFolder) });
        assert_eq!(outcomes[5], Outcome::Tap { target: Some(TapTarget::Launch(0)) });
        let Outcome::Render { drawn: true, commands } = &outcomes[6] else {
            panic!("unexpected {:?}", outcomes[6]);
        };
        assert_eq!(commands.icons().count(), 3);
        assert_eq!(
            outcomes[7],
            Outcome::Mutation { result: Ok(SpanState::new(3, 2, 2)) }
        );
        assert_eq!(
            outcomes[8],
            Outcome::Mutation { result: Ok(SpanState::new(1, 2, 2)) }
        );
        let Outcome::Mutation { result: Err(message) } = &outcomes[9] else {
            panic!("unexpected {:?}", outcomes[9]);
        };
        assert!(message.contains("not vacant"), "{message}");

        assert_eq!(report.folders.len(), 1);
        assert_eq!(report.folders[0].state, SpanState::new(1, 2, 2));
        assert!(!report.folders[0].expanded);
        assert_eq!(report.occupied_cells, 2);
    }

    #[test_log::test]
    fn shipped_demo_runs() {
        let scenario = Scenario::parse(include_str!("../demos/resize.ron")).unwrap();
        let report = scenario.run(&Config::default(), Box::new(NullWriter)).unwrap();

        let outcomes = &report.outcomes;
        assert_eq!(outcomes.len(), 10);
        assert_eq!(outcomes[0], Outcome::Frame { shown: true });
        let Outcome::Pointer { handled: true, intents } = &outcomes[2] else {
            panic!("unexpected {:?}", outcomes[2]);
        };
        // 150ms at 100fps
        assert!(intents.iter().any(|i| matches!(i, IntentReport::SnapFrame { frames: 15, .. })));
        assert!(intents.contains(&IntentReport::SpanChanged {
            old: SpanState::new(1, 1, 2),
            new: SpanState::new(2, 1, 2),
        }));
        assert!(matches!(outcomes[7], Outcome::Mutation { result: Err(_) }));
        assert_eq!(
            outcomes[8],
            Outcome::Mutation { result: Ok(SpanState::new(3, 1, 2)) }
        );
        assert_eq!(report.folders[0].state, SpanState::new(1, 1, 2));
    }

    #[test]
    fn invalid_device_override_is_refused() {
        let scenario = Scenario::parse(
            r#"(device: Some((cell_width: 0, cell_height: 100, icon_size: 50, grid_cols: 0, grid_rows: 4)))"#,
        )
        .unwrap();
        let err = scenario.run(&Config::default(), Box::new(NullWriter)).unwrap_err();
        let ScenarioError::InvalidDevice(issues) = err else {
            panic!("unexpected {err:?}");
        };
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn unknown_and_duplicate_folders_fail() {
        let scenario = Scenario::parse(r#"(actions: [Collapse("nope")])"#).unwrap();
        assert_eq!(
            scenario.run(&Config::default(), Box::new(NullWriter)).unwrap_err(),
            ScenarioError::UnknownFolder("nope".into())
        );

        let scenario = Scenario::parse(
            r#"(folders: [(title: "a", cell_x: 0, cell_y: 0), (title: "a", cell_x: 1, cell_y: 0)])"#,
        )
        .unwrap();
        assert_eq!(
            scenario.run(&Config::default(), Box::new(NullWriter)).unwrap_err(),
            ScenarioError::DuplicateFolder("a".into())
        );
    }

    #[test]
    fn overlapping_items_report_placement() {
        let scenario = Scenario::parse(
            r#"(
                items: [(label: "w", region: (cell_x: 0, cell_y: 0, span_x: 2, span_y: 1))],
                folders: [(title: "f", cell_x: 1, cell_y: 0)],
            )"#,
        )
        .unwrap();
        let err = scenario.run(&Config::default(), Box::new(NullWriter)).unwrap_err();
        assert!(matches!(err, ScenarioError::Placement { ref name, .. } if name == "f"));
    }
}
