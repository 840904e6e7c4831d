pub mod engine;
mod workspace;

pub use engine::{NoSpaceError, Rejected, SpanChange, SpanEngine};
pub use workspace::{Occupant, Workspace, WorkspaceError};
