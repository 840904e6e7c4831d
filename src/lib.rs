//! Square, resizable launcher folders on a fixed cell grid.

pub mod actor;
pub mod common {
    pub mod collections;
    pub mod config;
    pub mod log;
}
pub mod layout_engine;
pub mod model {
    pub mod folder;
    pub mod metrics;
    pub mod occupancy;
    pub mod span_state;
}
pub mod scenario;
pub mod sys {
    pub mod geometry;
}
pub mod ui {
    pub mod expanded_folder;
}

static_assertions::assert_impl_all!(actor::persistence::Sender: Send, Sync);
static_assertions::assert_impl_all!(model::folder::ItemId: Copy, Ord, std::hash::Hash);
