//! gpugrid-dashboard — derives what the cluster dashboard shows.
//!
//! Given a snapshot, the operator's query and the current selection, this
//! crate decides which nodes are visible, in what order, which of them
//! pulse, and how much of each GPU bar is highlighted. Rendering itself
//! lives outside; everything here is a pure function of its inputs.
//!
//! # Components
//!
//! - **`selection`** — `SelectionState` and its transitions
//!   (`select`, `clear_all`, focus mode, job-derived highlight)
//! - **`highlight`** — highlight providers and their precedence
//!   (search > job > focus)
//! - **`ordering`** — base order and promotion tiers
//! - **`layout`** — square grid geometry
//! - **`views`** — the assembled view model handed to a renderer
//! - **`config`** — `gpugrid.toml` dashboard settings

pub mod config;
pub mod highlight;
pub mod layout;
pub mod ordering;
pub mod selection;
pub mod views;

pub use config::DashboardConfig;
pub use highlight::{
    FocusHighlights, GpuHighlights, HighlightMap, HighlightProvider, HighlightSource,
    JobHighlights, ResolvedHighlights, SearchHighlights, resolve_highlights,
};
pub use layout::{GridGeometry, cell_size, grid_size, optimal_grid_size};
pub use ordering::{
    cluster_base_order, focus_visible_nodes, presentation_order, promote, search_base_order,
};
pub use selection::{
    JobSelection, PresentationMode, SelectionEvent, SelectionMode, SelectionState,
};
pub use views::{
    DashboardRequest, DashboardView, GpuBarView, JobView, NodeCardView, ResourceStats,
    UsagePanelView, build_dashboard_view, build_job_queue,
};
