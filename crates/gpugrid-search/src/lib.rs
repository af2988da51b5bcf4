//! GpuGrid search — locating tenants and nodes in a cluster snapshot.
//!
//! Two independent engines read the same snapshot:
//!
//! - **`matcher`** — compound `/`-delimited query over nodes. Every part
//!   must match (AND), each part may match node name, node id, user or
//!   team (OR). Produces per-node match detail.
//! - **`usage`** — flat, deduplicated `(node, GPU, tenant)` records for
//!   the tenant panel. Broader field set (adds GPU type), whitespace/`/`/`,`
//!   tokenized, active GPUs only, sorted by node name.
//!
//! Neither engine fails: an empty query or no match yields an empty list.

pub mod collate;
pub mod matcher;
pub mod query;
pub mod usage;

pub use collate::locale_compare;
pub use matcher::{SearchResult, complex_search, search_highlights};
pub use query::{split_compound_query, tokenize_query};
pub use usage::{
    GpuTypeCounts, UsageKey, UserGpuUsage, count_by_gpu_type, filter_by_gpu_type,
    find_by_user_or_team, refine_usages, usage_summary,
};
