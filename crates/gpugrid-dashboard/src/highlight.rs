//! GPU highlight sources and their precedence.
//!
//! Three sources can colour a GPU bar: the free-text cluster search, the
//! selected job, and the focus-mode selection. Each is a
//! [`HighlightProvider`]; [`resolve_highlights`] takes the first one in
//! priority order that yields a map.

use std::collections::{BTreeMap, HashMap};

use gpugrid_search::{SearchResult, UserGpuUsage, search_highlights};
use gpugrid_state::NodeId;
use serde::Serialize;

use crate::selection::SelectionState;

/// GPU index → highlight weight in percent. Weights are sums of tenant
/// shares and may exceed 100.
pub type GpuHighlights = BTreeMap<usize, u32>;

/// Node id → per-GPU highlight weights.
pub type HighlightMap = HashMap<NodeId, GpuHighlights>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HighlightSource {
    Search,
    Job,
    Focus,
}

pub trait HighlightProvider {
    fn source(&self) -> HighlightSource;

    /// `None` when this source is inactive.
    fn highlights(&self) -> Option<HighlightMap>;
}

/// Highlights from an active cluster search. Inactive when `results` is
/// `None`; an active search with no hits still wins with an empty map.
pub struct SearchHighlights<'r, 'n> {
    results: Option<&'r [SearchResult<'n>]>,
}

impl<'r, 'n> SearchHighlights<'r, 'n> {
    pub fn new(results: Option<&'r [SearchResult<'n>]>) -> Self {
        Self { results }
    }
}

impl HighlightProvider for SearchHighlights<'_, '_> {
    fn source(&self) -> HighlightSource {
        HighlightSource::Search
    }

    fn highlights(&self) -> Option<HighlightMap> {
        self.results.map(search_highlights)
    }
}

pub struct JobHighlights<'s> {
    state: &'s SelectionState,
}

impl<'s> JobHighlights<'s> {
    pub fn new(state: &'s SelectionState) -> Self {
        Self { state }
    }
}

impl HighlightProvider for JobHighlights<'_> {
    fn source(&self) -> HighlightSource {
        HighlightSource::Job
    }

    fn highlights(&self) -> Option<HighlightMap> {
        self.state.job_highlight.clone()
    }
}

pub struct FocusHighlights<'s> {
    state: &'s SelectionState,
}

impl<'s> FocusHighlights<'s> {
    pub fn new(state: &'s SelectionState) -> Self {
        Self { state }
    }
}

impl HighlightProvider for FocusHighlights<'_> {
    fn source(&self) -> HighlightSource {
        HighlightSource::Focus
    }

    fn highlights(&self) -> Option<HighlightMap> {
        self.state
            .focus_mode
            .then(|| sum_usages(&self.state.selected_usages))
    }
}

/// Sum tenant shares per `(node, GPU)`. No clamp is applied.
pub(crate) fn sum_usages<'a>(usages: impl IntoIterator<Item = &'a UserGpuUsage>) -> HighlightMap {
    let mut map = HighlightMap::new();
    for usage in usages {
        *map.entry(usage.node_id.clone())
            .or_default()
            .entry(usage.gpu_index)
            .or_default() += usage.segment_usage;
    }
    map
}

/// The winning highlight map, or an empty one when no source is active.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ResolvedHighlights {
    pub source: Option<HighlightSource>,
    pub map: HighlightMap,
}

impl ResolvedHighlights {
    pub fn for_node(&self, node_id: &str) -> GpuHighlights {
        self.map.get(node_id).cloned().unwrap_or_default()
    }
}

pub fn resolve_highlights(providers: &[&dyn HighlightProvider]) -> ResolvedHighlights {
    providers
        .iter()
        .find_map(|p| {
            p.highlights().map(|map| ResolvedHighlights {
                source: Some(p.source()),
                map,
            })
        })
        .unwrap_or_default()
}
