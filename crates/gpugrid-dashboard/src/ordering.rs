//! Which nodes the grid shows, and in what order.
//!
//! Overview mode starts from a base order (busiest first, or search-result
//! order while a search is active) and promotes selected nodes to the
//! front in tiers. Focus mode shows only the nodes holding selected
//! usages, in snapshot order.

use std::collections::HashSet;

use gpugrid_search::SearchResult;
use gpugrid_state::{GpuTypeFilter, Node, NodeId};

use crate::selection::SelectionState;

/// Nodes of the cluster tab's GPU type, busiest first. Equal averages
/// keep snapshot order.
pub fn cluster_base_order(nodes: &[Node], filter: GpuTypeFilter) -> Vec<&Node> {
    let mut ordered: Vec<&Node> = nodes.iter().filter(|n| filter.matches(n.gpu_type)).collect();
    ordered.sort_by(|a, b| b.avg_usage.total_cmp(&a.avg_usage));
    ordered
}

/// Search hits in result order, narrowed by the search GPU-type filter.
pub fn search_base_order<'n>(results: &[SearchResult<'n>], filter: GpuTypeFilter) -> Vec<&'n Node> {
    results
        .iter()
        .filter(|r| filter.matches(r.gpu_type()))
        .map(|r| r.node)
        .collect()
}

/// Stable three-tier partition: selected nodes, then job nodes not
/// already promoted, then the rest.
pub fn promote<'n>(
    base: Vec<&'n Node>,
    selected: &HashSet<NodeId>,
    job_nodes: Option<&[NodeId]>,
) -> Vec<&'n Node> {
    let job_nodes: HashSet<&str> = job_nodes
        .unwrap_or_default()
        .iter()
        .map(String::as_str)
        .collect();
    if selected.is_empty() && job_nodes.is_empty() {
        return base;
    }

    let (first, rest): (Vec<&Node>, Vec<&Node>) =
        base.into_iter().partition(|n| selected.contains(&n.id));
    let (second, third): (Vec<&Node>, Vec<&Node>) =
        rest.into_iter().partition(|n| job_nodes.contains(n.id.as_str()));

    first.into_iter().chain(second).chain(third).collect()
}

/// Nodes holding at least one selected usage, in snapshot order.
pub fn focus_visible_nodes<'n>(nodes: &'n [Node], selected: &HashSet<NodeId>) -> Vec<&'n Node> {
    nodes.iter().filter(|n| selected.contains(&n.id)).collect()
}

/// Final grid order for the current state.
///
/// `search` is `Some` while a cluster search is active, even when it has
/// no hits.
pub fn presentation_order<'n>(
    nodes: &'n [Node],
    search: Option<&[SearchResult<'n>]>,
    state: &SelectionState,
    cluster_filter: GpuTypeFilter,
    search_filter: GpuTypeFilter,
) -> Vec<&'n Node> {
    let selected = state.selected_node_ids();
    if state.focus_mode {
        return focus_visible_nodes(nodes, &selected);
    }
    let base = match search {
        Some(results) => search_base_order(results, search_filter),
        None => cluster_base_order(nodes, cluster_filter),
    };
    promote(base, &selected, state.job_sort_node_ids.as_deref())
}
