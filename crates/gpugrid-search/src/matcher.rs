//! Compound search over nodes, GPUs and usage segments.
//!
//! A query like `A30-01/voice/hong` is split on `/` into parts. A segment
//! matches when every part is a case-insensitive substring of at least one
//! of: node name, node id, segment user, segment team. Results keep the
//! input node order; ranking is a caller concern.

use std::collections::{BTreeMap, HashMap};

use gpugrid_state::{GpuType, Node, NodeId, Segment};
use serde::Serialize;
use tracing::debug;

use crate::query::{any_field_contains, split_compound_query};

/// Match detail for one node.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult<'a> {
    pub node: &'a Node,
    /// Indexes of GPUs with at least one matching segment, ascending.
    pub matching_gpus: Vec<usize>,
    /// Every GPU on the node has a matching segment.
    pub is_full_node_match: bool,
    /// GPU index → indexes of its matching segments.
    pub matching_segments: BTreeMap<usize, Vec<usize>>,
}

impl<'a> SearchResult<'a> {
    pub fn node_id(&self) -> &'a str {
        &self.node.id
    }

    pub fn gpu_type(&self) -> GpuType {
        self.node.gpu_type
    }
}

fn segment_matches(node: &Node, segment: &Segment, parts: &[String]) -> bool {
    let fields = [
        node.name.as_str(),
        node.id.as_str(),
        segment.user.as_str(),
        segment.team.as_str(),
    ];
    parts.iter().all(|part| any_field_contains(&fields, part))
}

/// Run a compound query against the snapshot nodes.
pub fn complex_search<'a>(nodes: &'a [Node], term: &str) -> Vec<SearchResult<'a>> {
    if term.trim().is_empty() {
        return Vec::new();
    }
    let parts = split_compound_query(term);
    if parts.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();
    for node in nodes {
        let mut matching_gpus = Vec::new();
        let mut matching_segments = BTreeMap::new();

        for (gpu_index, gpu) in node.gpus.iter().enumerate() {
            let hits: Vec<usize> = gpu
                .segments
                .iter()
                .enumerate()
                .filter(|(_, segment)| segment_matches(node, segment, &parts))
                .map(|(segment_index, _)| segment_index)
                .collect();
            if !hits.is_empty() {
                matching_gpus.push(gpu_index);
                matching_segments.insert(gpu_index, hits);
            }
        }

        if !matching_gpus.is_empty() {
            results.push(SearchResult {
                node,
                is_full_node_match: matching_gpus.len() == node.gpus.len(),
                matching_gpus,
                matching_segments,
            });
        }
    }

    debug!(parts = parts.len(), nodes = results.len(), "complex search");
    results
}

/// Search-derived highlight weights: node → GPU index → summed usage of
/// the matching segments on that GPU.
pub fn search_highlights(results: &[SearchResult<'_>]) -> HashMap<NodeId, BTreeMap<usize, u32>> {
    results
        .iter()
        .map(|r| {
            let per_gpu = r
                .matching_segments
                .iter()
                .map(|(&gpu_index, segments)| {
                    let gpu = &r.node.gpus[gpu_index];
                    let sum = segments.iter().map(|&s| gpu.segments[s].usage.percent()).sum();
                    (gpu_index, sum)
                })
                .collect();
            (r.node.id.clone(), per_gpu)
        })
        .collect()
}
