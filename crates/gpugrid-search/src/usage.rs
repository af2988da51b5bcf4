//! Per-tenant GPU usage index for the tenant search panel.
//!
//! Flattens the snapshot into `(node, GPU, tenant)` records whose user,
//! team, GPU type, node name or node id contain every query token. Only
//! active GPUs are scanned. Records are unique by `(gpu_id, user, team)`
//! and sorted by node name.

use std::collections::{BTreeMap, HashMap};

use gpugrid_state::{GpuId, GpuType, GpuTypeFilter, Node, NodeId};
use serde::Serialize;
use tracing::debug;

use crate::collate::locale_compare;
use crate::query::{any_field_contains, tokenize_query};

/// Composite identity of a usage record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageKey {
    pub gpu_id: GpuId,
    pub user: String,
    pub team: String,
}

/// One tenant's share of one GPU, flattened with its node context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserGpuUsage {
    pub node_id: NodeId,
    pub node_name: String,
    pub gpu_id: GpuId,
    pub gpu_index: usize,
    pub user: String,
    pub team: String,
    /// Total usage of the GPU, percent.
    pub total_usage: u32,
    /// This tenant's share of the GPU, percent.
    pub segment_usage: u32,
    pub gpu_type: GpuType,
}

impl UserGpuUsage {
    pub fn key(&self) -> UsageKey {
        UsageKey {
            gpu_id: self.gpu_id.clone(),
            user: self.user.clone(),
            team: self.team.clone(),
        }
    }

    pub fn same_key(&self, other: &UserGpuUsage) -> bool {
        self.gpu_id == other.gpu_id && self.user == other.user && self.team == other.team
    }
}

/// Find every tenant share whose fields contain all query tokens.
///
/// Duplicate keys collapse into one record: the first occurrence keeps its
/// position and the last occurrence's values win. Ties in node name keep
/// node → GPU → segment order.
///
/// A blank term yields nothing. A term made only of separators (`","`,
/// `"/"`) yields no tokens, so every active tenant share matches.
pub fn find_by_user_or_team(nodes: &[Node], term: &str) -> Vec<UserGpuUsage> {
    if term.trim().is_empty() {
        return Vec::new();
    }
    let tokens = tokenize_query(term);

    let mut results: Vec<UserGpuUsage> = Vec::new();
    let mut positions: HashMap<UsageKey, usize> = HashMap::new();

    for node in nodes {
        for (gpu_index, gpu) in node.gpus.iter().enumerate() {
            if !gpu.is_active() {
                continue;
            }
            for segment in &gpu.segments {
                let fields = [
                    segment.user.as_str(),
                    segment.team.as_str(),
                    node.gpu_type.as_str(),
                    node.name.as_str(),
                    node.id.as_str(),
                ];
                if !tokens.iter().all(|t| any_field_contains(&fields, t)) {
                    continue;
                }
                let record = UserGpuUsage {
                    node_id: node.id.clone(),
                    node_name: node.name.clone(),
                    gpu_id: gpu.id.clone(),
                    gpu_index,
                    user: segment.user.clone(),
                    team: segment.team.clone(),
                    total_usage: gpu.total_usage.percent(),
                    segment_usage: segment.usage.percent(),
                    gpu_type: node.gpu_type,
                };
                match positions.get(&record.key()) {
                    Some(&at) => results[at] = record,
                    None => {
                        positions.insert(record.key(), results.len());
                        results.push(record);
                    }
                }
            }
        }
    }

    results.sort_by(|a, b| locale_compare(&a.node_name, &b.node_name));
    debug!(tokens = tokens.len(), records = results.len(), "tenant usage search");
    results
}

/// Narrow an existing result list by a single free-text term matched
/// against node name, user, team and GPU type.
pub fn refine_usages(results: &[UserGpuUsage], term: &str) -> Vec<UserGpuUsage> {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return results.to_vec();
    }
    results
        .iter()
        .filter(|u| {
            any_field_contains(
                &[u.node_name.as_str(), u.user.as_str(), u.team.as_str(), u.gpu_type.as_str()],
                &needle,
            )
        })
        .cloned()
        .collect()
}

pub fn filter_by_gpu_type(results: &[UserGpuUsage], filter: GpuTypeFilter) -> Vec<UserGpuUsage> {
    results
        .iter()
        .filter(|u| filter.matches(u.gpu_type))
        .cloned()
        .collect()
}

/// Record counts per GPU type, for the panel's filter buttons.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GpuTypeCounts {
    pub total: usize,
    pub by_type: BTreeMap<GpuType, usize>,
}

impl GpuTypeCounts {
    pub fn get(&self, filter: GpuTypeFilter) -> usize {
        match filter {
            GpuTypeFilter::All => self.total,
            GpuTypeFilter::Only(t) => self.by_type.get(&t).copied().unwrap_or(0),
        }
    }
}

pub fn count_by_gpu_type(results: &[UserGpuUsage]) -> GpuTypeCounts {
    let mut counts = GpuTypeCounts {
        total: results.len(),
        ..Default::default()
    };
    for u in results {
        *counts.by_type.entry(u.gpu_type).or_default() += 1;
    }
    counts
}

/// Summed tenant share per GPU type, in whole-GPU units
/// (two 50% shares = 1.0 GPU).
pub fn usage_summary(results: &[UserGpuUsage]) -> BTreeMap<GpuType, f64> {
    let mut summary: BTreeMap<GpuType, f64> = BTreeMap::new();
    for u in results {
        *summary.entry(u.gpu_type).or_default() += f64::from(u.segment_usage) / 100.0;
    }
    summary.retain(|_, v| *v > 0.0);
    summary
}
