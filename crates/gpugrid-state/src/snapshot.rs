//! ClusterSnapshot — the wholesale node/job picture handed to the engines.
//!
//! Snapshots are replaced atomically on refresh; there is no delta
//! protocol. Ingestion is the only place invariants are checked: once a
//! snapshot has passed [`ClusterSnapshot::ingest`], search and selection
//! treat it as well-formed.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{StateError, StateResult};
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

/// What to do with a snapshot that violates the model invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestPolicy {
    /// Reject the whole snapshot.
    Strict,
    /// Clamp or drop offending entries and keep the rest.
    #[default]
    Sanitize,
}

/// A single invariant violation found by [`ClusterSnapshot::validate`].
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotIssue {
    DuplicateNode { node_id: NodeId },
    InactiveGpuInUse { node_id: NodeId, gpu_id: GpuId },
    SegmentsExceedTotal { node_id: NodeId, gpu_id: GpuId, sum: u32, total: u32 },
    BlocksOutOfRange { node_id: NodeId, gpu_id: GpuId, blocks: u32 },
    AvgUsageOutOfRange { node_id: NodeId, value: f64 },
    PercentOutOfRange { node_id: NodeId, field: &'static str, value: u32 },
}

impl fmt::Display for SnapshotIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotIssue::DuplicateNode { node_id } => write!(f, "duplicate node id {node_id}"),
            SnapshotIssue::InactiveGpuInUse { node_id, gpu_id } => {
                write!(f, "{node_id}/{gpu_id}: idle or failed GPU carries usage")
            }
            SnapshotIssue::SegmentsExceedTotal { node_id, gpu_id, sum, total } => {
                write!(f, "{node_id}/{gpu_id}: segments sum to {sum}% over total {total}%")
            }
            SnapshotIssue::BlocksOutOfRange { node_id, gpu_id, blocks } => {
                write!(f, "{node_id}/{gpu_id}: {blocks} usage blocks out of range")
            }
            SnapshotIssue::AvgUsageOutOfRange { node_id, value } => {
                write!(f, "{node_id}: avgUsage {value} outside 0..=1")
            }
            SnapshotIssue::PercentOutOfRange { node_id, field, value } => {
                write!(f, "{node_id}: {field} {value}% above 100")
            }
        }
    }
}

/// Point-in-time picture of the cluster.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    /// Monotonic version assigned by the producer; 0 if unknown.
    #[serde(default)]
    pub version: u64,
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub jobs: Vec<Job>,
}

impl ClusterSnapshot {
    pub fn new(nodes: Vec<Node>, jobs: Vec<Job>) -> Self {
        Self { version: 0, nodes, jobs }
    }

    /// Parse a snapshot from JSON. Off-tier usage values fail here.
    pub fn from_json(json: &str) -> StateResult<Self> {
        serde_json::from_str(json).map_err(map_err!(Deserialize))
    }

    pub fn to_json(&self) -> StateResult<String> {
        serde_json::to_string_pretty(self).map_err(map_err!(Serialize))
    }

    /// Read, parse and ingest a snapshot file.
    pub fn load(path: &Path, policy: IngestPolicy) -> StateResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let snapshot = Self::from_json(&contents)?.ingest(policy, DEFAULT_BLOCKS_PER_GPU)?;
        debug!(?path, nodes = snapshot.nodes.len(), jobs = snapshot.jobs.len(), "snapshot loaded");
        Ok(snapshot)
    }

    /// List every invariant violation in the snapshot.
    pub fn validate(&self, blocks_per_gpu: u32) -> Vec<SnapshotIssue> {
        let mut issues = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();

        for node in &self.nodes {
            if !seen.insert(node.id.as_str()) {
                issues.push(SnapshotIssue::DuplicateNode { node_id: node.id.clone() });
            }
            if !node.avg_usage.is_finite() || !(0.0..=1.0).contains(&node.avg_usage) {
                issues.push(SnapshotIssue::AvgUsageOutOfRange {
                    node_id: node.id.clone(),
                    value: node.avg_usage,
                });
            }
            for (field, value) in [("cpuUsage", node.cpu_usage), ("memoryUsage", node.memory_usage)] {
                if value > 100 {
                    issues.push(SnapshotIssue::PercentOutOfRange {
                        node_id: node.id.clone(),
                        field,
                        value,
                    });
                }
            }
            for gpu in &node.gpus {
                if !gpu.is_active() && (!gpu.segments.is_empty() || gpu.usage_blocks > 0) {
                    issues.push(SnapshotIssue::InactiveGpuInUse {
                        node_id: node.id.clone(),
                        gpu_id: gpu.id.clone(),
                    });
                }
                let sum = gpu.segment_sum();
                let total = gpu.total_usage.percent();
                if sum > total {
                    issues.push(SnapshotIssue::SegmentsExceedTotal {
                        node_id: node.id.clone(),
                        gpu_id: gpu.id.clone(),
                        sum,
                        total,
                    });
                }
                if gpu.usage_blocks > blocks_per_gpu {
                    issues.push(SnapshotIssue::BlocksOutOfRange {
                        node_id: node.id.clone(),
                        gpu_id: gpu.id.clone(),
                        blocks: gpu.usage_blocks,
                    });
                }
            }
        }
        issues
    }

    /// Check the snapshot at the ingestion boundary.
    ///
    /// Under [`IngestPolicy::Strict`] any issue rejects the snapshot. Under
    /// [`IngestPolicy::Sanitize`] offending entries are corrected and each
    /// correction is logged.
    pub fn ingest(self, policy: IngestPolicy, blocks_per_gpu: u32) -> StateResult<Self> {
        let issues = self.validate(blocks_per_gpu);
        if issues.is_empty() {
            return Ok(self);
        }
        match policy {
            IngestPolicy::Strict => Err(StateError::Invalid {
                count: issues.len(),
                first: issues[0].to_string(),
            }),
            IngestPolicy::Sanitize => {
                for issue in &issues {
                    warn!(%issue, "sanitizing snapshot entry");
                }
                Ok(self.sanitize(blocks_per_gpu))
            }
        }
    }

    fn sanitize(mut self, blocks_per_gpu: u32) -> Self {
        let mut seen: HashSet<NodeId> = HashSet::new();
        self.nodes.retain(|n| seen.insert(n.id.clone()));

        for node in &mut self.nodes {
            let mut gpus_corrected = false;
            for gpu in &mut node.gpus {
                if !gpu.is_active() {
                    gpus_corrected |= !gpu.segments.is_empty() || gpu.usage_blocks != 0;
                    gpu.segments.clear();
                    gpu.usage_blocks = 0;
                    continue;
                }
                // Keep the leading segments that fit under the GPU total.
                let total = gpu.total_usage.percent();
                let mut running = 0;
                gpu.segments.retain(|s| {
                    running += s.usage.percent();
                    running <= total
                });
                gpus_corrected |= gpu.usage_blocks > blocks_per_gpu;
                gpu.usage_blocks = gpu.usage_blocks.min(blocks_per_gpu);
            }
            node.cpu_usage = node.cpu_usage.min(100);
            node.memory_usage = node.memory_usage.min(100);
            if gpus_corrected
                || !node.avg_usage.is_finite()
                || !(0.0..=1.0).contains(&node.avg_usage)
            {
                node.avg_usage = Node::compute_avg_usage(&node.gpus, blocks_per_gpu);
            }
        }
        self
    }
}
