//! Domain types for GpuGrid cluster snapshots.
//!
//! Node → GPU → segment hierarchy plus the job queue. Field names on the
//! wire follow the upstream dashboard feed (camelCase), so a snapshot
//! fetched from the cluster API deserializes without a mapping layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a node in the cluster.
pub type NodeId = String;

/// Unique identifier for a GPU (cluster-wide).
pub type GpuId = String;

/// Unique identifier for a job.
pub type JobId = String;

/// Number of display blocks a GPU bar is quantized into.
pub const DEFAULT_BLOCKS_PER_GPU: u32 = 8;

// ── Usage tiers ───────────────────────────────────────────────────

/// Discrete share of a GPU: 25, 50, 75 or 100 percent.
///
/// Serialized as the bare percentage. Any other number fails to
/// deserialize, so the tier invariant holds for every ingested snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum UsageTier {
    Quarter,
    Half,
    ThreeQuarters,
    Full,
}

impl UsageTier {
    pub const ALL: [UsageTier; 4] = [
        UsageTier::Quarter,
        UsageTier::Half,
        UsageTier::ThreeQuarters,
        UsageTier::Full,
    ];

    pub fn percent(self) -> u32 {
        match self {
            UsageTier::Quarter => 25,
            UsageTier::Half => 50,
            UsageTier::ThreeQuarters => 75,
            UsageTier::Full => 100,
        }
    }

    /// Display quantization of this tier into `blocks_per_gpu` blocks.
    pub fn blocks(self, blocks_per_gpu: u32) -> u32 {
        self.percent() * blocks_per_gpu / 100
    }
}

impl TryFrom<u32> for UsageTier {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            25 => Ok(UsageTier::Quarter),
            50 => Ok(UsageTier::Half),
            75 => Ok(UsageTier::ThreeQuarters),
            100 => Ok(UsageTier::Full),
            other => Err(format!("usage must be one of 25, 50, 75, 100 (got {other})")),
        }
    }
}

impl From<UsageTier> for u32 {
    fn from(tier: UsageTier) -> Self {
        tier.percent()
    }
}

// ── GPU type ──────────────────────────────────────────────────────

/// Accelerator model installed on a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GpuType {
    A100,
    A30,
    H100,
    H200,
}

impl GpuType {
    pub const ALL: [GpuType; 4] = [GpuType::A100, GpuType::A30, GpuType::H100, GpuType::H200];

    pub fn as_str(self) -> &'static str {
        match self {
            GpuType::A100 => "A100",
            GpuType::A30 => "A30",
            GpuType::H100 => "H100",
            GpuType::H200 => "H200",
        }
    }
}

impl fmt::Display for GpuType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GpuType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GpuType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown GPU type: {s}"))
    }
}

/// GPU-type filter used by the cluster tabs and the tenant panel.
///
/// `All` is the wildcard ("전체" in the upstream UI).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum GpuTypeFilter {
    #[default]
    All,
    Only(GpuType),
}

impl GpuTypeFilter {
    pub fn matches(self, gpu_type: GpuType) -> bool {
        match self {
            GpuTypeFilter::All => true,
            GpuTypeFilter::Only(t) => t == gpu_type,
        }
    }
}

impl fmt::Display for GpuTypeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuTypeFilter::All => f.write_str("all"),
            GpuTypeFilter::Only(t) => f.write_str(t.as_str()),
        }
    }
}

impl FromStr for GpuTypeFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") || s == "전체" {
            return Ok(GpuTypeFilter::All);
        }
        s.parse().map(GpuTypeFilter::Only)
    }
}

impl TryFrom<String> for GpuTypeFilter {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<GpuTypeFilter> for String {
    fn from(filter: GpuTypeFilter) -> Self {
        filter.to_string()
    }
}

// ── Segment / GPU / Node ──────────────────────────────────────────

/// One tenant's share of a single GPU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub user: String,
    pub team: String,
    pub usage: UsageTier,
}

/// Operational status of a GPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GpuStatus {
    Active,
    Idle,
    Error,
}

/// A single GPU and the tenants sharing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gpu {
    pub id: GpuId,
    /// Display quantization of `total_usage` (0..=blocks per GPU).
    #[serde(rename = "usage")]
    pub usage_blocks: u32,
    pub status: GpuStatus,
    /// Empty unless `status` is `Active`.
    pub segments: Vec<Segment>,
    pub total_usage: UsageTier,
}

impl Gpu {
    pub fn is_active(&self) -> bool {
        self.status == GpuStatus::Active
    }

    /// Sum of the tenant shares on this GPU, in percent.
    pub fn segment_sum(&self) -> u32 {
        self.segments.iter().map(|s| s.usage.percent()).sum()
    }
}

/// Availability of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Online,
    Offline,
    Maintenance,
}

/// A cluster node and its GPUs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub gpu_type: GpuType,
    pub gpus: Vec<Gpu>,
    pub status: NodeStatus,
    /// Mean GPU fill (0.0–1.0), see [`Node::compute_avg_usage`].
    pub avg_usage: f64,
    /// CPU utilization percent (0–100).
    pub cpu_usage: u32,
    /// Memory utilization percent (0–100).
    pub memory_usage: u32,
}

impl Node {
    /// Mean of `usage_blocks / blocks_per_gpu` over active GPUs with a
    /// nonzero block count; 0 when there are none.
    pub fn compute_avg_usage(gpus: &[Gpu], blocks_per_gpu: u32) -> f64 {
        let used: Vec<u32> = gpus
            .iter()
            .filter(|g| g.is_active() && g.usage_blocks > 0)
            .map(|g| g.usage_blocks)
            .collect();
        if used.is_empty() || blocks_per_gpu == 0 {
            return 0.0;
        }
        let total: u32 = used.iter().sum();
        f64::from(total) / used.len() as f64 / f64::from(blocks_per_gpu)
    }

    pub fn count_gpus(&self, status: GpuStatus) -> usize {
        self.gpus.iter().filter(|g| g.status == status).count()
    }
}

// ── Job ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    High,
    Normal,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Running,
    Pending,
}

/// A queued or running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: JobId,
    pub name: String,
    pub user: String,
    pub team: String,
    pub priority: JobPriority,
    pub gpu_type: GpuType,
    /// Requested GPUs, fractional (0.25, 0.5, 1, 2, …).
    pub gpu_request: f64,
    pub cpu_request: u32,
    /// Requested memory in GB.
    #[serde(rename = "memoryRequest")]
    pub memory_request_gb: u32,
    /// Unix timestamp (seconds) of submission.
    pub submitted_at: u64,
    pub status: JobStatus,
}

/// Order jobs for the queue panel: running before pending, then by
/// priority (high first). Stable within equal keys.
pub fn sort_jobs(jobs: &mut [Job]) {
    jobs.sort_by_key(|j| (j.status, j.priority));
}
