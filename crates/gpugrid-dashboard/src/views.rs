//! View model for the cluster dashboard.
//!
//! These types carry pre-computed fields (positions, block counts,
//! display strings) so a renderer only has to lay them out.

use std::collections::BTreeMap;

use gpugrid_search::{
    GpuTypeCounts, UserGpuUsage, complex_search, count_by_gpu_type, filter_by_gpu_type,
    find_by_user_or_team, refine_usages, usage_summary,
};
use gpugrid_state::{
    ClusterSnapshot, Gpu, GpuStatus, GpuType, GpuTypeFilter, Job, JobId, JobPriority, JobStatus,
    Node, NodeId, sort_jobs,
};
use serde::Serialize;
use tracing::debug;

use crate::config::DashboardConfig;
use crate::highlight::{
    FocusHighlights, GpuHighlights, HighlightProvider, HighlightSource, JobHighlights,
    SearchHighlights, resolve_highlights,
};
use crate::layout::GridGeometry;
use crate::ordering::presentation_order;
use crate::selection::{PresentationMode, SelectionMode, SelectionState};

// ── Request ─────────────────────────────────────────────────────

/// Operator inputs that are not part of `SelectionState`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DashboardRequest<'q> {
    /// Free-text query; drives both the cluster search and the tenant panel.
    pub query: &'q str,
    /// Cluster tab shown while no search is active.
    pub cluster_gpu_type: GpuTypeFilter,
    /// Filter applied to search hits and the tenant panel.
    pub search_gpu_type: GpuTypeFilter,
    /// Second-level filter typed into the tenant panel.
    pub panel_refine: &'q str,
    /// An expanded side panel covers the grid; pulses are suppressed.
    pub expand_panel_active: bool,
    /// Unix seconds used for relative times.
    pub now: u64,
}

impl DashboardRequest<'_> {
    pub fn search_active(&self) -> bool {
        !self.query.trim().is_empty()
    }
}

// ── Node cards ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpuBarView {
    pub index: usize,
    pub gpu_id: String,
    pub status: GpuStatus,
    pub used_blocks: u32,
    /// Raw highlight weight in percent, unclamped.
    pub highlight_weight: u32,
    /// `highlight_weight` in blocks, capped at the bar length.
    pub highlighted_blocks: u32,
    /// `user (team)` per segment.
    pub tenants: Vec<String>,
}

impl GpuBarView {
    pub fn from_gpu(index: usize, gpu: &Gpu, highlight_weight: u32, blocks_per_gpu: u32) -> Self {
        Self {
            index,
            gpu_id: gpu.id.clone(),
            status: gpu.status,
            used_blocks: gpu.usage_blocks,
            highlight_weight,
            highlighted_blocks: weight_to_blocks(highlight_weight, blocks_per_gpu),
            tenants: gpu
                .segments
                .iter()
                .map(|s| format!("{} ({})", s.user, s.team))
                .collect(),
        }
    }
}

fn weight_to_blocks(weight: u32, blocks_per_gpu: u32) -> u32 {
    let blocks = u64::from(weight) * u64::from(blocks_per_gpu) / 100;
    blocks.min(u64::from(blocks_per_gpu)) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeCardView {
    pub node_id: NodeId,
    pub name: String,
    pub gpu_type: GpuType,
    /// Zero-based slot in the grid.
    pub position: usize,
    pub pulse: bool,
    /// Shown in the node-detail panel.
    pub is_selected: bool,
    pub highlighted_gpu_usages: GpuHighlights,
    pub gpus: Vec<GpuBarView>,
    pub active_gpus: usize,
    pub idle_gpus: usize,
    pub error_gpus: usize,
    pub avg_usage_percent: u32,
    pub title: String,
}

impl NodeCardView {
    pub fn from_node(
        node: &Node,
        position: usize,
        highlights: GpuHighlights,
        pulse: bool,
        is_selected: bool,
        blocks_per_gpu: u32,
    ) -> Self {
        let gpus = node
            .gpus
            .iter()
            .enumerate()
            .map(|(i, gpu)| {
                let weight = highlights.get(&i).copied().unwrap_or(0);
                GpuBarView::from_gpu(i, gpu, weight, blocks_per_gpu)
            })
            .collect();
        let active_gpus = node.count_gpus(GpuStatus::Active);
        let avg_usage_percent = (node.avg_usage * 100.0).round().clamp(0.0, 100.0) as u32;

        Self {
            node_id: node.id.clone(),
            name: node.name.clone(),
            gpu_type: node.gpu_type,
            position,
            pulse,
            is_selected,
            highlighted_gpu_usages: highlights,
            gpus,
            active_gpus,
            idle_gpus: node.count_gpus(GpuStatus::Idle),
            error_gpus: node.count_gpus(GpuStatus::Error),
            avg_usage_percent,
            title: format!(
                "{} ({}/{} GPUs active, {}% used)",
                node.name,
                active_gpus,
                node.gpus.len(),
                avg_usage_percent
            ),
        }
    }
}

// ── Resource stats ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceStats {
    pub cpu_usage: u32,
    pub memory_usage: u32,
    pub label: String,
    /// Set when the figures belong to a single node.
    pub node_id: Option<NodeId>,
}

impl ResourceStats {
    pub fn from_node(node: &Node) -> Self {
        Self {
            cpu_usage: node.cpu_usage,
            memory_usage: node.memory_usage,
            label: node.name.clone(),
            node_id: Some(node.id.clone()),
        }
    }

    /// Rounded means over `nodes`; zero when there are none.
    pub fn mean_of(nodes: &[&Node], label: String) -> Self {
        Self {
            cpu_usage: rounded_mean(nodes.iter().map(|n| n.cpu_usage)),
            memory_usage: rounded_mean(nodes.iter().map(|n| n.memory_usage)),
            label,
            node_id: None,
        }
    }
}

fn rounded_mean(values: impl Iterator<Item = u32>) -> u32 {
    let (sum, count) = values.fold((0u64, 0u64), |(s, c), v| (s + u64::from(v), c + 1));
    if count == 0 {
        return 0;
    }
    ((2 * sum + count) / (2 * count)) as u32
}

// ── Tenant panel ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UsagePanelView {
    /// Records after the GPU-type filter and the panel refine term.
    pub results: Vec<UserGpuUsage>,
    /// Counts over every hit, for the filter buttons.
    pub counts: GpuTypeCounts,
    /// Whole-GPU totals per type over the type-filtered hits.
    pub summary: BTreeMap<GpuType, f64>,
}

impl UsagePanelView {
    pub fn build(nodes: &[Node], request: &DashboardRequest<'_>) -> Self {
        if !request.search_active() {
            return Self::default();
        }
        let hits = find_by_user_or_team(nodes, request.query);
        let typed = filter_by_gpu_type(&hits, request.search_gpu_type);
        Self {
            counts: count_by_gpu_type(&hits),
            summary: usage_summary(&typed),
            results: refine_usages(&typed, request.panel_refine),
        }
    }
}

// ── Jobs ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobView {
    pub id: JobId,
    pub name: String,
    pub user: String,
    pub team: String,
    pub priority: JobPriority,
    pub status: JobStatus,
    pub gpu_type: GpuType,
    pub gpu_request_display: String,
    pub cpu_request: u32,
    pub memory_display: String,
    pub submitted_ago: String,
    pub submitted_at_display: String,
    /// This job drives the current job highlight.
    pub is_highlighted: bool,
}

impl JobView {
    pub fn from_job(job: &Job, now: u64) -> Self {
        Self {
            id: job.id.clone(),
            name: job.name.clone(),
            user: job.user.clone(),
            team: job.team.clone(),
            priority: job.priority,
            status: job.status,
            gpu_type: job.gpu_type,
            gpu_request_display: format!("{} GPU", job.gpu_request),
            cpu_request: job.cpu_request,
            memory_display: format!("{}GB", job.memory_request_gb),
            submitted_ago: format_time_ago(job.submitted_at, now),
            submitted_at_display: format_timestamp(job.submitted_at),
            is_highlighted: false,
        }
    }
}

/// Jobs for the cluster tab's GPU type, running first then by priority.
pub fn build_job_queue(
    jobs: &[Job],
    filter: GpuTypeFilter,
    state: &SelectionState,
    now: u64,
) -> Vec<JobView> {
    let mut queue: Vec<Job> = jobs
        .iter()
        .filter(|j| filter.matches(j.gpu_type))
        .cloned()
        .collect();
    sort_jobs(&mut queue);

    let selected = state.selected_job.as_ref().map(|j| j.job_id.as_str());
    queue
        .iter()
        .map(|job| JobView {
            is_highlighted: selected == Some(job.id.as_str()),
            ..JobView::from_job(job, now)
        })
        .collect()
}

// ── Dashboard ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub presentation: PresentationMode,
    pub selection: SelectionMode,
    pub search_active: bool,
    /// Nodes matched by the cluster search before the type filter.
    pub search_match_count: usize,
    pub nodes: Vec<NodeCardView>,
    pub grid: GridGeometry,
    pub highlight_source: Option<HighlightSource>,
    pub resource_stats: ResourceStats,
    pub usage_results: UsagePanelView,
    pub jobs: Vec<JobView>,
}

/// Derive everything the dashboard shows for one state.
pub fn build_dashboard_view(
    snapshot: &ClusterSnapshot,
    state: &SelectionState,
    request: &DashboardRequest<'_>,
    config: &DashboardConfig,
) -> DashboardView {
    let nodes = snapshot.nodes.as_slice();
    let search_results = request
        .search_active()
        .then(|| complex_search(nodes, request.query));
    let search = search_results.as_deref();

    let order = presentation_order(
        nodes,
        search,
        state,
        request.cluster_gpu_type,
        request.search_gpu_type,
    );

    let search_highlights = SearchHighlights::new(search);
    let job_highlights = JobHighlights::new(state);
    let focus_highlights = FocusHighlights::new(state);
    let providers: [&dyn HighlightProvider; 3] =
        [&search_highlights, &job_highlights, &focus_highlights];
    let resolved = resolve_highlights(&providers);

    let selected_ids = state.selected_node_ids();
    let pulse_enabled =
        !state.focus_mode && !state.selected_usages.is_empty() && !request.expand_panel_active;

    let cards: Vec<NodeCardView> = order
        .iter()
        .enumerate()
        .map(|(position, node)| {
            NodeCardView::from_node(
                node,
                position,
                resolved.for_node(&node.id),
                pulse_enabled && selected_ids.contains(&node.id),
                state.selected_node.as_deref() == Some(node.id.as_str()),
                config.blocks_per_gpu,
            )
        })
        .collect();

    let grid = GridGeometry::compute(order.len(), config.container_size, config.gap, state.focus_mode);

    let detail_node = state
        .selected_node
        .as_deref()
        .and_then(|id| nodes.iter().find(|n| n.id == id));
    let resource_stats = match detail_node {
        Some(node) => ResourceStats::from_node(node),
        None if state.focus_mode => ResourceStats::mean_of(&order, "selected nodes average".to_string()),
        None => ResourceStats::mean_of(&order, format!("{} cluster average", request.cluster_gpu_type)),
    };

    debug!(
        visible = cards.len(),
        grid = grid.grid_size,
        source = ?resolved.source,
        focus = state.focus_mode,
        "dashboard view built"
    );

    DashboardView {
        presentation: state.presentation_mode(),
        selection: state.selection_mode(),
        search_active: search.is_some(),
        search_match_count: search.map_or(0, <[_]>::len),
        nodes: cards,
        grid,
        highlight_source: resolved.source,
        resource_stats,
        usage_results: UsagePanelView::build(nodes, request),
        jobs: build_job_queue(&snapshot.jobs, request.cluster_gpu_type, state, request.now),
    }
}

// ── Formatting helpers ──────────────────────────────────────────

/// `2h 5m ago`, or `5m ago` under an hour. Future times read `0m ago`.
pub fn format_time_ago(timestamp_secs: u64, now: u64) -> String {
    let delta = now.saturating_sub(timestamp_secs);
    let hours = delta / 3600;
    let minutes = (delta % 3600) / 60;
    if hours > 0 {
        format!("{hours}h {minutes}m ago")
    } else {
        format!("{minutes}m ago")
    }
}

pub fn format_timestamp(timestamp_secs: u64) -> String {
    i64::try_from(timestamp_secs)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpugrid_state::{NodeStatus, Segment, UsageTier};

    fn make_gpu(id: &str, status: GpuStatus, segments: Vec<Segment>) -> Gpu {
        Gpu {
            id: id.to_string(),
            usage_blocks: segments.iter().map(|s| s.usage.blocks(8)).sum(),
            status,
            segments,
            total_usage: UsageTier::Full,
        }
    }

    fn make_node(id: &str, cpu: u32, memory: u32) -> Node {
        Node {
            id: id.to_string(),
            name: id.to_uppercase(),
            gpu_type: GpuType::A100,
            gpus: vec![
                make_gpu(&format!("{id}-g0"), GpuStatus::Active, vec![Segment {
                    user: "kim".to_string(),
                    team: "vision".to_string(),
                    usage: UsageTier::Half,
                }]),
                make_gpu(&format!("{id}-g1"), GpuStatus::Idle, vec![]),
                make_gpu(&format!("{id}-g2"), GpuStatus::Error, vec![]),
            ],
            status: NodeStatus::Online,
            avg_usage: 0.5,
            cpu_usage: cpu,
            memory_usage: memory,
        }
    }

    fn make_job(id: &str, priority: JobPriority, status: JobStatus, gpu_type: GpuType) -> Job {
        Job {
            id: id.to_string(),
            name: format!("train-{id}"),
            user: "kim".to_string(),
            team: "vision".to_string(),
            priority,
            gpu_type,
            gpu_request: 0.5,
            cpu_request: 8,
            memory_request_gb: 32,
            submitted_at: 1_000,
            status,
        }
    }

    #[test]
    fn highlighted_blocks_cap_at_bar_length() {
        assert_eq!(weight_to_blocks(0, 8), 0);
        assert_eq!(weight_to_blocks(25, 8), 2);
        assert_eq!(weight_to_blocks(90, 8), 7);
        assert_eq!(weight_to_blocks(165, 8), 8);
    }

    #[test]
    fn card_keeps_raw_weight() {
        let node = make_node("n1", 10, 10);
        let card = NodeCardView::from_node(&node, 3, GpuHighlights::from([(0, 150)]), false, false, 8);
        assert_eq!(card.position, 3);
        assert_eq!(card.highlighted_gpu_usages[&0], 150);
        assert_eq!(card.gpus[0].highlight_weight, 150);
        assert_eq!(card.gpus[0].highlighted_blocks, 8);
        assert_eq!(card.gpus[1].highlighted_blocks, 0);
        assert_eq!((card.active_gpus, card.idle_gpus, card.error_gpus), (1, 1, 1));
        assert_eq!(card.avg_usage_percent, 50);
        assert_eq!(card.gpus[0].tenants, vec!["kim (vision)"]);
        assert_eq!(card.title, "N1 (1/3 GPUs active, 50% used)");
    }

    #[test]
    fn resource_means_round_half_up() {
        let a = make_node("a", 10, 20);
        let b = make_node("b", 15, 25);
        let stats = ResourceStats::mean_of(&[&a, &b], "avg".to_string());
        assert_eq!((stats.cpu_usage, stats.memory_usage), (13, 23));
        assert!(stats.node_id.is_none());

        let empty = ResourceStats::mean_of(&[], "avg".to_string());
        assert_eq!((empty.cpu_usage, empty.memory_usage), (0, 0));

        let single = ResourceStats::from_node(&a);
        assert_eq!(single.node_id.as_deref(), Some("a"));
        assert_eq!(single.label, "A");
    }

    #[test]
    fn job_queue_filters_and_sorts() {
        let jobs = vec![
            make_job("p-low", JobPriority::Low, JobStatus::Pending, GpuType::A100),
            make_job("r-norm", JobPriority::Normal, JobStatus::Running, GpuType::A100),
            make_job("h100", JobPriority::High, JobStatus::Pending, GpuType::H100),
            make_job("p-high", JobPriority::High, JobStatus::Pending, GpuType::A100),
        ];
        let state = SelectionState {
            selected_job: Some(crate::selection::JobSelection::from(&jobs[3])),
            ..Default::default()
        };
        let queue = build_job_queue(&jobs, GpuTypeFilter::Only(GpuType::A100), &state, 1_000);
        let ids: Vec<&str> = queue.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["r-norm", "p-high", "p-low"]);
        assert!(queue[1].is_highlighted);
        assert!(!queue[0].is_highlighted);
    }

    #[test]
    fn job_view_formats() {
        let job = make_job("j1", JobPriority::High, JobStatus::Pending, GpuType::A30);
        let view = JobView::from_job(&job, 1_000 + 2 * 3600 + 5 * 60 + 59);
        assert_eq!(view.submitted_ago, "2h 5m ago");
        assert_eq!(view.gpu_request_display, "0.5 GPU");
        assert_eq!(view.memory_display, "32GB");
        assert!(view.submitted_at_display.contains("1970"));
    }

    #[test]
    fn format_time_ago_values() {
        assert_eq!(format_time_ago(100, 100), "0m ago");
        assert_eq!(format_time_ago(100, 50), "0m ago");
        assert_eq!(format_time_ago(0, 59 * 60), "59m ago");
        assert_eq!(format_time_ago(0, 3600), "1h 0m ago");
    }

    #[test]
    fn format_timestamp_valid() {
        assert_eq!(format_timestamp(0), "1970-01-01 00:00:00 UTC");
        assert_eq!(format_timestamp(u64::MAX), "unknown");
    }

    #[test]
    fn panel_counts_cover_every_hit() {
        let mut h100 = make_node("h", 10, 10);
        h100.gpu_type = GpuType::H100;
        let nodes = vec![make_node("a", 10, 10), h100];
        let request = DashboardRequest {
            query: "kim",
            search_gpu_type: GpuTypeFilter::Only(GpuType::H100),
            ..Default::default()
        };
        let panel = UsagePanelView::build(&nodes, &request);
        assert_eq!(panel.counts.total, 2);
        assert_eq!(panel.results.len(), 1);
        assert_eq!(panel.results[0].gpu_type, GpuType::H100);
        assert!((panel.summary[&GpuType::H100] - 0.5).abs() < 1e-9);

        let idle = DashboardRequest::default();
        assert_eq!(UsagePanelView::build(&nodes, &idle), UsagePanelView::default());
    }
}
