//! Operator selection state and its transitions.
//!
//! `SelectionState` is an owned value; every transition consumes it and
//! returns the next state. Two axes are derived from it:
//! [`SelectionMode`] (how many usages are selected) and
//! [`PresentationMode`] (overview or focus). Job-derived highlighting is
//! tracked separately and survives `clear_all`.

use std::collections::HashSet;

use gpugrid_search::{UserGpuUsage, find_by_user_or_team};
use gpugrid_state::{Job, JobId, Node, NodeId};
use serde::Serialize;
use tracing::debug;

use crate::highlight::{HighlightMap, sum_usages};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    Idle,
    SingleSelected,
    MultiSelected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PresentationMode {
    Overview,
    Focus,
}

/// The job whose tenants are highlighted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobSelection {
    pub job_id: JobId,
    pub user: String,
    pub team: String,
}

impl JobSelection {
    /// Query run against the tenant usage index.
    pub fn query(&self) -> String {
        format!("{} {}", self.user, self.team)
    }
}

impl From<&Job> for JobSelection {
    fn from(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            user: job.user.clone(),
            team: job.team.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SelectionState {
    /// Selected usages, in click order. Unique by usage key.
    pub selected_usages: Vec<UserGpuUsage>,
    /// Only ever true while `selected_usages` is non-empty.
    pub focus_mode: bool,
    /// Node shown in the node-detail panel.
    pub selected_node: Option<NodeId>,
    pub selected_job: Option<JobSelection>,
    pub job_highlight: Option<HighlightMap>,
    /// Nodes touched by the selected job, first-encountered order.
    pub job_sort_node_ids: Option<Vec<NodeId>>,
}

impl SelectionState {
    pub fn selection_mode(&self) -> SelectionMode {
        match self.selected_usages.len() {
            0 => SelectionMode::Idle,
            1 => SelectionMode::SingleSelected,
            _ => SelectionMode::MultiSelected,
        }
    }

    pub fn presentation_mode(&self) -> PresentationMode {
        if self.focus_mode {
            PresentationMode::Focus
        } else {
            PresentationMode::Overview
        }
    }

    pub fn is_selected(&self, usage: &UserGpuUsage) -> bool {
        self.selected_usages.iter().any(|u| u.same_key(usage))
    }

    /// Ids of the nodes the selected usages live on.
    pub fn selected_node_ids(&self) -> HashSet<NodeId> {
        self.selected_usages
            .iter()
            .map(|u| u.node_id.clone())
            .collect()
    }

    // ── Transitions ───────────────────────────────────────────────

    /// Plain click replaces the selection; a modifier click toggles
    /// membership. Either way the node-detail selection is dropped.
    pub fn select(mut self, usage: UserGpuUsage, ctrl_held: bool) -> Self {
        self.selected_node = None;
        if ctrl_held {
            match self.selected_usages.iter().position(|u| u.same_key(&usage)) {
                Some(at) => {
                    debug!(gpu = %usage.gpu_id, user = %usage.user, "usage deselected");
                    self.selected_usages.remove(at);
                }
                None => {
                    debug!(gpu = %usage.gpu_id, user = %usage.user, "usage added to selection");
                    self.selected_usages.push(usage);
                }
            }
        } else {
            debug!(gpu = %usage.gpu_id, user = %usage.user, "usage selected");
            self.selected_usages = vec![usage];
        }
        self.settle_focus()
    }

    pub fn enter_focus_mode(mut self) -> Self {
        if self.selected_usages.is_empty() {
            debug!("focus mode needs a selection, ignoring");
            return self;
        }
        debug!(selected = self.selected_usages.len(), "entering focus mode");
        self.focus_mode = true;
        self
    }

    pub fn exit_focus_mode(mut self) -> Self {
        if self.focus_mode {
            debug!("leaving focus mode");
        }
        self.focus_mode = false;
        self
    }

    /// Back to Idle/Overview. Job highlighting is left alone.
    pub fn clear_all(mut self) -> Self {
        debug!("selection cleared");
        self.selected_usages.clear();
        self.selected_node = None;
        self.focus_mode = false;
        self
    }

    /// Highlight every GPU share belonging to the job's user or team.
    pub fn select_job(mut self, job: JobSelection, nodes: &[Node]) -> Self {
        let usages = find_by_user_or_team(nodes, &job.query());

        let mut touched: Vec<NodeId> = Vec::new();
        for usage in &usages {
            if !touched.contains(&usage.node_id) {
                touched.push(usage.node_id.clone());
            }
        }

        debug!(job = %job.job_id, usages = usages.len(), nodes = touched.len(), "job selected");
        self.job_highlight = Some(sum_usages(&usages));
        self.job_sort_node_ids = Some(touched);
        self.selected_job = Some(job);
        self
    }

    pub fn clear_job_gpu_highlights(mut self) -> Self {
        debug!("job highlight cleared");
        self.job_highlight = None;
        self.job_sort_node_ids = None;
        self.selected_job = None;
        self
    }

    pub fn select_node(mut self, node_id: impl Into<NodeId>) -> Self {
        let node_id = node_id.into();
        debug!(node = %node_id, "node selected");
        self.selected_node = Some(node_id);
        self
    }

    pub fn clear_selected_node(mut self) -> Self {
        self.selected_node = None;
        self
    }

    /// A new query invalidates the usages the operator clicked on.
    pub fn on_query_changed(mut self) -> Self {
        self.selected_usages.clear();
        self.selected_node = None;
        self.settle_focus()
    }

    /// Drop selections that referred to the old snapshot and recompute
    /// the job highlight against the new one.
    pub fn on_snapshot_replaced(mut self, nodes: &[Node]) -> Self {
        self.selected_usages.clear();
        self.selected_node = None;
        let state = self.settle_focus();
        match state.selected_job.clone() {
            Some(job) => state.select_job(job, nodes),
            None => state,
        }
    }

    pub fn apply(self, event: SelectionEvent, nodes: &[Node]) -> Self {
        match event {
            SelectionEvent::SelectUsage { usage, ctrl_held } => self.select(usage, ctrl_held),
            SelectionEvent::EnterFocus => self.enter_focus_mode(),
            SelectionEvent::ExitFocus => self.exit_focus_mode(),
            SelectionEvent::ClearAll => self.clear_all(),
            SelectionEvent::SelectJob(job) => self.select_job(job, nodes),
            SelectionEvent::ClearJob => self.clear_job_gpu_highlights(),
            SelectionEvent::SelectNode(id) => self.select_node(id),
            SelectionEvent::ClearNode => self.clear_selected_node(),
            SelectionEvent::QueryChanged => self.on_query_changed(),
            SelectionEvent::SnapshotReplaced => self.on_snapshot_replaced(nodes),
        }
    }

    fn settle_focus(mut self) -> Self {
        if self.focus_mode && self.selected_usages.is_empty() {
            debug!("selection emptied, leaving focus mode");
            self.focus_mode = false;
        }
        self
    }
}

/// Operator input, for callers that drive the state from an event stream.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionEvent {
    SelectUsage { usage: UserGpuUsage, ctrl_held: bool },
    EnterFocus,
    ExitFocus,
    ClearAll,
    SelectJob(JobSelection),
    ClearJob,
    SelectNode(NodeId),
    ClearNode,
    QueryChanged,
    SnapshotReplaced,
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpugrid_state::{Gpu, GpuStatus, GpuType, NodeStatus, Segment, UsageTier};

    fn make_usage(node: &str, gpu_index: usize, user: &str, share: u32) -> UserGpuUsage {
        UserGpuUsage {
            node_id: node.to_string(),
            node_name: node.to_string(),
            gpu_id: format!("{node}-{gpu_index}"),
            gpu_index,
            user: user.to_string(),
            team: "vision".to_string(),
            total_usage: 100,
            segment_usage: share,
            gpu_type: GpuType::A100,
        }
    }

    fn make_gpu(id: &str, segments: Vec<(&str, &str, UsageTier)>) -> Gpu {
        let segments: Vec<Segment> = segments
            .into_iter()
            .map(|(user, team, usage)| Segment {
                user: user.to_string(),
                team: team.to_string(),
                usage,
            })
            .collect();
        Gpu {
            id: id.to_string(),
            usage_blocks: segments.iter().map(|s| s.usage.blocks(8)).sum(),
            status: GpuStatus::Active,
            segments,
            total_usage: UsageTier::Full,
        }
    }

    fn make_node(id: &str, name: &str, gpus: Vec<Gpu>) -> Node {
        Node {
            id: id.to_string(),
            name: name.to_string(),
            gpu_type: GpuType::A100,
            gpus,
            status: NodeStatus::Online,
            avg_usage: 0.5,
            cpu_usage: 40,
            memory_usage: 40,
        }
    }

    fn cluster() -> Vec<Node> {
        vec![
            make_node("n2", "A100-02", vec![make_gpu("n2-0", vec![("kim", "vision", UsageTier::Half)])]),
            make_node("n1", "A100-01", vec![
                make_gpu("n1-0", vec![("lee", "nlp", UsageTier::Full)]),
                make_gpu("n1-1", vec![
                    ("kim", "vision", UsageTier::Quarter),
                    ("park", "vision", UsageTier::Quarter),
                ]),
            ]),
        ]
    }

    fn job(user: &str, team: &str) -> JobSelection {
        JobSelection {
            job_id: "job-1".to_string(),
            user: user.to_string(),
            team: team.to_string(),
        }
    }

    #[test]
    fn plain_click_replaces_selection() {
        let state = SelectionState::default()
            .select(make_usage("n1", 0, "kim", 50), false)
            .select(make_usage("n2", 1, "lee", 25), false);
        assert_eq!(state.selected_usages.len(), 1);
        assert_eq!(state.selected_usages[0].user, "lee");
        assert_eq!(state.selection_mode(), SelectionMode::SingleSelected);
    }

    #[test]
    fn ctrl_click_twice_is_a_no_op() {
        let before = SelectionState::default().select(make_usage("n1", 0, "kim", 50), false);
        let u = make_usage("n2", 1, "lee", 25);

        let added = before.clone().select(u.clone(), true);
        assert_eq!(added.selection_mode(), SelectionMode::MultiSelected);
        assert!(added.is_selected(&u));

        let removed = added.select(u, true);
        assert_eq!(removed.selected_usages, before.selected_usages);
    }

    #[test]
    fn select_clears_node_detail() {
        let state = SelectionState::default()
            .select_node("n1")
            .select(make_usage("n1", 0, "kim", 50), true);
        assert!(state.selected_node.is_none());
    }

    #[test]
    fn focus_requires_selection() {
        let state = SelectionState::default().enter_focus_mode();
        assert!(!state.focus_mode);

        let state = state.select(make_usage("n1", 0, "kim", 50), false).enter_focus_mode();
        assert_eq!(state.presentation_mode(), PresentationMode::Focus);
        assert_eq!(state.exit_focus_mode().presentation_mode(), PresentationMode::Overview);
    }

    #[test]
    fn emptying_selection_leaves_focus() {
        let u = make_usage("n1", 0, "kim", 50);
        let state = SelectionState::default().select(u.clone(), false).enter_focus_mode();
        let state = state.select(u, true);
        assert_eq!(state.selection_mode(), SelectionMode::Idle);
        assert!(!state.focus_mode);
    }

    #[test]
    fn clear_all_resets_from_any_state() {
        let nodes = cluster();
        let states = [
            SelectionState::default(),
            SelectionState::default().select(make_usage("n1", 0, "kim", 50), false),
            SelectionState::default()
                .select(make_usage("n1", 0, "kim", 50), false)
                .select(make_usage("n2", 0, "lee", 50), true)
                .enter_focus_mode()
                .select_node("n2"),
            SelectionState::default().select_job(job("kim", "vision"), &nodes),
        ];
        for state in states {
            let had_job = state.job_highlight.is_some();
            let cleared = state.clear_all();
            assert!(!cleared.focus_mode);
            assert!(cleared.selected_usages.is_empty());
            assert!(cleared.selected_node.is_none());
            assert_eq!(cleared.job_highlight.is_some(), had_job);
        }
    }

    #[test]
    fn job_highlight_sums_matching_shares() {
        let nodes = cluster();
        let state = SelectionState::default().select_job(job("kim", "vision"), &nodes);

        let map = state.job_highlight.clone().unwrap_or_default();
        assert_eq!(map["n2"][&0], 50);
        // park/vision shares the GPU but not the user.
        assert_eq!(map["n1"][&1], 25);
        assert!(!map["n1"].contains_key(&0));
        // Sorted by node name, so A100-01 is touched first.
        assert_eq!(state.job_sort_node_ids, Some(vec!["n1".to_string(), "n2".to_string()]));
        assert!(!state.focus_mode);
        assert!(state.selected_usages.is_empty());
    }

    #[test]
    fn job_with_no_matches_yields_empty_maps() {
        let state = SelectionState::default().select_job(job("nobody", "none"), &cluster());
        assert_eq!(state.job_highlight, Some(HighlightMap::new()));
        assert_eq!(state.job_sort_node_ids, Some(Vec::new()));
    }

    #[test]
    fn clear_job_keeps_selection() {
        let state = SelectionState::default()
            .select(make_usage("n1", 0, "kim", 50), false)
            .select_job(job("kim", "vision"), &cluster())
            .clear_job_gpu_highlights();
        assert!(state.job_highlight.is_none());
        assert!(state.job_sort_node_ids.is_none());
        assert!(state.selected_job.is_none());
        assert_eq!(state.selected_usages.len(), 1);
    }

    #[test]
    fn query_change_drops_usage_and_node() {
        let state = SelectionState::default()
            .select(make_usage("n1", 0, "kim", 50), false)
            .enter_focus_mode()
            .select_node("n1")
            .on_query_changed();
        assert_eq!(state.selection_mode(), SelectionMode::Idle);
        assert!(!state.focus_mode);
        assert!(state.selected_node.is_none());
    }

    #[test]
    fn snapshot_replacement_recomputes_job() {
        let state = SelectionState::default().select_job(job("lee", "nlp"), &cluster());
        assert_eq!(state.job_sort_node_ids, Some(vec!["n1".to_string()]));

        let replaced = vec![make_node("n9", "A100-09", vec![make_gpu("n9-0", vec![("lee", "nlp", UsageTier::Half)])])];
        let state = state.on_snapshot_replaced(&replaced);
        assert_eq!(state.job_sort_node_ids, Some(vec!["n9".to_string()]));
    }

    #[test]
    fn events_fold_like_direct_calls() {
        let nodes = cluster();
        let u = make_usage("n1", 0, "kim", 50);
        let events = vec![
            SelectionEvent::SelectUsage { usage: u.clone(), ctrl_held: false },
            SelectionEvent::EnterFocus,
            SelectionEvent::SelectJob(job("kim", "vision")),
        ];
        let folded = events
            .into_iter()
            .fold(SelectionState::default(), |s, e| s.apply(e, &nodes));
        let direct = SelectionState::default()
            .select(u, false)
            .enter_focus_mode()
            .select_job(job("kim", "vision"), &nodes);
        assert_eq!(folded, direct);
    }

    #[test]
    fn selected_node_ids_dedupe() {
        let state = SelectionState::default()
            .select(make_usage("n1", 0, "kim", 50), true)
            .select(make_usage("n1", 1, "kim", 25), true);
        assert_eq!(state.selected_node_ids(), HashSet::from(["n1".to_string()]));
    }
}
