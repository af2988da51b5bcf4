//! `gpugrid view` — replay operator input and print the dashboard view.
//!
//! Events are applied in the order the dashboard would see them: query,
//! usage clicks, focus, job, node detail.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use gpugrid_dashboard::{
    DashboardConfig, DashboardRequest, DashboardView, JobSelection, SelectionEvent, SelectionState,
    build_dashboard_view,
};
use gpugrid_search::{UserGpuUsage, find_by_user_or_team};
use gpugrid_state::{ClusterSnapshot, GpuTypeFilter, IngestPolicy};
use tracing::debug;

use super::{OutputFormat, load_snapshot, unix_now};

pub struct ViewArgs<'a> {
    pub snapshot: &'a Path,
    pub policy: IngestPolicy,
    pub query: &'a str,
    pub gpu_type: Option<GpuTypeFilter>,
    pub search_gpu_type: GpuTypeFilter,
    pub selections: &'a [String],
    pub focus: bool,
    pub job: Option<&'a str>,
    pub node: Option<&'a str>,
    pub expand_panel: bool,
    pub config: Option<&'a Path>,
    pub format: OutputFormat,
}

pub fn view(args: ViewArgs<'_>) -> Result<()> {
    let config = match args.config {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    let snapshot = load_snapshot(args.snapshot, args.policy)?;

    let events = build_events(&snapshot, &args)?;
    debug!(events = events.len(), "replaying selection events");
    let state = events
        .into_iter()
        .fold(SelectionState::default(), |s, e| s.apply(e, &snapshot.nodes));

    let request = DashboardRequest {
        query: args.query,
        cluster_gpu_type: args.gpu_type.unwrap_or(config.cluster_gpu_type),
        search_gpu_type: args.search_gpu_type,
        panel_refine: "",
        expand_panel_active: args.expand_panel,
        now: unix_now(),
    };
    let view = build_dashboard_view(&snapshot, &state, &request, &config);

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        OutputFormat::Text => print!("{}", format_view(&view)),
    }
    Ok(())
}

fn build_events(snapshot: &ClusterSnapshot, args: &ViewArgs<'_>) -> Result<Vec<SelectionEvent>> {
    let mut events = vec![SelectionEvent::QueryChanged];

    for (i, key) in args.selections.iter().enumerate() {
        let usage = resolve_usage(snapshot, key)?;
        events.push(SelectionEvent::SelectUsage { usage, ctrl_held: i > 0 });
    }
    if args.focus {
        events.push(SelectionEvent::EnterFocus);
    }
    if let Some(id) = args.job {
        let job = snapshot
            .jobs
            .iter()
            .find(|j| j.id == id)
            .ok_or_else(|| anyhow!("no job with id {id}"))?;
        events.push(SelectionEvent::SelectJob(JobSelection::from(job)));
    }
    if let Some(id) = args.node {
        if !snapshot.nodes.iter().any(|n| n.id == id) {
            bail!("no node with id {id}");
        }
        events.push(SelectionEvent::SelectNode(id.to_string()));
    }
    Ok(events)
}

/// Split `gpu_id:user:team`. The team may itself contain `:`.
fn parse_key(key: &str) -> Result<(&str, &str, &str)> {
    let mut parts = key.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(gpu), Some(user), Some(team)) if !gpu.is_empty() && !user.is_empty() => {
            Ok((gpu, user, team))
        }
        _ => bail!("invalid selection key {key:?}, expected gpu_id:user:team"),
    }
}

fn resolve_usage(snapshot: &ClusterSnapshot, key: &str) -> Result<UserGpuUsage> {
    let (gpu_id, user, team) = parse_key(key)?;
    find_by_user_or_team(&snapshot.nodes, &format!("{user} {team}"))
        .into_iter()
        .find(|u| u.gpu_id == gpu_id && u.user == user && u.team == team)
        .ok_or_else(|| anyhow!("no active usage for {key}"))
}

fn format_view(view: &DashboardView) -> String {
    let mut out = String::new();
    let source = view
        .highlight_source
        .map_or("none".to_string(), |s| format!("{s:?}").to_lowercase());
    let _ = writeln!(
        out,
        "mode: {:?}/{:?}  highlight: {source}  grid: {}x{} cell {}px ({} empty)",
        view.presentation,
        view.selection,
        view.grid.grid_size,
        view.grid.grid_size,
        view.grid.cell_size,
        view.grid.placeholder_slots
    );
    if view.search_active {
        let _ = writeln!(out, "search: {} node(s) matched", view.search_match_count);
    }

    for card in &view.nodes {
        let mut flags = Vec::new();
        if card.pulse {
            flags.push("pulse");
        }
        if card.is_selected {
            flags.push("detail");
        }
        let bars: Vec<String> = card
            .gpus
            .iter()
            .map(|g| format!("{}/{}", g.highlighted_blocks, g.used_blocks))
            .collect();
        let _ = writeln!(
            out,
            "{:>3} {:<10} {:>3}%  [{}]{}",
            card.position + 1,
            card.name,
            card.avg_usage_percent,
            bars.join(" "),
            if flags.is_empty() { String::new() } else { format!("  {}", flags.join(" ")) }
        );
    }

    let stats = &view.resource_stats;
    let _ = writeln!(
        out,
        "{}: cpu {}%  memory {}%",
        stats.label, stats.cpu_usage, stats.memory_usage
    );

    if !view.usage_results.results.is_empty() {
        let _ = writeln!(out, "tenants: {} record(s)", view.usage_results.results.len());
    }
    for job in view.jobs.iter().filter(|j| j.is_highlighted) {
        let _ = writeln!(
            out,
            "job {}: {} {} ({}) {}  {}",
            job.id, job.name, job.user, job.team, job.gpu_request_display, job.submitted_ago
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpugrid_sim::ClusterGenerator;

    fn args<'a>(snapshot: &'a Path, selections: &'a [String]) -> ViewArgs<'a> {
        ViewArgs {
            snapshot,
            policy: IngestPolicy::Sanitize,
            query: "",
            gpu_type: None,
            search_gpu_type: GpuTypeFilter::All,
            selections,
            focus: false,
            job: None,
            node: None,
            expand_panel: false,
            config: None,
            format: OutputFormat::Text,
        }
    }

    fn first_key(snapshot: &ClusterSnapshot) -> String {
        let gpu = snapshot
            .nodes
            .iter()
            .flat_map(|n| &n.gpus)
            .find(|g| !g.segments.is_empty())
            .unwrap();
        let segment = &gpu.segments[0];
        format!("{}:{}:{}", gpu.id, segment.user, segment.team)
    }

    #[test]
    fn parse_key_accepts_colons_in_team() {
        assert_eq!(parse_key("g1:kim:ai:lab").unwrap(), ("g1", "kim", "ai:lab"));
        assert!(parse_key("g1:kim").is_err());
        assert!(parse_key(":kim:team").is_err());
    }

    #[test]
    fn first_select_is_plain_rest_are_ctrl() {
        let snapshot = ClusterGenerator::new(11).generate_snapshot(1_000_000);
        let key = first_key(&snapshot);
        let selections = vec![key.clone(), key];
        let events = build_events(&snapshot, &args(Path::new("unused"), &selections)).unwrap();

        assert_eq!(events[0], SelectionEvent::QueryChanged);
        assert!(matches!(events[1], SelectionEvent::SelectUsage { ctrl_held: false, .. }));
        assert!(matches!(events[2], SelectionEvent::SelectUsage { ctrl_held: true, .. }));

        // Selecting then ctrl-toggling the same usage leaves nothing selected.
        let state = events
            .into_iter()
            .fold(SelectionState::default(), |s, e| s.apply(e, &snapshot.nodes));
        assert!(state.selected_usages.is_empty());
    }

    #[test]
    fn unknown_references_are_errors() {
        let snapshot = ClusterGenerator::new(11).generate_snapshot(1_000_000);
        let selections = vec!["nope:kim:vision".to_string()];
        assert!(build_events(&snapshot, &args(Path::new("unused"), &selections)).is_err());

        let mut a = args(Path::new("unused"), &[]);
        a.job = Some("missing-job");
        assert!(build_events(&snapshot, &a).is_err());

        let mut a = args(Path::new("unused"), &[]);
        a.node = Some("missing-node");
        assert!(build_events(&snapshot, &a).is_err());
    }

    #[test]
    fn text_view_lists_every_node() {
        let snapshot = ClusterGenerator::new(2).generate_snapshot(1_000_000);
        let state = SelectionState::default();
        let request = DashboardRequest {
            cluster_gpu_type: GpuTypeFilter::All,
            now: 1_000_000,
            ..Default::default()
        };
        let view = build_dashboard_view(&snapshot, &state, &request, &DashboardConfig::default());
        let text = format_view(&view);
        assert!(text.starts_with("mode: Overview/Idle  highlight: none  grid: 8x8"));
        assert_eq!(text.lines().count(), 1 + 64 + 1);
        assert!(text.contains("all cluster average"));
    }

    #[test]
    fn view_runs_against_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.json");
        let snapshot = ClusterGenerator::new(4).generate_snapshot(1_000_000);
        std::fs::write(&path, snapshot.to_json().unwrap()).unwrap();

        let selections = vec![first_key(&snapshot)];
        let mut a = args(&path, &selections);
        a.focus = true;
        a.format = OutputFormat::Json;
        view(a).unwrap();
    }
}
