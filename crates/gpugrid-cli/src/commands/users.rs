//! `gpugrid users` — tenant usage records, the panel's counts and summary.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use gpugrid_search::{
    GpuTypeCounts, UserGpuUsage, count_by_gpu_type, filter_by_gpu_type, find_by_user_or_team,
    refine_usages, usage_summary,
};
use gpugrid_state::{GpuType, GpuTypeFilter, IngestPolicy, Node};
use serde_json::{Value, json};

use super::{OutputFormat, load_snapshot};

struct UsageReport {
    counts: GpuTypeCounts,
    summary: Vec<(GpuType, f64)>,
    results: Vec<UserGpuUsage>,
}

fn build_report(nodes: &[Node], query: &str, filter: GpuTypeFilter, refine: Option<&str>) -> UsageReport {
    let hits = find_by_user_or_team(nodes, query);
    let typed = filter_by_gpu_type(&hits, filter);
    UsageReport {
        counts: count_by_gpu_type(&hits),
        summary: usage_summary(&typed).into_iter().collect(),
        results: refine_usages(&typed, refine.unwrap_or_default()),
    }
}

pub fn users(
    snapshot: &Path,
    policy: IngestPolicy,
    query: &str,
    filter: GpuTypeFilter,
    refine: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let snapshot = load_snapshot(snapshot, policy)?;
    let report = build_report(&snapshot.nodes, query, filter, refine);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&report))?),
        OutputFormat::Text => print!("{}", format_report(&report)),
    }
    Ok(())
}

fn to_json(report: &UsageReport) -> Value {
    let summary: serde_json::Map<String, Value> = report
        .summary
        .iter()
        .map(|(t, gpus)| (t.to_string(), json!(gpus)))
        .collect();
    json!({
        "counts": {
            "all": report.counts.total,
            "byType": report.counts.by_type,
        },
        "summary": summary,
        "results": report.results,
    })
}

fn format_report(report: &UsageReport) -> String {
    let mut out = String::new();
    let mut counts = vec![format!("all {}", report.counts.total)];
    counts.extend(GpuType::ALL.iter().map(|t| format!("{t} {}", report.counts.get(GpuTypeFilter::Only(*t)))));
    let _ = writeln!(out, "{} record(s)  [{}]", report.results.len(), counts.join(", "));

    for u in &report.results {
        let _ = writeln!(
            out,
            "{:<10} gpu {} {:<12} {} ({})  {}% of {}%",
            u.node_name, u.gpu_index, u.gpu_id, u.user, u.team, u.segment_usage, u.total_usage
        );
    }
    if !report.summary.is_empty() {
        let totals: Vec<String> = report.summary.iter().map(|(t, g)| format!("{t} {g:.2} GPU")).collect();
        let _ = writeln!(out, "total: {}", totals.join(", "));
    }
    out
}
