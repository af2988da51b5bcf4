//! `gpugrid search` — compound node search.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use gpugrid_search::{SearchResult, complex_search, search_highlights};
use gpugrid_state::IngestPolicy;
use serde_json::{Value, json};

use super::{OutputFormat, load_snapshot};

pub fn search(snapshot: &Path, policy: IngestPolicy, query: &str, format: OutputFormat) -> Result<()> {
    let snapshot = load_snapshot(snapshot, policy)?;
    let results = complex_search(&snapshot.nodes, query);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&results))?),
        OutputFormat::Text => print!("{}", format_results(query, &results)),
    }
    Ok(())
}

fn to_json(results: &[SearchResult<'_>]) -> Value {
    let highlights = search_highlights(results);
    let hits: Vec<Value> = results
        .iter()
        .map(|r| {
            json!({
                "nodeId": r.node.id,
                "nodeName": r.node.name,
                "gpuType": r.gpu_type(),
                "matchingGpus": r.matching_gpus,
                "isFullNodeMatch": r.is_full_node_match,
                "matchingSegments": r.matching_segments,
                "highlights": highlights.get(&r.node.id),
            })
        })
        .collect();
    json!({ "count": results.len(), "results": hits })
}

fn format_results(query: &str, results: &[SearchResult<'_>]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} node(s) match {query:?}", results.len());
    for r in results {
        let full = if r.is_full_node_match { "  [full node]" } else { "" };
        let _ = writeln!(
            out,
            "{} ({}) {}  {}/{} GPUs{full}",
            r.node.name,
            r.node.id,
            r.gpu_type(),
            r.matching_gpus.len(),
            r.node.gpus.len()
        );
        for (&gpu_index, segments) in &r.matching_segments {
            let gpu = &r.node.gpus[gpu_index];
            for &s in segments {
                let segment = &gpu.segments[s];
                let _ = writeln!(
                    out,
                    "  gpu {gpu_index} {}: {} ({}) {}%",
                    gpu.id,
                    segment.user,
                    segment.team,
                    segment.usage.percent()
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpugrid_state::{Gpu, GpuStatus, GpuType, Node, NodeStatus, Segment, UsageTier};

    fn make_node() -> Node {
        Node {
            id: "A100-node-1".to_string(),
            name: "A100-01".to_string(),
            gpu_type: GpuType::A100,
            gpus: vec![Gpu {
                id: "A100-1-1".to_string(),
                usage_blocks: 4,
                status: GpuStatus::Active,
                segments: vec![Segment {
                    user: "kim".to_string(),
                    team: "vision".to_string(),
                    usage: UsageTier::Half,
                }],
                total_usage: UsageTier::Half,
            }],
            status: NodeStatus::Online,
            avg_usage: 0.5,
            cpu_usage: 40,
            memory_usage: 40,
        }
    }

    #[test]
    fn text_lists_matching_segments() {
        let nodes = vec![make_node()];
        let results = complex_search(&nodes, "a100-01/kim");
        let text = format_results("a100-01/kim", &results);
        assert!(text.starts_with("1 node(s) match"));
        assert!(text.contains("A100-01 (A100-node-1) A100  1/1 GPUs  [full node]"));
        assert!(text.contains("gpu 0 A100-1-1: kim (vision) 50%"));
    }

    #[test]
    fn json_carries_highlights() {
        let nodes = vec![make_node()];
        let results = complex_search(&nodes, "kim");
        let value = to_json(&results);
        assert_eq!(value["count"], 1);
        assert_eq!(value["results"][0]["nodeId"], "A100-node-1");
        assert_eq!(value["results"][0]["highlights"]["0"], 50);
    }
}
