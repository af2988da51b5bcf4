//! Subcommand implementations for `gpugrid`.

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use gpugrid_state::{ClusterSnapshot, IngestPolicy};

pub mod generate;
pub mod search;
pub mod users;
pub mod view;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn ingest_policy(strict: bool) -> IngestPolicy {
    if strict { IngestPolicy::Strict } else { IngestPolicy::Sanitize }
}

pub fn load_snapshot(path: &Path, policy: IngestPolicy) -> anyhow::Result<ClusterSnapshot> {
    ClusterSnapshot::load(path, policy)
        .with_context(|| format!("loading snapshot {}", path.display()))
}

/// Current Unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
