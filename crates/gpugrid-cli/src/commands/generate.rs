//! `gpugrid generate` — write a seeded sample snapshot.

use std::path::Path;

use anyhow::Result;
use gpugrid_sim::ClusterGenerator;
use tracing::info;

use super::unix_now;

pub fn generate(seed: Option<u64>, output: Option<&Path>) -> Result<()> {
    let now = unix_now();
    let seed = seed.unwrap_or(now);
    let json = render(seed, now)?;

    match output {
        Some(path) => {
            std::fs::write(path, &json)?;
            info!(seed, path = %path.display(), "snapshot written");
            println!("✓ Generated {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn render(seed: u64, now: u64) -> Result<String> {
    let snapshot = ClusterGenerator::new(seed).generate_snapshot(now);
    Ok(snapshot.to_json()?)
}
