//! gpugrid.toml dashboard settings.

use std::path::Path;

use gpugrid_state::{DEFAULT_BLOCKS_PER_GPU, GpuType, GpuTypeFilter};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Edge length of the square node map, px.
    pub container_size: u32,
    /// Gap between grid cells, px.
    pub gap: u32,
    /// Cluster tab shown when no search is active.
    pub cluster_gpu_type: GpuTypeFilter,
    pub blocks_per_gpu: u32,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            container_size: 700,
            gap: 2,
            cluster_gpu_type: GpuTypeFilter::Only(GpuType::A100),
            blocks_per_gpu: DEFAULT_BLOCKS_PER_GPU,
        }
    }
}

impl DashboardConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DashboardConfig = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
