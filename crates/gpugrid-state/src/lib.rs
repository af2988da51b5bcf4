//! gpugrid-state — cluster snapshot model for GpuGrid.
//!
//! A snapshot is a wholesale picture of the GPU cluster: nodes, the GPUs
//! on each node, and the usage segments (one per tenant) sharing each GPU,
//! plus the job queue. Snapshots are supplied by an external fetch or
//! generator layer and are read-only from the point of view of the search
//! and selection engines.
//!
//! # Ingestion
//!
//! The engines downstream assume the snapshot invariants hold (discrete
//! usage tiers, idle/error GPUs carry no segments, segment shares never
//! exceed the GPU total). [`ClusterSnapshot::ingest`] checks them once at
//! the boundary and either rejects or sanitizes offending entries.

pub mod error;
pub mod snapshot;
pub mod types;

pub use error::{StateError, StateResult};
pub use snapshot::{ClusterSnapshot, IngestPolicy, SnapshotIssue};
pub use types::*;
