//! gpugrid-sim — seeded sample data for the dashboard.
//!
//! Produces a cluster snapshot shaped like a production GPU fleet: a fixed
//! number of nodes per GPU type, shared GPUs split into tenant segments,
//! and a job queue with one running job per segment plus pending work.
//! The same seed always yields the same snapshot.

pub mod generator;

pub use generator::{ClusterGenerator, NODE_COUNTS, TEAMS, USERS};
