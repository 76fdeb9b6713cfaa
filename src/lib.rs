//! Incremental metrics aggregation over cloud resource inventories.
//!
//! inventoor folds heterogeneous NDJSON resource records into per-service
//! fleet metrics, snapshots them as a nested report, and persists the
//! flattened dashboard items to one or more tables.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod flatten;
pub mod input;
pub mod record;
pub mod store;
