//! Metrics accumulation and snapshot derivation.

pub mod accumulator;
pub mod count;
pub mod network;
pub mod snapshot;
pub mod status;

pub use accumulator::Accumulator;
pub use snapshot::MetricsSnapshot;
