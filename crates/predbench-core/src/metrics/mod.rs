//! Concurrent metrics aggregation
//!
//! Aggregators are updated from completion continuations running on
//! arbitrary worker threads while the reporting loop concurrently snapshots
//! them, so every aggregator supports atomic increment and an atomic
//! snapshot-and-clear: an increment racing a clear lands in exactly one
//! report window.

mod aggregators;
mod registry;

pub use aggregators::{
    Counter, Histogram, HistogramSnapshot, Meter, MeterSnapshot, RatioCounter, RatioSnapshot,
};
pub use registry::MetricsRegistry;
