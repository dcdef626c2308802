//! # Predbench
//!
//! The benchmark driver for a prediction-serving backend: an open-loop
//! dispatch loop issuing a bounded-rate request stream, a concurrent
//! reporting loop draining windowed metric snapshots, and the driver
//! sequence wiring both to the backend.
//!
//! Pacing is purely time-based. The dispatch loop never waits for a
//! response; completion continuations run on arbitrary runtime workers and
//! meet the reporting loop only at the shared metrics registry.

pub mod dispatch;
pub mod driver;
pub mod report;

pub use dispatch::{send_predictions, BenchMetrics, DispatchParams};
pub use driver::{run, DEFAULT_OUTPUT, MODEL_NAME, MODEL_VERSION, TEST_APPLICATION_LABEL};
pub use report::{report_and_clear_metrics, ReportParams, ReportSink};
