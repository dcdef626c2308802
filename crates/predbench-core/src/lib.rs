//! # Predbench Core
//!
//! Shared building blocks for the prediction-serving benchmark driver.
//!
//! ## Features
//!
//! - **Typed configuration**: flat string map with parse-on-read accessors
//!   that fail loudly before any loop starts
//! - **Dataset preparation**: CIFAR-style binary loading, label
//!   partitioning, and two-class corpus concatenation
//! - **Concurrent metrics**: histogram, meter, counter and ratio-counter
//!   aggregators behind a name-keyed registry with atomic
//!   snapshot-and-clear reporting
//! - **Backend contract**: the narrow request/response seam to the serving
//!   system, plus an in-process no-op stand-in
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Dispatch Loop                           │
//! │  (paced submission, fire-and-forget completion handling)    │
//! └─────────────────────────────────────────────────────────────┘
//!           │ submit                         │ increment
//!           ▼                                ▼
//! ┌──────────────────────┐      ┌──────────────────────────────┐
//! │  PredictionBackend   │      │       MetricsRegistry         │
//! │  (external system)   │      │  (shared aggregators, atomic  │
//! └──────────────────────┘      │   snapshot-and-clear reports) │
//!                               └──────────────────────────────┘
//!                                              ▲ report(clear)
//!                                     Reporting Loop
//! ```

pub mod backend;
pub mod config;
pub mod dataset;
pub mod metrics;

/// Prelude for common imports
pub mod prelude {
    pub use crate::backend::{
        BackendError, NoopBackend, PredictionBackend, PredictionRequest, PredictionResponse,
        ResponseHandle, StateKey, VersionedModel,
    };
    pub use crate::config::{BenchConfig, ConfigError};
    pub use crate::dataset::{concatenate_datapoints, load_cifar, DatasetError};
    pub use crate::metrics::MetricsRegistry;
}

// Re-export key types at crate root
pub use backend::{
    BackendError, NoopBackend, PredictionBackend, PredictionRequest, PredictionResponse,
    ResponseHandle, StateKey, VersionedModel,
};
pub use config::{BenchConfig, ConfigError};
pub use dataset::DatasetError;
pub use metrics::MetricsRegistry;
