//! Prediction-serving backend contract
//!
//! The benchmark drives the serving system through this narrow seam:
//! non-blocking submission returning a one-shot completion handle, a
//! readiness gate, and policy-state seeding. The serving logic itself lives
//! behind the trait.

mod noop;

pub use noop::NoopBackend;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

/// Name of the selection policy seeded before every run
pub const DEFAULT_OUTPUT_SELECTION_POLICY: &str = "default_output_selection_policy";

/// Error type for backend operations
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Backend refused the request
    #[error("backend rejected the request: {0}")]
    Rejected(String),

    /// The completion handle was dropped before resolving
    #[error("backend dropped the request before resolving it")]
    Dropped,
}

/// A model identity and version the backend may route to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedModel {
    pub name: String,
    pub version: u32,
}

impl VersionedModel {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

/// One prediction request; built fresh per dispatch step and not retained
/// after submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Calling application label
    pub app_name: String,
    /// Requesting user
    pub user_id: u64,
    /// Feature vector
    pub input: Vec<f64>,
    /// Response-time budget in milliseconds; recorded by the backend's
    /// scheduler, never enforced by the benchmark
    pub latency_budget_millis: u64,
    /// Output-selection policy the backend should apply
    pub selection_policy: String,
    /// Candidate models for this request
    pub candidate_models: Vec<VersionedModel>,
}

/// One prediction completion; consumed exactly once by the continuation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictionResponse {
    /// Whether the backend fell back to the default output
    pub output_is_default: bool,
    /// Backend-measured service time in microseconds
    pub duration_micros: u64,
}

/// Addresses a piece of selection-policy state inside the backend
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StateKey {
    pub app_name: String,
    pub user_id: u64,
    pub model_id: u64,
}

/// One-shot completion handle returned by [`PredictionBackend::submit`]
///
/// Resolves exactly once, on whatever worker the backend (or the awaiting
/// task) runs on.
pub type ResponseHandle = BoxFuture<'static, Result<PredictionResponse, BackendError>>;

/// The request/response seam to the external serving system
#[async_trait]
pub trait PredictionBackend: Send + Sync {
    /// Submit a request without blocking
    ///
    /// The returned handle resolves exactly once with the response or a
    /// failure; the caller decides where to await it.
    fn submit(&self, request: PredictionRequest) -> ResponseHandle;

    /// Returns once the backend is ready to accept requests
    async fn block_until_ready(&self);

    /// Seed serialized selection-policy state before the run begins
    async fn put_state(&self, key: StateKey, value: Vec<u8>) -> Result<(), BackendError>;
}
