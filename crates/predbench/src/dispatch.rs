//! Prediction dispatch loop
//!
//! Issues one asynchronous request per step at a fixed inter-step delay and
//! never waits for completions: each submission's continuation is spawned
//! onto the runtime and records metrics on whatever worker resolves it.
//! Backpressure is purely time-based; completions race ahead of or behind
//! dispatch freely.

use std::sync::Arc;
use std::time::{Duration, Instant};

use predbench_core::backend::{
    BackendError, PredictionBackend, PredictionRequest, PredictionResponse, VersionedModel,
    DEFAULT_OUTPUT_SELECTION_POLICY,
};
use predbench_core::config::{
    BenchConfig, ConfigError, BATCH_DELAY_MILLIS, LATENCY_OBJECTIVE, NUM_BATCHES,
};
use predbench_core::metrics::{Counter, Histogram, Meter, MetricsRegistry, RatioCounter};

/// Reservoir size for the latency histogram
const LATENCY_SAMPLE_SIZE: usize = 4096;

/// The benchmark's named aggregator bundle
///
/// Names are fully qualified under the application label so several apps can
/// share one registry.
#[derive(Clone)]
pub struct BenchMetrics {
    pub latency: Arc<Histogram>,
    pub throughput: Arc<Meter>,
    pub send_rate: Arc<Meter>,
    pub num_predictions: Arc<Counter>,
    pub default_pred_ratio: Arc<RatioCounter>,
}

impl BenchMetrics {
    pub fn new(registry: &MetricsRegistry, app_name: &str) -> Self {
        Self {
            latency: registry.create_histogram(
                format!("app:{app_name}:prediction_latency"),
                "microseconds",
                LATENCY_SAMPLE_SIZE,
            ),
            throughput: registry.create_meter(format!("app:{app_name}:prediction_throughput")),
            send_rate: registry.create_meter(format!("app:{app_name}:send_rate")),
            num_predictions: registry.create_counter(format!("app:{app_name}:num_predictions")),
            default_pred_ratio: registry
                .create_ratio_counter(format!("app:{app_name}:default_prediction_ratio")),
        }
    }
}

/// Parameters for one dispatch run
#[derive(Debug, Clone)]
pub struct DispatchParams {
    /// Application label attached to every request
    pub app_name: String,
    /// Number of dispatch steps to execute
    pub num_batches: u64,
    /// Fixed inter-step delay
    pub batch_delay: Duration,
    /// Latency budget attached to every request, in milliseconds
    pub latency_budget_millis: u64,
    /// The model every request targets
    pub model: VersionedModel,
}

impl DispatchParams {
    /// Resolve dispatch parameters from the configuration map
    pub fn from_config(
        config: &BenchConfig,
        app_name: &str,
        model: VersionedModel,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            app_name: app_name.to_string(),
            num_batches: non_negative(config, NUM_BATCHES)?,
            batch_delay: Duration::from_millis(non_negative(config, BATCH_DELAY_MILLIS)?),
            latency_budget_millis: non_negative(config, LATENCY_OBJECTIVE)?,
            model,
        })
    }
}

fn non_negative(config: &BenchConfig, key: &str) -> Result<u64, ConfigError> {
    let value = config.get_long(key)?;
    u64::try_from(value).map_err(|_| ConfigError::Malformed {
        key: key.to_string(),
        value: value.to_string(),
        expected: "non-negative integer",
    })
}

/// Execute the dispatch loop: `num_batches` steps over `corpus` with
/// wraparound
///
/// Step `j` selects the vector at `j % corpus.len()` and perturbs its first
/// coordinate by the integer epoch `j / corpus.len()`, so repeated passes
/// over the corpus never resubmit an identical input (defeats response
/// caching in the backend). The loop returns after the final step
/// regardless of outstanding completions.
pub async fn send_predictions(
    params: &DispatchParams,
    backend: Arc<dyn PredictionBackend>,
    corpus: Arc<Vec<Vec<f64>>>,
    metrics: &BenchMetrics,
) {
    let num_datapoints = corpus.len() as u64;

    for j in 0..params.num_batches {
        let index = (j % num_datapoints) as usize;
        let mut input = corpus[index].clone();
        input[0] += (j / num_datapoints) as f64;

        let request = PredictionRequest {
            app_name: params.app_name.clone(),
            user_id: 0,
            input,
            latency_budget_millis: params.latency_budget_millis,
            selection_policy: DEFAULT_OUTPUT_SELECTION_POLICY.to_string(),
            candidate_models: vec![params.model.clone()],
        };

        let handle = backend.submit(request);
        metrics.send_rate.mark(1);

        let metrics = metrics.clone();
        let submitted = Instant::now();
        tokio::spawn(async move {
            record_completion(handle.await, submitted, &metrics);
        });

        tokio::time::sleep(params.batch_delay).await;
    }
}

/// Record one resolved completion
///
/// Failures never propagate to the dispatch loop: a failed request is a
/// default-output observation whose latency is the elapsed time since
/// submission.
fn record_completion(
    result: Result<PredictionResponse, BackendError>,
    submitted: Instant,
    metrics: &BenchMetrics,
) {
    match result {
        Ok(response) => {
            if response.output_is_default {
                metrics.default_pred_ratio.increment(1, 1);
            } else {
                metrics.default_pred_ratio.increment(0, 1);
            }
            metrics.latency.insert(response.duration_micros);
        }
        Err(error) => {
            tracing::warn!(%error, "prediction failed, recording as default output");
            metrics.default_pred_ratio.increment(1, 1);
            metrics.latency.insert(submitted.elapsed().as_micros() as u64);
        }
    }
    metrics.num_predictions.increment(1);
    metrics.throughput.mark(1);
}
