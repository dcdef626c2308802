//! Benchmark run sequence
//!
//! Wires configuration, backend readiness, policy-state seeding and dataset
//! preparation, then runs the dispatch and reporting loops concurrently.
//! The run ends when the dispatch loop's step count is exhausted; the
//! reporting loop is abandoned after one final non-clearing report.

use std::sync::Arc;
use std::time::Duration;

use predbench_core::backend::{PredictionBackend, StateKey, VersionedModel};
use predbench_core::config::{
    BenchConfig, BATCH_DELAY_MILLIS, CIFAR_DATA_PATH, LATENCY_OBJECTIVE, NUM_BATCHES,
    REPORTS_PATH, REPORT_DELAY_SECONDS,
};
use predbench_core::dataset::{concatenate_datapoints, load_cifar};
use predbench_core::metrics::MetricsRegistry;

use crate::dispatch::{send_predictions, BenchMetrics, DispatchParams};
use crate::report::{report_and_clear_metrics, ReportParams, ReportSink};

/// Application label attached to every benchmark request
pub const TEST_APPLICATION_LABEL: &str = "throughput_testing_app";
/// The model every benchmark request targets; must match the deployed
/// benchmark container
pub const MODEL_NAME: &str = "bench_noop";
/// Deployed version of the benchmark model
pub const MODEL_VERSION: u32 = 1;
/// Serialized default output seeded into the selection policy
pub const DEFAULT_OUTPUT: &str = "-1";

/// Keys every run must provide
pub const REQUIRED_CONFIG_KEYS: &[&str] = &[
    CIFAR_DATA_PATH,
    NUM_BATCHES,
    BATCH_DELAY_MILLIS,
    LATENCY_OBJECTIVE,
    REPORT_DELAY_SECONDS,
    REPORTS_PATH,
];

/// Settle time between backend readiness and the first request
const READY_SETTLE: Duration = Duration::from_secs(3);

/// Execute one full benchmark run against `backend`
///
/// Returns the final non-clearing report. Configuration and dataset errors
/// surface before any loop starts; the caller maps them to process exit.
pub async fn run(
    config: BenchConfig,
    backend: Arc<dyn PredictionBackend>,
) -> anyhow::Result<String> {
    // Resolve everything the loops need up front, so a bad config dies here
    let dispatch_params = DispatchParams::from_config(
        &config,
        TEST_APPLICATION_LABEL,
        VersionedModel::new(MODEL_NAME, MODEL_VERSION),
    )?;
    let report_params = ReportParams::from_config(&config)?;
    let data_path = config.get_string(CIFAR_DATA_PATH)?;

    backend.block_until_ready().await;
    tokio::time::sleep(READY_SETTLE).await;

    // Seed the default selection-policy state for the benchmark identity
    let state_key = StateKey {
        app_name: TEST_APPLICATION_LABEL.to_string(),
        user_id: 0,
        model_id: 0,
    };
    let init_state = serde_json::to_vec(&serde_json::json!({
        "default_output": DEFAULT_OUTPUT,
    }))?;
    backend.put_state(state_key, init_state).await?;

    // Prepare the corpus. Labels are dropped after concatenation; the
    // benchmark only dispatches datapoints.
    let partitions = load_cifar(&data_path)?;
    let (corpus, _targets) = concatenate_datapoints(partitions)?;
    let corpus = Arc::new(corpus);
    tracing::info!(datapoints = corpus.len(), "corpus prepared");

    let registry = Arc::new(MetricsRegistry::new());
    let bench_metrics = BenchMetrics::new(&registry, TEST_APPLICATION_LABEL);

    let sink = ReportSink::create(&report_params)?;
    let reporter = tokio::spawn(report_and_clear_metrics(
        report_params,
        registry.clone(),
        sink,
    ));

    send_predictions(&dispatch_params, backend, corpus, &bench_metrics).await;

    // Final report; the reporting task is abandoned, not joined
    let final_report = registry.report(false);
    tracing::info!("final metrics\n{final_report}");
    tracing::info!("terminating benchmarking run");
    reporter.abort();

    Ok(final_report)
}
