//! Windowed metrics reporting
//!
//! Runs on its own schedule, independent of the dispatch loop's step count:
//! each interval snapshots and clears the registry, labels the result with
//! the wall-clock window it covers, and emits it to both the log and the
//! reports file. Window boundaries are wall-clock-driven, so a window may
//! contain a partial batch.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use predbench_core::config::{
    BenchConfig, ConfigError, BATCH_DELAY_MILLIS, LATENCY_OBJECTIVE, REPORTS_PATH,
    REPORT_DELAY_SECONDS,
};
use predbench_core::metrics::MetricsRegistry;

/// Parameters for the reporting loop
#[derive(Debug, Clone)]
pub struct ReportParams {
    /// Interval between windowed reports, in whole seconds
    pub report_delay_seconds: u64,
    /// File receiving every windowed report
    pub reports_path: PathBuf,
    /// Raw latency objective, echoed in the report header
    pub latency_objective: String,
    /// Raw batch delay, echoed in the report header
    pub batch_delay_millis: String,
}

impl ReportParams {
    /// Resolve reporting parameters from the configuration map
    pub fn from_config(config: &BenchConfig) -> Result<Self, ConfigError> {
        let delay = config.get_int(REPORT_DELAY_SECONDS)?;
        let report_delay_seconds = u64::try_from(delay).map_err(|_| ConfigError::Malformed {
            key: REPORT_DELAY_SECONDS.to_string(),
            value: delay.to_string(),
            expected: "non-negative integer",
        })?;
        Ok(Self {
            report_delay_seconds,
            reports_path: PathBuf::from(config.get_string(REPORTS_PATH)?),
            latency_objective: config.get_string(LATENCY_OBJECTIVE)?,
            batch_delay_millis: config.get_string(BATCH_DELAY_MILLIS)?,
        })
    }
}

/// The reports file, created once per run
pub struct ReportSink {
    file: File,
}

impl ReportSink {
    /// Create the reports file and write the run header
    pub fn create(params: &ReportParams) -> std::io::Result<Self> {
        let mut file = File::create(&params.reports_path)?;
        writeln!(
            file,
            "Benchmark run started {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(
            file,
            "Hyperparameters in this run: Latency (ms): {}, Batch delay (ms): {}",
            params.latency_objective, params.batch_delay_millis
        )?;
        Ok(Self { file })
    }

    /// Append one tagged report
    pub fn append(&mut self, tag: &str, body: &str) -> std::io::Result<()> {
        writeln!(self.file, "\n{tag}")?;
        writeln!(self.file, "{body}")?;
        self.file.flush()
    }
}

/// Label for report window `window` at `delay_seconds` per window
///
/// Window N spans [(N-1)*delay, N*delay] in seconds from the start of the
/// run.
fn window_tag(window: u64, delay_seconds: u64) -> String {
    let lower = delay_seconds * (window - 1);
    let upper = delay_seconds * window;
    format!("METRICS at {lower}s – {upper}s")
}

/// Run the reporting loop until the process exits
///
/// Each interval: sleep, snapshot-and-clear the registry, emit the window.
/// The only coordination with the dispatch loop is the shared registry; a
/// failed file write degrades to log-only reporting for that window.
pub async fn report_and_clear_metrics(
    params: ReportParams,
    registry: Arc<MetricsRegistry>,
    mut sink: ReportSink,
) {
    let mut window: u64 = 1;
    loop {
        tokio::time::sleep(Duration::from_secs(params.report_delay_seconds)).await;

        let metrics = registry.report(true);
        let tag = window_tag(window, params.report_delay_seconds);
        tracing::info!("{tag}\n{metrics}");
        if let Err(error) = sink.append(&tag, &metrics) {
            tracing::warn!(%error, "failed to append window report to file");
        }
        window += 1;
    }
}
