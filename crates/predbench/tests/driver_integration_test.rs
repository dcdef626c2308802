//! End-to-end driver tests against the in-process no-op backend

use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;

use predbench::driver::{self, TEST_APPLICATION_LABEL};
use predbench_core::backend::{NoopBackend, StateKey};
use predbench_core::config::BenchConfig;
use predbench_core::dataset::{CIFAR_BIRD_INDEX, CIFAR_PLANE_INDEX, RECORDS_PER_FILE, RECORD_DIM};

/// Write a CIFAR-format batch file alternating plane and bird records
fn write_cifar_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("cifar_test_batch.bin");
    let mut file = std::io::BufWriter::new(std::fs::File::create(&path).unwrap());
    for i in 0..RECORDS_PER_FILE {
        let label = if i % 2 == 0 {
            CIFAR_PLANE_INDEX
        } else {
            CIFAR_BIRD_INDEX
        };
        file.write_all(&[label]).unwrap();
        file.write_all(&vec![(i % 256) as u8; RECORD_DIM]).unwrap();
    }
    file.flush().unwrap();
    path
}

fn run_config(dir: &tempfile::TempDir, data_path: &std::path::Path) -> BenchConfig {
    let pairs = [
        ("cifar_data_path", data_path.display().to_string()),
        ("num_batches", "25".to_string()),
        ("batch_delay_millis", "0".to_string()),
        ("latency_objective", "100".to_string()),
        // Longer than the run, so no clearing window interleaves with
        // dispatch and the final report covers all activity
        ("report_delay_seconds", "1000".to_string()),
        (
            "reports_path",
            dir.path().join("reports.txt").display().to_string(),
        ),
    ];
    BenchConfig::from_map(
        pairs
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect::<HashMap<_, _>>(),
    )
}

#[tokio::test(start_paused = true)]
async fn full_run_seeds_state_and_reports_every_metric() {
    let dir = tempfile::tempdir().unwrap();
    let data_path = write_cifar_file(&dir);
    let config = run_config(&dir, &data_path);
    let backend = Arc::new(NoopBackend::with_service_delay(0..=100));

    let final_report = driver::run(config, backend.clone()).await.unwrap();

    // The default selection-policy state was seeded before dispatch
    let state_key = StateKey {
        app_name: TEST_APPLICATION_LABEL.to_string(),
        user_id: 0,
        model_id: 0,
    };
    let seeded = backend.state(&state_key).expect("policy state seeded");
    assert!(String::from_utf8(seeded).unwrap().contains("-1"));

    // Every benchmark aggregator appears in the final report
    for metric in [
        "prediction_latency",
        "prediction_throughput",
        "send_rate",
        "num_predictions",
        "default_prediction_ratio",
    ] {
        let name = format!("app:{TEST_APPLICATION_LABEL}:{metric}");
        assert!(
            final_report.contains(&name),
            "final report is missing {name}:\n{final_report}"
        );
    }

    // All 25 submissions were marked on the send-rate meter before the
    // dispatch loop returned
    let lines: Vec<&str> = final_report.lines().collect();
    let send_rate_line = lines
        .iter()
        .position(|l| *l == format!("app:{TEST_APPLICATION_LABEL}:send_rate"))
        .unwrap();
    assert!(
        lines[send_rate_line + 1].contains("count: 25"),
        "unexpected send_rate block: {}",
        lines[send_rate_line + 1]
    );

    // The reports file was created with the run header
    let reports = std::fs::read_to_string(dir.path().join("reports.txt")).unwrap();
    assert!(reports.contains("Latency (ms): 100, Batch delay (ms): 0"));
}

#[tokio::test(start_paused = true)]
async fn non_binary_dataset_path_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let mut config_map: HashMap<String, String> = HashMap::new();
    for (k, v) in [
        ("cifar_data_path", "/data/cifar-100-python/train"),
        ("num_batches", "5"),
        ("batch_delay_millis", "0"),
        ("latency_objective", "100"),
        ("report_delay_seconds", "1"),
    ] {
        config_map.insert(k.to_string(), v.to_string());
    }
    config_map.insert(
        "reports_path".to_string(),
        dir.path().join("reports.txt").display().to_string(),
    );
    let config = BenchConfig::from_map(config_map);
    let backend = Arc::new(NoopBackend::new());

    let err = driver::run(config, backend).await.unwrap_err();
    assert!(err.to_string().contains("cifar-100-python"));
}

#[tokio::test(start_paused = true)]
async fn missing_required_key_fails_before_dispatch() {
    let config = BenchConfig::from_map(HashMap::new());
    let backend = Arc::new(NoopBackend::new());

    let err = driver::run(config, backend).await.unwrap_err();
    assert!(err.to_string().contains("does not exist in config"));
}
