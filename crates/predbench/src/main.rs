// Predbench benchmark driver
//
// Design Decision: Use clap derive for argument parsing, matching the rest
// of the workspace tooling.
// Design Decision: Config comes from a JSON file when -f is given, from
// interactive prompts otherwise.
// Design Decision: Fatal config/dataset errors log a descriptive line and
// exit non-zero before any loop starts.

use std::sync::Arc;

use clap::Parser;
use predbench::driver::{self, REQUIRED_CONFIG_KEYS};
use predbench_core::backend::NoopBackend;
use predbench_core::config::BenchConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "predbench")]
#[command(about = "Synthetic load generator for prediction-serving backends")]
#[command(version)]
struct Cli {
    /// Config file name (flat JSON object); prompts interactively if omitted
    #[arg(long, short = 'f')]
    filename: Option<String>,
}

const SETUP_MESSAGE: &str =
    "Enter the benchmark configuration. Values are read one per line.";

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "predbench=info,predbench_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let config = match &cli.filename {
        Some(path) => BenchConfig::from_json(path, REQUIRED_CONFIG_KEYS),
        None => BenchConfig::from_prompt(SETUP_MESSAGE, REQUIRED_CONFIG_KEYS),
    };
    let config = match config {
        Ok(config) => config,
        Err(error) => {
            tracing::error!(%error, "invalid benchmark configuration");
            std::process::exit(1);
        }
    };

    let backend = Arc::new(NoopBackend::new());
    if let Err(error) = driver::run(config, backend).await {
        tracing::error!(%error, "benchmark run failed");
        std::process::exit(1);
    }
}
