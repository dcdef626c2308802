//! Benchmark configuration
//!
//! Configuration is a flat string-to-string map loaded once at startup,
//! either from a JSON document or from interactive prompts. Typed accessors
//! parse on read and fail loudly, so a bad run dies before any loop starts.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::path::Path;

/// Key for the path to the binary CIFAR data file
pub const CIFAR_DATA_PATH: &str = "cifar_data_path";
/// Key for the number of dispatch steps to execute
pub const NUM_BATCHES: &str = "num_batches";
/// Key for the inter-step delay in milliseconds
pub const BATCH_DELAY_MILLIS: &str = "batch_delay_millis";
/// Key for the per-request latency objective in milliseconds
pub const LATENCY_OBJECTIVE: &str = "latency_objective";
/// Key for the reporting interval in seconds
pub const REPORT_DELAY_SECONDS: &str = "report_delay_seconds";
/// Key for the windowed report output file
pub const REPORTS_PATH: &str = "reports_path";

/// Error type for configuration access
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Requested key is not present in the map
    #[error("key '{0}' does not exist in config")]
    MissingKey(String),

    /// Value is present but cannot be parsed as the requested type
    #[error("value '{value}' for key '{key}' is not a valid {expected}")]
    Malformed {
        key: String,
        value: String,
        expected: &'static str,
    },

    /// Config source could not be read or parsed
    #[error("failed to load config from '{path}': {reason}")]
    Source { path: String, reason: String },
}

/// Immutable benchmark configuration map
///
/// Values stay raw strings; every typed accessor parses on read. Boolean
/// parsing recognizes exactly the literal "true", anything else is false.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    values: HashMap<String, String>,
}

impl BenchConfig {
    /// Build a config directly from a key/value map (used by tests)
    pub fn from_map(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Load the requested keys from a flat JSON object at `path`
    ///
    /// Every requested key must be present as a string field.
    pub fn from_json(path: impl AsRef<Path>, keys: &[&str]) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = |reason: String| ConfigError::Source {
            path: path.display().to_string(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| source(e.to_string()))?;
        let doc: serde_json::Value =
            serde_json::from_str(&text).map_err(|e| source(e.to_string()))?;

        let mut values = HashMap::new();
        for key in keys {
            let field = doc
                .get(*key)
                .ok_or_else(|| ConfigError::MissingKey((*key).to_string()))?;
            let value = field.as_str().ok_or_else(|| ConfigError::Malformed {
                key: (*key).to_string(),
                value: field.to_string(),
                expected: "string field",
            })?;
            values.insert((*key).to_string(), value.to_string());
        }
        Ok(Self { values })
    }

    /// Gather the requested keys by prompting on stdin
    ///
    /// Prints `setup_message` first, then asks for each key in order.
    pub fn from_prompt(setup_message: &str, keys: &[&str]) -> Result<Self, ConfigError> {
        let stdin = std::io::stdin();
        let mut input = stdin.lock();
        let mut output = std::io::stdout();
        Self::from_prompt_io(setup_message, keys, &mut input, &mut output)
    }

    /// Prompt over arbitrary reader/writer pairs (separated for tests)
    pub fn from_prompt_io(
        setup_message: &str,
        keys: &[&str],
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Self, ConfigError> {
        let source = |reason: String| ConfigError::Source {
            path: "<prompt>".to_string(),
            reason,
        };

        writeln!(output, "{setup_message}").map_err(|e| source(e.to_string()))?;
        let mut values = HashMap::new();
        for key in keys {
            write!(output, "{key}: ").map_err(|e| source(e.to_string()))?;
            output.flush().map_err(|e| source(e.to_string()))?;
            let mut line = String::new();
            input.read_line(&mut line).map_err(|e| source(e.to_string()))?;
            values.insert((*key).to_string(), line.trim().to_string());
        }
        Ok(Self { values })
    }

    /// Return the raw string value for `key`
    pub fn get_string(&self, key: &str) -> Result<String, ConfigError> {
        self.values
            .get(key)
            .cloned()
            .ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Return the value for `key` parsed as an i32
    pub fn get_int(&self, key: &str) -> Result<i32, ConfigError> {
        let raw = self.get_string(key)?;
        raw.parse().map_err(|_| ConfigError::Malformed {
            key: key.to_string(),
            value: raw,
            expected: "integer",
        })
    }

    /// Return the value for `key` parsed as an i64
    pub fn get_long(&self, key: &str) -> Result<i64, ConfigError> {
        let raw = self.get_string(key)?;
        raw.parse().map_err(|_| ConfigError::Malformed {
            key: key.to_string(),
            value: raw,
            expected: "long integer",
        })
    }

    /// Return true iff the value for `key` is exactly the literal "true"
    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        Ok(self.get_string(key)? == "true")
    }
}
