//! In-process no-op backend
//!
//! Stands in for the serving system in local runs and tests: every request
//! resolves after a small randomized service delay with a non-default
//! output. State puts land in an in-memory table that tests can inspect.

use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use super::{
    BackendError, PredictionBackend, PredictionRequest, PredictionResponse, ResponseHandle,
    StateKey,
};

/// Backend stand-in that answers every request after a simulated service delay
pub struct NoopBackend {
    service_delay_micros: RangeInclusive<u64>,
    state: Mutex<HashMap<StateKey, Vec<u8>>>,
}

impl Default for NoopBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl NoopBackend {
    pub fn new() -> Self {
        Self::with_service_delay(500..=2_000)
    }

    /// Use a specific simulated service-delay range in microseconds
    pub fn with_service_delay(service_delay_micros: RangeInclusive<u64>) -> Self {
        Self {
            service_delay_micros,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Read back a seeded state entry
    pub fn state(&self, key: &StateKey) -> Option<Vec<u8>> {
        self.state.lock().get(key).cloned()
    }
}

#[async_trait]
impl PredictionBackend for NoopBackend {
    fn submit(&self, _request: PredictionRequest) -> ResponseHandle {
        let delay = rand::thread_rng().gen_range(self.service_delay_micros.clone());
        Box::pin(async move {
            let started = Instant::now();
            tokio::time::sleep(Duration::from_micros(delay)).await;
            Ok(PredictionResponse {
                output_is_default: false,
                duration_micros: started.elapsed().as_micros() as u64,
            })
        })
    }

    async fn block_until_ready(&self) {}

    async fn put_state(&self, key: StateKey, value: Vec<u8>) -> Result<(), BackendError> {
        self.state.lock().insert(key, value);
        Ok(())
    }
}
