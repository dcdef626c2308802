//! Aggregator implementations
//!
//! Counter and RatioCounter are lock-free; Histogram and Meter keep their
//! state behind a per-instance parking_lot mutex. In both cases the clear
//! boundary is exact: an update racing a snapshot(clear) is counted in
//! either the drained window or the next one, never both, never neither.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

/// Interval between EWMA rate updates
const TICK_SECS: f64 = 5.0;

/// Monotonic event counter
#[derive(Debug, Default)]
pub struct Counter {
    count: AtomicU64,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `n` events
    pub fn increment(&self, n: u64) {
        self.count.fetch_add(n, Ordering::Relaxed);
    }

    /// Current count
    pub fn value(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    /// Read the count, resetting it to zero when `clear` is set
    pub fn snapshot(&self, clear: bool) -> u64 {
        if clear {
            self.count.swap(0, Ordering::Relaxed)
        } else {
            self.count.load(Ordering::Relaxed)
        }
    }
}

/// Numerator/denominator pair reporting a ratio
///
/// Both halves live in one u64 (numerator high, denominator low), so an
/// increment is a single fetch_add and snapshot+clear a single swap. That is
/// what keeps the pair consistent without a lock: no snapshot can see a
/// numerator without its denominator.
#[derive(Debug, Default)]
pub struct RatioCounter {
    packed: AtomicU64,
}

/// Point-in-time view of a [`RatioCounter`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatioSnapshot {
    pub numerator: u32,
    pub denominator: u32,
}

impl RatioSnapshot {
    /// Numerator over denominator; 0.0 when nothing has been observed
    pub fn ratio(&self) -> f64 {
        if self.denominator == 0 {
            0.0
        } else {
            f64::from(self.numerator) / f64::from(self.denominator)
        }
    }
}

impl RatioCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add to both halves in one atomic step
    pub fn increment(&self, num: u32, den: u32) {
        let delta = (u64::from(num) << 32) | u64::from(den);
        self.packed.fetch_add(delta, Ordering::Relaxed);
    }

    /// Read both halves, resetting them when `clear` is set
    pub fn snapshot(&self, clear: bool) -> RatioSnapshot {
        let packed = if clear {
            self.packed.swap(0, Ordering::Relaxed)
        } else {
            self.packed.load(Ordering::Relaxed)
        };
        RatioSnapshot {
            numerator: (packed >> 32) as u32,
            denominator: (packed & 0xFFFF_FFFF) as u32,
        }
    }
}

/// Reservoir state; everything lives under one lock so a snapshot never
/// observes a count without its sample
#[derive(Debug)]
struct HistogramState {
    samples: Vec<u64>,
    inserts: u64,
    min: u64,
    max: u64,
}

impl HistogramState {
    fn empty() -> Self {
        Self {
            samples: Vec::new(),
            inserts: 0,
            min: u64::MAX,
            max: 0,
        }
    }
}

/// Bounded-reservoir duration histogram
///
/// Keeps at most `capacity` raw samples; once full, new samples overwrite
/// the slot at `inserts % capacity`, keeping the reservoir a bounded sample
/// of the stream. Distribution statistics come from the reservoir; count,
/// min and max are exact over the window.
#[derive(Debug)]
pub struct Histogram {
    unit: &'static str,
    capacity: usize,
    state: Mutex<HistogramState>,
}

/// Point-in-time view of a [`Histogram`]
#[derive(Debug, Clone)]
pub struct HistogramSnapshot {
    pub unit: &'static str,
    pub count: u64,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    pub std_dev: f64,
    pub p50: u64,
    pub p95: u64,
    pub p99: u64,
}

impl Histogram {
    pub fn new(unit: &'static str, capacity: usize) -> Self {
        Self {
            unit,
            capacity: capacity.max(1),
            state: Mutex::new(HistogramState::empty()),
        }
    }

    /// Record one sample
    pub fn insert(&self, value: u64) {
        let mut state = self.state.lock();
        if state.samples.len() < self.capacity {
            state.samples.push(value);
        } else {
            let slot = (state.inserts % self.capacity as u64) as usize;
            state.samples[slot] = value;
        }
        state.inserts += 1;
        state.min = state.min.min(value);
        state.max = state.max.max(value);
    }

    /// Total samples recorded in the current window
    pub fn count(&self) -> u64 {
        self.state.lock().inserts
    }

    /// Compute distribution statistics, resetting the window when `clear` is set
    pub fn snapshot(&self, clear: bool) -> HistogramSnapshot {
        let mut state = self.state.lock();
        let snapshot = Self::compute(self.unit, &state);
        if clear {
            *state = HistogramState::empty();
        }
        snapshot
    }

    fn compute(unit: &'static str, state: &HistogramState) -> HistogramSnapshot {
        if state.samples.is_empty() {
            return HistogramSnapshot {
                unit,
                count: 0,
                min: 0,
                max: 0,
                mean: 0.0,
                std_dev: 0.0,
                p50: 0,
                p95: 0,
                p99: 0,
            };
        }

        let mut sorted = state.samples.clone();
        sorted.sort_unstable();
        let n = sorted.len() as f64;
        let mean = sorted.iter().map(|&v| v as f64).sum::<f64>() / n;
        let variance = sorted
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum::<f64>()
            / n;

        let percentile = |p: f64| {
            let idx = ((sorted.len() as f64 * p) as usize).min(sorted.len() - 1);
            sorted[idx]
        };

        HistogramSnapshot {
            unit,
            count: state.inserts,
            min: state.min,
            max: state.max,
            mean,
            std_dev: variance.sqrt(),
            p50: percentile(0.50),
            p95: percentile(0.95),
            p99: percentile(0.99),
        }
    }
}

/// Meter state; guarded as one unit so clear resets count, rate and window
/// start together
#[derive(Debug)]
struct MeterState {
    count: u64,
    uncounted: u64,
    rate_1m: f64,
    rate_initialized: bool,
    window_start: Instant,
    last_tick: Instant,
}

impl MeterState {
    fn fresh(now: Instant) -> Self {
        Self {
            count: 0,
            uncounted: 0,
            rate_1m: 0.0,
            rate_initialized: false,
            window_start: now,
            last_tick: now,
        }
    }

    /// Fold elapsed 5s intervals into the one-minute EWMA
    fn tick(&mut self, now: Instant) {
        let alpha = 1.0 - (-TICK_SECS / 60.0).exp();
        while now.duration_since(self.last_tick).as_secs_f64() >= TICK_SECS {
            let instant_rate = self.uncounted as f64 / TICK_SECS;
            self.uncounted = 0;
            if self.rate_initialized {
                self.rate_1m += alpha * (instant_rate - self.rate_1m);
            } else {
                self.rate_1m = instant_rate;
                self.rate_initialized = true;
            }
            self.last_tick += std::time::Duration::from_secs_f64(TICK_SECS);
        }
    }
}

/// Event-rate meter with a one-minute exponentially weighted moving rate
#[derive(Debug)]
pub struct Meter {
    state: Mutex<MeterState>,
}

/// Point-in-time view of a [`Meter`]; rates are events per second
#[derive(Debug, Clone, Copy)]
pub struct MeterSnapshot {
    pub count: u64,
    pub mean_rate: f64,
    pub one_minute_rate: f64,
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}

impl Meter {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MeterState::fresh(Instant::now())),
        }
    }

    /// Mark `n` events
    pub fn mark(&self, n: u64) {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.tick(now);
        state.count += n;
        state.uncounted += n;
    }

    /// Compute rates, resetting the window when `clear` is set
    pub fn snapshot(&self, clear: bool) -> MeterSnapshot {
        let now = Instant::now();
        let mut state = self.state.lock();
        state.tick(now);

        let elapsed = now.duration_since(state.window_start).as_secs_f64();
        let mean_rate = if elapsed > 0.0 {
            state.count as f64 / elapsed
        } else {
            0.0
        };
        let snapshot = MeterSnapshot {
            count: state.count,
            mean_rate,
            one_minute_rate: if state.rate_initialized {
                state.rate_1m
            } else {
                // Not a full tick yet; fall back to the window mean
                mean_rate
            },
        };
        if clear {
            *state = MeterState::fresh(now);
        }
        snapshot
    }
}
