//! Name-keyed aggregator registry
//!
//! The registry is the single shared-mutable surface of the benchmark:
//! completion continuations increment aggregators through it while the
//! reporting loop drains them. It is a plain value shared via `Arc`, so
//! tests can run several registries side by side.

use std::fmt::Write as _;
use std::sync::Arc;

use dashmap::DashMap;

use super::aggregators::{Counter, Histogram, Meter, RatioCounter};

enum Metric {
    Histogram(Arc<Histogram>),
    Meter(Arc<Meter>),
    Counter(Arc<Counter>),
    Ratio(Arc<RatioCounter>),
}

impl Metric {
    fn kind(&self) -> &'static str {
        match self {
            Metric::Histogram(_) => "histogram",
            Metric::Meter(_) => "meter",
            Metric::Counter(_) => "counter",
            Metric::Ratio(_) => "ratio_counter",
        }
    }
}

/// Registry of named aggregators with lazy creation
///
/// The first `create_*` call with a name registers the aggregator; later
/// calls with the same name return the same shared instance. Requesting an
/// existing name as a different kind is a caller bug and panics.
#[derive(Default)]
pub struct MetricsRegistry {
    metrics: DashMap<String, Metric>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the histogram registered under `name`
    pub fn create_histogram(
        &self,
        name: impl Into<String>,
        unit: &'static str,
        sample_size: usize,
    ) -> Arc<Histogram> {
        let entry = self
            .metrics
            .entry(name.into())
            .or_insert_with(|| Metric::Histogram(Arc::new(Histogram::new(unit, sample_size))));
        match entry.value() {
            Metric::Histogram(h) => h.clone(),
            other => panic!(
                "metric '{}' is already registered as a {}",
                entry.key(),
                other.kind()
            ),
        }
    }

    /// Get or create the meter registered under `name`
    pub fn create_meter(&self, name: impl Into<String>) -> Arc<Meter> {
        let entry = self
            .metrics
            .entry(name.into())
            .or_insert_with(|| Metric::Meter(Arc::new(Meter::new())));
        match entry.value() {
            Metric::Meter(m) => m.clone(),
            other => panic!(
                "metric '{}' is already registered as a {}",
                entry.key(),
                other.kind()
            ),
        }
    }

    /// Get or create the counter registered under `name`
    pub fn create_counter(&self, name: impl Into<String>) -> Arc<Counter> {
        let entry = self
            .metrics
            .entry(name.into())
            .or_insert_with(|| Metric::Counter(Arc::new(Counter::new())));
        match entry.value() {
            Metric::Counter(c) => c.clone(),
            other => panic!(
                "metric '{}' is already registered as a {}",
                entry.key(),
                other.kind()
            ),
        }
    }

    /// Get or create the ratio counter registered under `name`
    pub fn create_ratio_counter(&self, name: impl Into<String>) -> Arc<RatioCounter> {
        let entry = self
            .metrics
            .entry(name.into())
            .or_insert_with(|| Metric::Ratio(Arc::new(RatioCounter::new())));
        match entry.value() {
            Metric::Ratio(r) => r.clone(),
            other => panic!(
                "metric '{}' is already registered as a {}",
                entry.key(),
                other.kind()
            ),
        }
    }

    /// Format a snapshot of every registered aggregator, one block per
    /// metric in name order
    ///
    /// With `clear`, each aggregator is atomically drained as it is read, so
    /// increments arriving during the call land in exactly one window.
    pub fn report(&self, clear: bool) -> String {
        let mut blocks: Vec<(String, String)> = self
            .metrics
            .iter()
            .map(|entry| (entry.key().clone(), format_metric(entry.value(), clear)))
            .collect();
        blocks.sort_by(|a, b| a.0.cmp(&b.0));

        let mut out = String::new();
        for (name, block) in blocks {
            let _ = writeln!(out, "{name}");
            let _ = writeln!(out, "{block}");
        }
        out
    }
}

fn format_metric(metric: &Metric, clear: bool) -> String {
    match metric {
        Metric::Histogram(h) => {
            let s = h.snapshot(clear);
            format!(
                "  count: {}  min: {}  max: {}  mean: {:.2}  std_dev: {:.2}  unit: {}\n  p50: {}  p95: {}  p99: {}",
                s.count, s.min, s.max, s.mean, s.std_dev, s.unit, s.p50, s.p95, s.p99
            )
        }
        Metric::Meter(m) => {
            let s = m.snapshot(clear);
            format!(
                "  count: {}  mean_rate: {:.2} events/s  one_minute_rate: {:.2} events/s",
                s.count, s.mean_rate, s.one_minute_rate
            )
        }
        Metric::Counter(c) => {
            format!("  count: {}", c.snapshot(clear))
        }
        Metric::Ratio(r) => {
            let s = r.snapshot(clear);
            format!("  ratio: {:.3} ({}/{})", s.ratio(), s.numerator, s.denominator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_returns_same_instance() {
        let registry = MetricsRegistry::new();

        let first = registry.create_counter("app:test:num_predictions");
        let second = registry.create_counter("app:test:num_predictions");
        first.increment(3);
        assert_eq!(second.value(), 3);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn kind_mismatch_panics() {
        let registry = MetricsRegistry::new();
        registry.create_counter("app:test:latency");
        registry.create_meter("app:test:latency");
    }

    #[test]
    fn registries_are_independent() {
        let a = MetricsRegistry::new();
        let b = MetricsRegistry::new();
        a.create_counter("shared_name").increment(1);
        assert_eq!(b.create_counter("shared_name").value(), 0);
    }

    #[test]
    fn report_lists_metrics_in_name_order() {
        let registry = MetricsRegistry::new();
        registry.create_counter("b_counter").increment(2);
        registry.create_ratio_counter("a_ratio").increment(1, 2);

        let report = registry.report(false);
        let a_pos = report.find("a_ratio").unwrap();
        let b_pos = report.find("b_counter").unwrap();
        assert!(a_pos < b_pos);
        assert!(report.contains("ratio: 0.500 (1/2)"));
        assert!(report.contains("count: 2"));
    }

    #[test]
    fn clearing_report_starts_a_fresh_window() {
        let registry = MetricsRegistry::new();
        let counter = registry.create_counter("window_counter");

        counter.increment(5);
        let first = registry.report(true);
        assert!(first.contains("count: 5"));

        counter.increment(3);
        let second = registry.report(false);
        assert!(second.contains("count: 3"));

        // Non-clearing report did not reset the window
        let third = registry.report(false);
        assert!(third.contains("count: 3"));
    }
}
