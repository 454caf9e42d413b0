//! Timing metrics for engine operations.
//!
//! A [`MetricsCollector`] is created by whoever owns the engine and shared
//! through an `Arc`; there is no process-wide instance.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Samples kept per label
pub const MAX_SAMPLES: usize = 100;

/// Average and sample count for one label
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricSummary {
    pub average_ms: f64,
    pub count: usize,
}

/// Rolling window of duration samples, keyed by label
#[derive(Debug, Default)]
pub struct MetricsCollector {
    samples: Mutex<HashMap<String, VecDeque<f64>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one sample in milliseconds, evicting the oldest past [`MAX_SAMPLES`]
    pub fn record(&self, label: &str, millis: f64) {
        let Ok(mut samples) = self.samples.lock() else {
            tracing::warn!("metrics lock poisoned, dropping sample for {}", label);
            return;
        };

        let window = samples.entry(label.to_string()).or_default();
        window.push_back(millis);
        if window.len() > MAX_SAMPLES {
            window.pop_front();
        }
    }

    /// Start timing `label`; the elapsed time is recorded when the guard drops
    pub fn start_timer(self: &Arc<Self>, label: impl Into<String>) -> TimerGuard {
        TimerGuard {
            collector: Arc::clone(self),
            label: label.into(),
            start: Instant::now(),
        }
    }

    pub fn average(&self, label: &str) -> f64 {
        self.samples
            .lock()
            .ok()
            .and_then(|samples| samples.get(label).map(mean))
            .unwrap_or(0.0)
    }

    pub fn snapshot(&self) -> BTreeMap<String, MetricSummary> {
        let Ok(samples) = self.samples.lock() else {
            return BTreeMap::new();
        };

        samples
            .iter()
            .map(|(label, window)| {
                (
                    label.clone(),
                    MetricSummary {
                        average_ms: mean(window),
                        count: window.len(),
                    },
                )
            })
            .collect()
    }
}

fn mean(window: &VecDeque<f64>) -> f64 {
    if window.is_empty() {
        0.0
    } else {
        window.iter().sum::<f64>() / window.len() as f64
    }
}

/// Records elapsed milliseconds into its collector on drop
pub struct TimerGuard {
    collector: Arc<MetricsCollector>,
    label: String,
    start: Instant,
}

impl TimerGuard {
    pub fn elapsed_ms(&self) -> f64 {
        self.start.elapsed().as_secs_f64() * 1000.0
    }
}

impl Drop for TimerGuard {
    fn drop(&mut self) {
        let elapsed = self.elapsed_ms();
        self.collector.record(&self.label, elapsed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_average_of_unknown_label() {
        let metrics = MetricsCollector::new();
        assert_eq!(metrics.average("missing"), 0.0);
        assert!(metrics.snapshot().is_empty());
    }

    #[test]
    fn test_record_and_average() {
        let metrics = MetricsCollector::new();
        metrics.record("search", 10.0);
        metrics.record("search", 20.0);
        metrics.record("score", 1.0);

        assert_eq!(metrics.average("search"), 15.0);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot["search"], MetricSummary { average_ms: 15.0, count: 2 });
        assert_eq!(snapshot["score"].count, 1);
    }

    #[test]
    fn test_window_keeps_last_samples() {
        let metrics = MetricsCollector::new();
        for i in 0..150 {
            metrics.record("rank", i as f64);
        }

        let summary = metrics.snapshot()["rank"];
        assert_eq!(summary.count, MAX_SAMPLES);
        // samples 50..150 remain
        assert_eq!(summary.average_ms, 99.5);
    }

    #[test]
    fn test_timer_guard_records_on_drop() {
        let metrics = Arc::new(MetricsCollector::new());
        {
            let _timer = metrics.start_timer("find_matches");
        }
        assert_eq!(metrics.snapshot()["find_matches"].count, 1);
        assert!(metrics.average("find_matches") >= 0.0);
    }
}
