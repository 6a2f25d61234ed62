//! Metrics collector: per-sink counters plus global rate/latency structures,
//! all bounded to the last 1 000 samples per series.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

const SAMPLE_RING_CAPACITY: usize = 1_000;
const EVENTS_PER_SECOND_WINDOW_MS: i64 = 60_000;

fn now_ms() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before epoch").as_millis() as i64
}

#[derive(Debug, Clone, Default)]
struct SinkCounters {
    success_count: u64,
    error_count: u64,
    send_latency: VecDeque<f64>,
    circuit_breaker_state: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Percentiles {
    pub p50: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsSnapshot {
    pub events_per_second: f64,
    pub batch_size: Percentiles,
    pub send_latency: Percentiles,
    pub error_rate: f64,
    pub queue_depth: u64,
    pub circuit_breaker_states: HashMap<String, String>,
}

struct State {
    sinks: HashMap<String, SinkCounters>,
    event_timestamps: VecDeque<i64>,
    batch_sizes: VecDeque<f64>,
    queue_depth: u64,
}

pub struct MetricsCollector {
    state: Mutex<State>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                sinks: HashMap::new(),
                event_timestamps: VecDeque::new(),
                batch_sizes: VecDeque::new(),
                queue_depth: 0,
            }),
        }
    }

    pub fn record_event(&self) {
        let mut state = self.state.lock().expect("metrics mutex poisoned");
        push_bounded_i64(&mut state.event_timestamps, now_ms());
    }

    pub fn record_batch(&self, sink_id: &str, size: usize, success: bool, latency_ms: f64) {
        let mut state = self.state.lock().expect("metrics mutex poisoned");
        push_bounded(&mut state.batch_sizes, size as f64);
        let counters = state.sinks.entry(sink_id.to_string()).or_default();
        if success {
            counters.success_count += 1;
        } else {
            counters.error_count += 1;
        }
        push_bounded(&mut counters.send_latency, latency_ms);
    }

    pub fn record_circuit_breaker_state(&self, sink_id: &str, state_name: &str) {
        let mut state = self.state.lock().expect("metrics mutex poisoned");
        state.sinks.entry(sink_id.to_string()).or_default().circuit_breaker_state = state_name.to_string();
    }

    pub fn set_queue_depth(&self, depth: u64) {
        self.state.lock().expect("metrics mutex poisoned").queue_depth = depth;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let state = self.state.lock().expect("metrics mutex poisoned");
        let cutoff = now_ms() - EVENTS_PER_SECOND_WINDOW_MS;
        let recent = state.event_timestamps.iter().filter(|t| **t >= cutoff).count();

        let mut all_latency: Vec<f64> = Vec::new();
        let mut total_success = 0u64;
        let mut total_error = 0u64;
        let mut breaker_states = HashMap::new();
        for (sink_id, counters) in &state.sinks {
            total_success += counters.success_count;
            total_error += counters.error_count;
            all_latency.extend(counters.send_latency.iter().copied());
            breaker_states.insert(sink_id.clone(), counters.circuit_breaker_state.clone());
        }

        let total_requests = total_success + total_error;
        let error_rate = if total_requests == 0 { 0.0 } else { total_error as f64 / total_requests as f64 };

        MetricsSnapshot {
            events_per_second: recent as f64 / 60.0,
            batch_size: percentiles(&state.batch_sizes.iter().copied().collect::<Vec<_>>()),
            send_latency: percentiles(&all_latency),
            error_rate,
            queue_depth: state.queue_depth,
            circuit_breaker_states: breaker_states,
        }
    }
}

fn push_bounded(ring: &mut VecDeque<f64>, value: f64) {
    if ring.len() >= SAMPLE_RING_CAPACITY {
        ring.pop_front();
    }
    ring.push_back(value);
}

fn push_bounded_i64(ring: &mut VecDeque<i64>, value: i64) {
    if ring.len() >= SAMPLE_RING_CAPACITY {
        ring.pop_front();
    }
    ring.push_back(value);
}

/// `pX(sorted) = sorted[ceil(|sorted| * X) - 1]`.
fn percentile(sorted: &[f64], x: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((sorted.len() as f64) * x).ceil() as usize;
    let index = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted[index]
}

fn percentiles(values: &[f64]) -> Percentiles {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).expect("metric samples are never NaN"));
    Percentiles { p50: percentile(&sorted, 0.50), p95: percentile(&sorted, 0.95), p99: percentile(&sorted, 0.99) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_snapshot_has_zeroed_percentiles_and_error_rate() {
        let collector = MetricsCollector::new();
        let snap = collector.snapshot();
        assert_eq!(snap.error_rate, 0.0);
        assert_eq!(snap.batch_size, Percentiles::default());
    }

    #[test]
    fn error_rate_divides_errors_by_total_requests() {
        let collector = MetricsCollector::new();
        collector.record_batch("fs", 10, true, 5.0);
        collector.record_batch("fs", 10, false, 5.0);
        collector.record_batch("fs", 10, false, 5.0);
        let snap = collector.snapshot();
        assert!((snap.error_rate - (2.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn percentile_matches_spec_formula() {
        let sorted = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&sorted, 0.5), 3.0);
        assert_eq!(percentile(&sorted, 0.99), 5.0);
    }

    #[test]
    fn breaker_state_is_reported_per_sink() {
        let collector = MetricsCollector::new();
        collector.record_circuit_breaker_state("http", "open");
        let snap = collector.snapshot();
        assert_eq!(snap.circuit_breaker_states.get("http"), Some(&"open".to_string()));
    }
}
