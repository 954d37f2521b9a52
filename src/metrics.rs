//! Runtime instrumentation for the fetch pipeline
//!
//! Counters and bounded sample windows covering call attempts, cache
//! hits/misses, latencies, and errors. Recording is purely observational:
//! it never fails, never blocks, and never alters control flow. The
//! recorder is an explicitly constructed value injected into whatever
//! needs it, so tests get isolated instances instead of process globals.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;

/// Number of latency samples retained for the moving statistics
const LATENCY_WINDOW: usize = 100;

/// Number of recent error descriptions retained
const ERROR_WINDOW: usize = 10;

/// Average latency above which the performance score loses 20 points
const SLOW_LATENCY_MS: f64 = 1000.0;

/// Average latency above which the performance score loses a further 10 points
const VERY_SLOW_LATENCY_MS: f64 = 2000.0;

#[derive(Debug, Default)]
struct MetricsInner {
    total_calls: u64,
    calls_by_endpoint: HashMap<String, u64>,
    cache_hits: u64,
    cache_misses: u64,
    error_count: u64,
    /// Most recent latency samples, oldest at the front
    latencies: VecDeque<Duration>,
    /// Most recent error descriptions, oldest at the front
    recent_errors: VecDeque<String>,
}

/// Point-in-time report derived from the recorded counters
///
/// Latency statistics cover only the most recent [`LATENCY_WINDOW`]
/// samples, giving an approximate moving view rather than a lifetime
/// average.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Fetch-cycle attempts recorded so far
    pub total_calls: u64,
    /// Attempts broken down by endpoint label
    pub calls_by_endpoint: HashMap<String, u64>,
    /// Cache lookups served from a live entry
    pub cache_hits: u64,
    /// Cache lookups that found nothing usable
    pub cache_misses: u64,
    /// Percentage of cache lookups that hit, 0-100
    pub cache_hit_rate: f64,
    /// Errors recorded so far
    pub error_count: u64,
    /// Errors per call attempt, 0.0-1.0; 0 when no calls have been made
    pub error_rate: f64,
    /// Average latency over the sample window, in milliseconds
    pub avg_latency_ms: f64,
    /// Fastest sample in the window, in milliseconds
    pub min_latency_ms: f64,
    /// Slowest sample in the window, in milliseconds
    pub max_latency_ms: f64,
    /// Most recent error descriptions, oldest first
    pub recent_errors: Vec<String>,
    /// Composite health score in 0-100
    pub performance_score: f64,
}

/// Recorder for fetch-pipeline metrics
///
/// Cloning produces another handle to the same counters, so a fetcher and
/// its dashboard can share one recorder.
#[derive(Debug, Clone, Default)]
pub struct MetricsRecorder {
    inner: Arc<Mutex<MetricsInner>>,
}

impl MetricsRecorder {
    /// Creates a recorder with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MetricsInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Counts one fetch-cycle attempt against an endpoint label.
    ///
    /// Attempts are counted when a cycle starts, before any round trip
    /// exists, so short-circuited cycles (missing configuration, demo
    /// mode) are included. Round-trip timing arrives separately through
    /// [`record_latency`](Self::record_latency).
    pub fn record_call(&self, endpoint: &str) {
        let mut inner = self.lock();
        inner.total_calls += 1;
        *inner.calls_by_endpoint.entry(endpoint.to_string()).or_insert(0) += 1;
    }

    /// Counts a cache lookup served from a live entry
    pub fn record_cache_hit(&self) {
        self.lock().cache_hits += 1;
    }

    /// Counts a cache lookup that found nothing usable
    pub fn record_cache_miss(&self) {
        self.lock().cache_misses += 1;
    }

    /// Adds a latency sample to the bounded window, dropping the oldest
    /// sample once the window is full
    pub fn record_latency(&self, latency: Duration) {
        let mut inner = self.lock();
        inner.latencies.push_back(latency);
        while inner.latencies.len() > LATENCY_WINDOW {
            inner.latencies.pop_front();
        }
    }

    /// Records an error occurrence with its surrounding context.
    ///
    /// The description ring keeps the most recent [`ERROR_WINDOW`]
    /// entries; older ones are dropped.
    pub fn record_error(&self, reason: &str, context: &str) {
        let mut inner = self.lock();
        inner.error_count += 1;
        inner.recent_errors.push_back(format!("{}: {}", context, reason));
        while inner.recent_errors.len() > ERROR_WINDOW {
            inner.recent_errors.pop_front();
        }
    }

    /// Resets every counter and window to its initial state
    pub fn reset(&self) {
        let mut inner = self.lock();
        *inner = MetricsInner::default();
    }

    /// Derives the current report from the recorded counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.lock();

        let lookups = inner.cache_hits + inner.cache_misses;
        let cache_hit_rate = if lookups == 0 {
            0.0
        } else {
            let rate = inner.cache_hits as f64 / lookups as f64 * 100.0;
            (rate * 100.0).round() / 100.0
        };

        let error_rate = if inner.total_calls == 0 {
            0.0
        } else {
            inner.error_count as f64 / inner.total_calls as f64
        };

        let samples_ms: Vec<f64> = inner
            .latencies
            .iter()
            .map(|d| d.as_secs_f64() * 1000.0)
            .collect();
        let avg_latency_ms = if samples_ms.is_empty() {
            0.0
        } else {
            samples_ms.iter().sum::<f64>() / samples_ms.len() as f64
        };
        let min_latency_ms = samples_ms.iter().copied().fold(f64::INFINITY, f64::min);
        let max_latency_ms = samples_ms.iter().copied().fold(0.0, f64::max);
        let min_latency_ms = if min_latency_ms.is_finite() {
            min_latency_ms
        } else {
            0.0
        };

        MetricsSnapshot {
            total_calls: inner.total_calls,
            calls_by_endpoint: inner.calls_by_endpoint.clone(),
            cache_hits: inner.cache_hits,
            cache_misses: inner.cache_misses,
            cache_hit_rate,
            error_count: inner.error_count,
            error_rate,
            avg_latency_ms,
            min_latency_ms,
            max_latency_ms,
            recent_errors: inner.recent_errors.iter().cloned().collect(),
            performance_score: performance_score(error_rate, avg_latency_ms, cache_hit_rate),
        }
    }
}

/// Computes the composite health score.
///
/// Starts at 100; loses 10 points per percentage point of error rate;
/// loses 20 points when average latency exceeds 1000 ms and a further 10
/// past 2000 ms; gains 10 points when the cache hit rate exceeds 70% and
/// a further 10 past 90%. The result is clamped to 0-100.
fn performance_score(error_rate: f64, avg_latency_ms: f64, cache_hit_rate: f64) -> f64 {
    let mut score = 100.0;

    score -= 10.0 * (error_rate * 100.0);

    if avg_latency_ms > SLOW_LATENCY_MS {
        score -= 20.0;
    }
    if avg_latency_ms > VERY_SLOW_LATENCY_MS {
        score -= 10.0;
    }

    if cache_hit_rate > 70.0 {
        score += 10.0;
    }
    if cache_hit_rate > 90.0 {
        score += 10.0;
    }

    score.clamp(0.0, 100.0)
}
