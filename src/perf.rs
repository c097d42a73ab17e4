// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Performance helpers: timing samples, a bounded memo cache, throttle and
//! debounce, and virtual-scroll arithmetic.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::hash::Hash;
use std::ops::RangeInclusive;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Samples kept per metric.
const MAX_SAMPLES: usize = 100;

/// Default capacity of [`MemoCache`].
pub const MEMO_CACHE_CAPACITY: usize = 100;

/// Summary of the retained samples for one metric.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricStats {
    pub count: usize,
    pub avg_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
    pub median_ms: f64,
}

/// Per-metric ring of the most recent timing samples.
#[derive(Debug, Default)]
pub struct PerformanceMonitor {
    metrics: DashMap<String, VecDeque<Duration>>,
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, name: &str, sample: Duration) {
        let mut samples = self.metrics.entry(name.to_string()).or_default();
        if samples.len() == MAX_SAMPLES {
            samples.pop_front();
        }
        samples.push_back(sample);
    }

    /// Time a synchronous computation.
    pub fn measure<T>(&self, name: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let result = f();
        self.record(name, start.elapsed());
        result
    }

    /// Time a fallible future. Failures are recorded under `<name>_error`.
    pub async fn measure_async<T, E, F>(&self, name: &str, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
    {
        let start = Instant::now();
        let result = fut.await;
        let elapsed = start.elapsed();

        match &result {
            Ok(_) => self.record(name, elapsed),
            Err(_) => self.record(&format!("{}_error", name), elapsed),
        }
        tracing::trace!(
            metric = name,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            ok = result.is_ok(),
            "Measured"
        );
        result
    }

    pub fn stats(&self, name: &str) -> Option<MetricStats> {
        let samples = self.metrics.get(name)?;
        if samples.is_empty() {
            return None;
        }

        let mut ms: Vec<f64> = samples.iter().map(|d| d.as_secs_f64() * 1000.0).collect();
        ms.sort_by(f64::total_cmp);

        let count = ms.len();
        Some(MetricStats {
            count,
            avg_ms: ms.iter().sum::<f64>() / count as f64,
            min_ms: ms[0],
            max_ms: ms[count - 1],
            median_ms: ms[count / 2],
        })
    }

    /// Stats for every metric with samples, keyed by name.
    pub fn snapshot(&self) -> HashMap<String, MetricStats> {
        let names: Vec<String> = self.metrics.iter().map(|e| e.key().clone()).collect();
        names
            .into_iter()
            .filter_map(|name| self.stats(&name).map(|s| (name, s)))
            .collect()
    }

    pub fn clear(&self) {
        self.metrics.clear();
    }
}

/// Bounded cache that evicts the oldest inserted key when full.
#[derive(Debug)]
pub struct MemoCache<K, V> {
    capacity: usize,
    order: VecDeque<K>,
    entries: HashMap<K, V>,
}

impl<K: Eq + Hash + Clone, V> Default for MemoCache<K, V> {
    fn default() -> Self {
        Self::with_capacity(MEMO_CACHE_CAPACITY)
    }
}

impl<K: Eq + Hash + Clone, V> MemoCache<K, V> {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    pub fn insert(&mut self, key: K, value: V) {
        if self.entries.contains_key(&key) {
            self.entries.insert(key, value);
            return;
        }
        if self.entries.len() >= self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, value);
    }

    pub fn get(&self, key: &K) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.order.retain(|k| k != key);
        self.entries.remove(key)
    }

    /// Cached value for `key`, computing and storing it on a miss.
    pub fn get_or_insert_with(&mut self, key: K, compute: impl FnOnce() -> V) -> &V {
        if !self.entries.contains_key(&key) {
            let value = compute();
            self.insert(key.clone(), value);
        }
        &self.entries[&key]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.entries.clear();
    }
}

/// Leading-edge throttle: lets a call through at most once per `interval`.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    /// True if a call may run now; records the call when it may.
    pub fn ready(&mut self) -> bool {
        self.ready_at(Instant::now())
    }

    fn ready_at(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

/// Trailing-edge debouncer: only the last call within `delay` runs.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    /// Schedule `task` after the delay, cancelling any call still waiting.
    pub fn call<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drop any call still waiting.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Which rows of a fixed-height list fall inside the viewport.
#[derive(Debug, Clone)]
pub struct VirtualScroller<T> {
    container_height: f64,
    item_height: f64,
    items: Vec<T>,
    scroll_top: f64,
}

impl<T> VirtualScroller<T> {
    pub fn new(container_height: f64, item_height: f64, items: Vec<T>) -> Self {
        Self {
            container_height,
            item_height: item_height.max(f64::EPSILON),
            items,
            scroll_top: 0.0,
        }
    }

    pub fn set_scroll_top(&mut self, scroll_top: f64) {
        self.scroll_top = scroll_top.max(0.0);
    }

    /// Indices of the visible rows plus one row of overscan, or `None` for an
    /// empty list.
    pub fn visible_range(&self) -> Option<RangeInclusive<usize>> {
        let last = self.items.len().checked_sub(1)?;
        let start = ((self.scroll_top / self.item_height).floor() as usize).min(last);
        let span = (self.container_height / self.item_height).ceil() as usize + 1;
        Some(start..=(start + span).min(last))
    }

    /// Visible rows with their list indices.
    pub fn visible_items(&self) -> Vec<(usize, &T)> {
        match self.visible_range() {
            Some(range) => range.map(|i| (i, &self.items[i])).collect(),
            None => Vec::new(),
        }
    }

    pub fn total_height(&self) -> f64 {
        self.items.len() as f64 * self.item_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_monitor_keeps_last_samples() {
        let monitor = PerformanceMonitor::new();
        for ms in 1..=150 {
            monitor.record("query", Duration::from_millis(ms));
        }

        let stats = monitor.stats("query").unwrap();
        assert_eq!(stats.count, MAX_SAMPLES);
        assert!((stats.min_ms - 51.0).abs() < 1e-6);
        assert!((stats.max_ms - 150.0).abs() < 1e-6);
        assert!((stats.median_ms - 101.0).abs() < 1e-6);
        assert!(monitor.stats("missing").is_none());
    }

    #[tokio::test]
    async fn test_measure_async_records_errors_separately() {
        let monitor = PerformanceMonitor::new();

        let ok: Result<u32, &str> = monitor.measure_async("load", async { Ok(1) }).await;
        let err: Result<u32, &str> = monitor.measure_async("load", async { Err("boom") }).await;

        assert_eq!(ok, Ok(1));
        assert!(err.is_err());
        assert_eq!(monitor.stats("load").unwrap().count, 1);
        assert_eq!(monitor.stats("load_error").unwrap().count, 1);
        assert_eq!(monitor.snapshot().len(), 2);
    }

    #[test]
    fn test_memo_cache_evicts_oldest() {
        let mut cache = MemoCache::with_capacity(2);
        cache.insert("a", 1);
        cache.insert("b", 2);
        cache.insert("a", 10);
        cache.insert("c", 3);

        assert!(!cache.contains(&"a"));
        assert_eq!(cache.get(&"b"), Some(&2));
        assert_eq!(cache.get(&"c"), Some(&3));
        assert_eq!(cache.len(), 2);

        let mut calls = 0;
        assert_eq!(*cache.get_or_insert_with("c", || { calls += 1; 99 }), 3);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_throttle_leading_edge() {
        let mut throttle = Throttle::new(Duration::from_millis(100));
        let now = Instant::now();

        assert!(throttle.ready_at(now));
        assert!(!throttle.ready_at(now + Duration::from_millis(50)));
        assert!(throttle.ready_at(now + Duration::from_millis(150)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_debouncer_runs_last_call_only() {
        let debouncer = Debouncer::new(Duration::from_millis(300));
        let runs = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicUsize::new(0));

        for i in 1..=3 {
            let runs = runs.clone();
            let last = last.clone();
            debouncer.call(async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_virtual_scroller_window() {
        let mut scroller = VirtualScroller::new(100.0, 20.0, (0..50).collect::<Vec<_>>());
        assert_eq!(scroller.visible_range(), Some(0..=6));
        assert_eq!(scroller.total_height(), 1000.0);

        scroller.set_scroll_top(950.0);
        assert_eq!(scroller.visible_range(), Some(47..=49));
        assert_eq!(scroller.visible_items().first(), Some(&(47, &47)));

        let empty: VirtualScroller<u8> = VirtualScroller::new(100.0, 20.0, Vec::new());
        assert_eq!(empty.visible_range(), None);
    }
}
