//! Per-provider daily request counters.
//!
//! The tracker is advisory: it never blocks a call, it only tells the
//! orchestrator that a provider has reached its declared daily quota. Counters
//! are process-local, so with several worker processes each keeps its own view.

use chrono::{Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Source of the current UTC date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Clock pinned to a settable date, for tests.
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    pub fn new(date: NaiveDate) -> Self {
        Self { date: Mutex::new(date) }
    }

    pub fn set(&self, date: NaiveDate) {
        *self.date.lock().unwrap_or_else(|e| e.into_inner()) = date;
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Daily request limit for models whose name contains `model_pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelQuota {
    pub model_pattern: String,
    pub limit: u32,
}

impl ModelQuota {
    pub fn new(model_pattern: impl Into<String>, limit: u32) -> Self {
        Self { model_pattern: model_pattern.into(), limit }
    }

    fn matches(&self, model: &str) -> bool {
        model.to_lowercase().contains(&self.model_pattern.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CounterKey {
    provider: String,
    model: String,
    date: NaiveDate,
}

pub struct RateTracker {
    counters: Mutex<HashMap<CounterKey, u32>>,
    /// Day of the last sweep done by `increment`.
    swept_on: Mutex<Option<NaiveDate>>,
    quotas: HashMap<String, Vec<ModelQuota>>,
    clock: Arc<dyn Clock>,
}

impl Default for RateTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RateTracker {
    /// Counters are dropped once they are older than this many days.
    pub const RETENTION_DAYS: u64 = 2;

    pub fn new() -> Self {
        Self {
            counters: Mutex::new(HashMap::new()),
            swept_on: Mutex::new(None),
            quotas: HashMap::new(),
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Declare quotas for a provider. The first matching pattern wins.
    #[must_use]
    pub fn with_quotas(mut self, provider: impl Into<String>, quotas: Vec<ModelQuota>) -> Self {
        self.quotas.insert(provider.into(), quotas);
        self
    }

    /// The daily limit that applies to `(provider, model)`, if any.
    pub fn limit_for(&self, provider: &str, model: &str) -> Option<u32> {
        self.quotas.get(provider)?.iter().find(|q| q.matches(model)).map(|q| q.limit)
    }

    /// Record one request. The first increment of a new day also drops
    /// stale counters, as [`Self::cleanup`] does.
    pub fn increment(&self, provider: &str, model: &str) {
        let key = self.key(provider, model);
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        let mut swept_on = self.swept_on.lock().unwrap_or_else(|e| e.into_inner());
        if *swept_on != Some(key.date) {
            retain_recent(&mut counters, key.date);
            *swept_on = Some(key.date);
        }
        *counters.entry(key).or_insert(0) += 1;
    }

    /// Requests recorded today for `(provider, model)`.
    pub fn count(&self, provider: &str, model: &str) -> u32 {
        let key = self.key(provider, model);
        self.counters.lock().unwrap_or_else(|e| e.into_inner()).get(&key).copied().unwrap_or(0)
    }

    /// `true` when today's count has reached the declared limit.
    /// Providers without declared quotas are never skipped.
    pub fn should_skip(&self, provider: &str, model: &str) -> bool {
        match self.limit_for(provider, model) {
            Some(limit) => self.count(provider, model) >= limit,
            None => false,
        }
    }

    /// Drop counters dated more than [`Self::RETENTION_DAYS`] before today.
    pub fn cleanup(&self) {
        let today = self.clock.today();
        let mut counters = self.counters.lock().unwrap_or_else(|e| e.into_inner());
        retain_recent(&mut counters, today);
    }

    fn key(&self, provider: &str, model: &str) -> CounterKey {
        CounterKey { provider: provider.to_string(), model: model.to_string(), date: self.clock.today() }
    }

    #[cfg(test)]
    fn counter_len(&self) -> usize {
        self.counters.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

fn retain_recent(counters: &mut HashMap<CounterKey, u32>, today: NaiveDate) {
    let cutoff = today.checked_sub_days(Days::new(RateTracker::RETENTION_DAYS)).unwrap_or(today);
    let before = counters.len();
    counters.retain(|key, _| key.date >= cutoff);
    let removed = before - counters.len();
    if removed > 0 {
        tracing::debug!(removed, "Dropped stale rate counters");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn gemini_tracker(clock: Arc<FixedClock>) -> RateTracker {
        RateTracker::new()
            .with_clock(clock)
            .with_quotas("gemini", vec![ModelQuota::new("flash", 3), ModelQuota::new("pro", 1)])
    }

    #[test]
    fn test_increment_and_count() {
        let tracker = gemini_tracker(Arc::new(FixedClock::new(date(2025, 3, 1))));
        assert_eq!(tracker.count("gemini", "gemini-2.0-flash"), 0);
        tracker.increment("gemini", "gemini-2.0-flash");
        tracker.increment("gemini", "gemini-2.0-flash");
        assert_eq!(tracker.count("gemini", "gemini-2.0-flash"), 2);
        assert_eq!(tracker.count("gemini", "gemini-2.5-pro"), 0);
    }

    #[test]
    fn test_should_skip_uses_matching_quota() {
        let tracker = gemini_tracker(Arc::new(FixedClock::new(date(2025, 3, 1))));
        assert!(!tracker.should_skip("gemini", "gemini-2.5-pro"));
        tracker.increment("gemini", "gemini-2.5-pro");
        assert!(tracker.should_skip("gemini", "gemini-2.5-pro"));
        assert!(!tracker.should_skip("gemini", "gemini-2.0-flash"));
    }

    #[test]
    fn test_provider_without_quota_is_never_skipped() {
        let tracker = RateTracker::new();
        for _ in 0..100 {
            tracker.increment("groq", "llama-3.3-70b-versatile");
        }
        assert!(!tracker.should_skip("groq", "llama-3.3-70b-versatile"));
    }

    #[test]
    fn test_counters_reset_on_new_day() {
        let clock = Arc::new(FixedClock::new(date(2025, 3, 1)));
        let tracker = gemini_tracker(clock.clone());
        tracker.increment("gemini", "gemini-2.5-pro");
        assert!(tracker.should_skip("gemini", "gemini-2.5-pro"));

        clock.set(date(2025, 3, 2));
        assert_eq!(tracker.count("gemini", "gemini-2.5-pro"), 0);
        assert!(!tracker.should_skip("gemini", "gemini-2.5-pro"));
    }

    #[test]
    fn test_cleanup_drops_counters_older_than_two_days() {
        let clock = Arc::new(FixedClock::new(date(2025, 3, 1)));
        let tracker = gemini_tracker(clock.clone());
        tracker.increment("gemini", "flash");
        clock.set(date(2025, 3, 3));
        tracker.increment("gemini", "flash");
        tracker.cleanup();
        assert_eq!(tracker.counter_len(), 2);

        clock.set(date(2025, 3, 4));
        tracker.cleanup();
        assert_eq!(tracker.counter_len(), 1);
    }

    #[test]
    fn test_increment_sweeps_stale_counters_on_day_change() {
        let clock = Arc::new(FixedClock::new(date(2025, 3, 1)));
        let tracker = gemini_tracker(clock.clone());
        tracker.increment("gemini", "flash");
        tracker.increment("gemini", "pro");

        clock.set(date(2025, 3, 3));
        tracker.increment("gemini", "flash");
        assert_eq!(tracker.counter_len(), 3);

        clock.set(date(2025, 3, 4));
        tracker.increment("gemini", "flash");
        assert_eq!(tracker.counter_len(), 2);
        assert_eq!(tracker.count("gemini", "flash"), 1);

        clock.set(date(2025, 3, 30));
        tracker.increment("gemini", "pro");
        assert_eq!(tracker.counter_len(), 1);
    }
}
