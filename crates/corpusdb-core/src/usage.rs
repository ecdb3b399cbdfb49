//! Daily usage accounting.
//!
//! An explicitly injected tracker rather than hidden module state: the
//! embed client records tokens, the consensus validator records provider
//! spend, and both counters reset when the UTC calendar date rolls over.

use chrono::{NaiveDate, Utc};
use std::sync::Mutex;

#[derive(Debug)]
struct DayWindow {
    date: NaiveDate,
    tokens: u64,
    cost: f64,
}

#[derive(Debug)]
pub struct UsageTracker {
    inner: Mutex<DayWindow>,
}

impl Default for UsageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageTracker {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(DayWindow {
                date: Utc::now().date_naive(),
                tokens: 0,
                cost: 0.0,
            }),
        }
    }

    pub fn record_tokens(&self, tokens: u64) {
        self.record_tokens_on(Utc::now().date_naive(), tokens);
    }

    pub fn record_cost(&self, cost: f64) {
        self.record_cost_on(Utc::now().date_naive(), cost);
    }

    pub fn tokens_today(&self) -> u64 {
        self.window_for(Utc::now().date_naive(), |w| w.tokens)
    }

    pub fn cost_today(&self) -> f64 {
        self.window_for(Utc::now().date_naive(), |w| w.cost)
    }

    fn record_tokens_on(&self, date: NaiveDate, tokens: u64) {
        let mut guard = self.lock();
        Self::roll(&mut guard, date);
        guard.tokens += tokens;
    }

    fn record_cost_on(&self, date: NaiveDate, cost: f64) {
        let mut guard = self.lock();
        Self::roll(&mut guard, date);
        guard.cost += cost;
    }

    fn window_for<T>(&self, date: NaiveDate, read: impl Fn(&DayWindow) -> T) -> T {
        let mut guard = self.lock();
        Self::roll(&mut guard, date);
        read(&guard)
    }

    fn roll(window: &mut DayWindow, today: NaiveDate) {
        if window.date != today {
            window.date = today;
            window.tokens = 0;
            window.cost = 0.0;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DayWindow> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
