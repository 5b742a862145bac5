//! Quota tracker backed by DashMap. Counters are keyed per (tenant, period)
//! and reset lazily when the UTC calendar window rolls over. The
//! check-and-increment happens under the shard lock of the entry, so two
//! concurrent consumers can never both pass when one slot remains.

use chrono::{DateTime, Datelike, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Quota accounting period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaPeriod {
    Day,
    Month,
}

impl std::fmt::Display for QuotaPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuotaPeriod::Day => write!(f, "day"),
            QuotaPeriod::Month => write!(f, "month"),
        }
    }
}

#[derive(Debug, Clone)]
struct Counter {
    window: String,
    count: u64,
}

/// Per-tenant, per-period message counters.
pub struct QuotaTracker {
    counters: DashMap<(Uuid, QuotaPeriod), Counter>,
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new()
    }
}

fn window_key(period: QuotaPeriod, at: DateTime<Utc>) -> String {
    match period {
        QuotaPeriod::Day => format!("{:04}-{:02}-{:02}", at.year(), at.month(), at.day()),
        QuotaPeriod::Month => format!("{:04}-{:02}", at.year(), at.month()),
    }
}

impl QuotaTracker {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Atomically consume one message slot for the given period if the
    /// limit allows it. The counter resets when the calendar window rolls.
    pub fn try_consume(
        &self,
        tenant_id: Uuid,
        period: QuotaPeriod,
        limit: u64,
        at: DateTime<Utc>,
    ) -> bool {
        let key = window_key(period, at);
        let mut entry = self
            .counters
            .entry((tenant_id, period))
            .or_insert_with(|| Counter {
                window: key.clone(),
                count: 0,
            });

        if entry.window != key {
            entry.window = key;
            entry.count = 0;
        }

        if entry.count >= limit {
            return false;
        }
        entry.count += 1;
        true
    }

    /// Atomically consume one day slot and one month slot, or neither.
    /// Returns the first exhausted period on failure.
    pub fn try_consume_message(
        &self,
        tenant_id: Uuid,
        day_limit: u64,
        month_limit: u64,
        at: DateTime<Utc>,
    ) -> Result<(), QuotaPeriod> {
        if !self.try_consume(tenant_id, QuotaPeriod::Day, day_limit, at) {
            return Err(QuotaPeriod::Day);
        }
        if !self.try_consume(tenant_id, QuotaPeriod::Month, month_limit, at) {
            // Give the day slot back so the pair stays consistent.
            self.release(tenant_id, QuotaPeriod::Day, at);
            return Err(QuotaPeriod::Month);
        }
        Ok(())
    }

    /// Current usage for the window containing `at`.
    pub fn current_usage(&self, tenant_id: Uuid, period: QuotaPeriod, at: DateTime<Utc>) -> u64 {
        let key = window_key(period, at);
        self.counters
            .get(&(tenant_id, period))
            .filter(|c| c.window == key)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Return one day slot and one month slot. Used when a reserved send
    /// terminally fails so the failed attempt does not count against quota.
    pub fn release_message(&self, tenant_id: Uuid, at: DateTime<Utc>) {
        self.release(tenant_id, QuotaPeriod::Day, at);
        self.release(tenant_id, QuotaPeriod::Month, at);
    }

    fn release(&self, tenant_id: Uuid, period: QuotaPeriod, at: DateTime<Utc>) {
        let key = window_key(period, at);
        if let Some(mut entry) = self.counters.get_mut(&(tenant_id, period)) {
            if entry.window == key && entry.count > 0 {
                entry.count -= 1;
            }
        }
    }

    /// Drop all counters for a tenant (tenant purge).
    pub fn remove_for_tenant(&self, tenant_id: Uuid) {
        self.counters.remove(&(tenant_id, QuotaPeriod::Day));
        self.counters.remove(&(tenant_id, QuotaPeriod::Month));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    #[test]
    fn test_consume_up_to_limit() {
        let tracker = QuotaTracker::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        for _ in 0..5 {
            assert!(tracker.try_consume(tenant, QuotaPeriod::Day, 5, now));
        }
        assert!(!tracker.try_consume(tenant, QuotaPeriod::Day, 5, now));
        assert_eq!(tracker.current_usage(tenant, QuotaPeriod::Day, now), 5);
    }

    #[test]
    fn test_window_rollover_resets() {
        let tracker = QuotaTracker::new();
        let tenant = Uuid::new_v4();
        let day1 = Utc.with_ymd_and_hms(2026, 3, 10, 23, 0, 0).unwrap();
        let day2 = Utc.with_ymd_and_hms(2026, 3, 11, 0, 30, 0).unwrap();

        assert!(tracker.try_consume(tenant, QuotaPeriod::Day, 1, day1));
        assert!(!tracker.try_consume(tenant, QuotaPeriod::Day, 1, day1));

        // Next calendar day: fresh window.
        assert!(tracker.try_consume(tenant, QuotaPeriod::Day, 1, day2));
        assert_eq!(tracker.current_usage(tenant, QuotaPeriod::Day, day2), 1);
    }

    #[test]
    fn test_month_exhaustion_releases_day_slot() {
        let tracker = QuotaTracker::new();
        let tenant = Uuid::new_v4();
        let now = Utc::now();

        // Month limit of 1: second message fails on Month, day slot restored.
        assert!(tracker.try_consume_message(tenant, 10, 1, now).is_ok());
        assert_eq!(
            tracker.try_consume_message(tenant, 10, 1, now),
            Err(QuotaPeriod::Month)
        );
        assert_eq!(tracker.current_usage(tenant, QuotaPeriod::Day, now), 1);
        assert_eq!(tracker.current_usage(tenant, QuotaPeriod::Month, now), 1);
    }

    #[tokio::test]
    async fn test_concurrent_consume_never_exceeds_limit() {
        let tracker = Arc::new(QuotaTracker::new());
        let tenant = Uuid::new_v4();
        let now = Utc::now();
        let limit = 50u64;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                let mut granted = 0u64;
                for _ in 0..25 {
                    if tracker.try_consume(tenant, QuotaPeriod::Day, limit, now) {
                        granted += 1;
                    }
                }
                granted
            }));
        }

        let mut total = 0u64;
        for handle in handles {
            total += handle.await.unwrap();
        }

        assert_eq!(total, limit);
        assert_eq!(tracker.current_usage(tenant, QuotaPeriod::Day, now), limit);
    }
}
