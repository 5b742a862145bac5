//! Campaign progress sink — trait for emitting per-recipient progress
//! updates from the dispatch engine.
//!
//! The real-time presentation layer subscribes to these updates; the engine
//! only knows the fire-and-forget `ProgressSink` contract.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// One aggregate progress snapshot for a campaign.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub campaign_id: Uuid,
    pub tenant_id: Uuid,
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total: u64,
    pub timestamp: DateTime<Utc>,
}

/// Trait for receiving progress updates. Implementations route updates to
/// a websocket fan-out, message bus, or nothing at all.
pub trait ProgressSink: Send + Sync {
    fn publish(&self, update: ProgressUpdate);
}

/// No-op sink for tests and headless runs.
pub struct NoOpSink;

impl ProgressSink for NoOpSink {
    fn publish(&self, _update: ProgressUpdate) {}
}

/// In-memory sink that captures updates for testing.
#[derive(Default)]
pub struct CaptureSink {
    updates: Mutex<Vec<ProgressUpdate>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.updates.lock().len()
    }

    pub fn last_for(&self, campaign_id: Uuid) -> Option<ProgressUpdate> {
        self.updates
            .lock()
            .iter()
            .rev()
            .find(|u| u.campaign_id == campaign_id)
            .cloned()
    }

    pub fn clear(&self) {
        self.updates.lock().clear();
    }
}

impl ProgressSink for CaptureSink {
    fn publish(&self, update: ProgressUpdate) {
        self.updates.lock().push(update);
    }
}

/// Convenience: no-op sink for modules that don't need progress output.
pub fn noop_sink() -> Arc<dyn ProgressSink> {
    Arc::new(NoOpSink)
}

/// Convenience: capture sink for tests.
pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(campaign_id: Uuid, sent: u64) -> ProgressUpdate {
        ProgressUpdate {
            campaign_id,
            tenant_id: Uuid::new_v4(),
            sent,
            failed: 0,
            skipped: 0,
            total: 10,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_capture_sink() {
        let sink = capture_sink();
        let campaign = Uuid::new_v4();

        sink.publish(update(campaign, 1));
        sink.publish(update(campaign, 2));
        sink.publish(update(Uuid::new_v4(), 5));

        assert_eq!(sink.count(), 3);
        assert_eq!(sink.last_for(campaign).unwrap().sent, 2);
    }

    #[test]
    fn test_noop_sink() {
        let sink = noop_sink();
        // Should not panic
        sink.publish(update(Uuid::new_v4(), 1));
    }
}
