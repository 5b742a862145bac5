//! Renewal notification seam. The payment worker only knows this
//! contract; mail/webhook senders live behind it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::info;
use uuid::Uuid;

/// One reminder that a payment is coming due.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenewalNotice {
    pub tenant_id: Uuid,
    pub due_at: DateTime<Utc>,
    /// Days-before-due bucket this notice belongs to (3, 2 or 1).
    pub days_before: u32,
}

pub trait RenewalNotifier: Send + Sync {
    fn notify(&self, notice: RenewalNotice);
}

/// Default notifier that only logs. Stands in until a mail or webhook
/// integration is wired up.
pub struct LogNotifier;

impl RenewalNotifier for LogNotifier {
    fn notify(&self, notice: RenewalNotice) {
        info!(
            tenant_id = %notice.tenant_id,
            due_at = %notice.due_at,
            days_before = notice.days_before,
            "Payment renewal reminder"
        );
    }
}

/// Test notifier that records every notice.
#[derive(Default)]
pub struct CaptureNotifier {
    notices: Mutex<Vec<RenewalNotice>>,
}

impl CaptureNotifier {
    pub fn notices(&self) -> Vec<RenewalNotice> {
        self.notices.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.notices.lock().len()
    }
}

impl RenewalNotifier for CaptureNotifier {
    fn notify(&self, notice: RenewalNotice) {
        self.notices.lock().push(notice);
    }
}

pub fn capture_notifier() -> Arc<CaptureNotifier> {
    Arc::new(CaptureNotifier::default())
}
