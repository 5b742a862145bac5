//! Restriction cleanup worker — one periodic sweep that physically removes
//! expired restriction entries. A missed cycle is corrected by the next
//! one; errors are logged and never fatal.

use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

use crate::list::RestrictionList;

/// Periodic sweep over the restriction list. Scheduled hourly; `run` is
/// also safe to invoke directly for a one-shot sweep.
pub struct RestrictionCleanupWorker {
    list: Arc<RestrictionList>,
}

impl RestrictionCleanupWorker {
    pub fn new(list: Arc<RestrictionList>) -> Self {
        Self { list }
    }

    /// Perform one sweep. Returns the number of entries removed.
    pub fn run(&self) -> usize {
        let removed = self.list.purge_expired(Utc::now());
        if removed > 0 {
            info!(removed, "restriction cleanup sweep removed expired entries");
        } else {
            debug!("restriction cleanup sweep found nothing to remove");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::list::RestrictionReason;
    use chrono::Duration;
    use uuid::Uuid;

    #[test]
    fn test_sweep_removes_only_expired() {
        let list = Arc::new(RestrictionList::new());
        let tenant = Uuid::new_v4();

        list.add(tenant, "+5511999990001", RestrictionReason::UserOptOut, None);

        // Inject an already-expired entry through the public API is not
        // possible (ttl is relative), so purge against a future instant.
        let expiring = list.add(tenant, "+5511999990002", RestrictionReason::Regulatory, Some(1));
        let after = expiring.expires_at.unwrap() + Duration::seconds(1);
        assert_eq!(list.purge_expired(after), 1);

        // A fresh worker sweep with nothing expired is a no-op.
        let worker = RestrictionCleanupWorker::new(list.clone());
        assert_eq!(worker.run(), 0);
        assert_eq!(list.count(), 1);
    }
}
