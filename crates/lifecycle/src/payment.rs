//! Payment renewal sweep. Paid accounts get reminders at three, two and
//! one days before their due date, are blocked once overdue, and are
//! purged after the grace window.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashSet;
use tracing::{debug, info};
use uuid::Uuid;

use wavesend_core::config::LifecycleConfig;
use wavesend_tenancy::TenantStatus;

use crate::notify::{RenewalNotice, RenewalNotifier};
use crate::purge::TenantResources;

/// Reminder buckets in days before the due date.
const REMINDER_DAYS: [u32; 3] = [1, 2, 3];

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentSweepOutcome {
    pub notified: usize,
    pub blocked: usize,
    pub purged: usize,
}

/// Periodic worker over all paid accounts.
pub struct PaymentRenewalWorker {
    config: LifecycleConfig,
    resources: TenantResources,
    notifier: Arc<dyn RenewalNotifier>,
    // One reminder per (tenant, due date, bucket) no matter how often
    // the sweep runs.
    sent_reminders: DashSet<(Uuid, DateTime<Utc>, u32)>,
}

impl PaymentRenewalWorker {
    pub fn new(
        config: LifecycleConfig,
        resources: TenantResources,
        notifier: Arc<dyn RenewalNotifier>,
    ) -> Self {
        Self {
            config,
            resources,
            notifier,
            sent_reminders: DashSet::new(),
        }
    }

    /// One sweep at instant `now`.
    pub fn run(&self, now: DateTime<Utc>) -> PaymentSweepOutcome {
        let mut outcome = PaymentSweepOutcome::default();
        let grace = Duration::days(i64::from(self.config.grace_days));

        for tenant in self.resources.tenants.list_tenants() {
            if tenant.is_trial {
                continue;
            }

            match tenant.status {
                TenantStatus::Active => {
                    let Some(due_at) = tenant.payment_due_at else {
                        continue;
                    };
                    if now >= due_at {
                        info!(
                            tenant_id = %tenant.id,
                            due_at = %due_at,
                            "Payment overdue, blocking tenant"
                        );
                        self.resources.tenants.set_status(tenant.id, TenantStatus::Blocked);
                        // Grace countdown starts at the missed due date.
                        self.resources.tenants.set_blocked_at(tenant.id, due_at);
                        outcome.blocked += 1;
                    } else if self.remind(tenant.id, due_at, now) {
                        outcome.notified += 1;
                    }
                }
                TenantStatus::Blocked => {
                    let Some(blocked_at) = tenant.blocked_at else {
                        continue;
                    };
                    if now >= blocked_at + grace {
                        self.resources.purge_tenant(tenant.id);
                        outcome.purged += 1;
                    } else {
                        debug!(
                            tenant_id = %tenant.id,
                            purge_at = %(blocked_at + grace),
                            "Overdue tenant still inside grace window"
                        );
                    }
                }
                TenantStatus::Trial | TenantStatus::Deleted => {}
            }
        }

        outcome
    }

    /// Send at most one reminder for the tightest matching bucket.
    fn remind(&self, tenant_id: Uuid, due_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        let remaining = due_at - now;
        let Some(&days_before) = REMINDER_DAYS
            .iter()
            .find(|&&d| remaining <= Duration::days(i64::from(d)))
        else {
            return false;
        };

        if !self.sent_reminders.insert((tenant_id, due_at, days_before)) {
            return false;
        }
        self.notifier.notify(RenewalNotice {
            tenant_id,
            due_at,
            days_before,
        });
        true
    }
}
