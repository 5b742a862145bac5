//! Trial lifecycle sweep. Expired trials are blocked immediately and
//! purged after the retention window, unless a payment arrives in
//! between.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use wavesend_core::config::LifecycleConfig;
use wavesend_tenancy::TenantStatus;

use crate::purge::TenantResources;

/// Counters from one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrialSweepOutcome {
    pub blocked: usize,
    pub purged: usize,
}

/// Periodic worker over all trial accounts.
pub struct TrialLifecycleWorker {
    config: LifecycleConfig,
    resources: TenantResources,
}

impl TrialLifecycleWorker {
    pub fn new(config: LifecycleConfig, resources: TenantResources) -> Self {
        Self { config, resources }
    }

    /// One sweep at instant `now`.
    pub fn run(&self, now: DateTime<Utc>) -> TrialSweepOutcome {
        let mut outcome = TrialSweepOutcome::default();
        let retention = Duration::days(i64::from(self.config.retention_days));

        for tenant in self.resources.tenants.list_tenants() {
            if !tenant.is_trial {
                continue;
            }

            match tenant.status {
                TenantStatus::Trial => {
                    let Some(ends_at) = tenant.trial_ends_at else {
                        continue;
                    };
                    if now >= ends_at {
                        info!(
                            tenant_id = %tenant.id,
                            trial_ended_at = %ends_at,
                            "Trial expired, blocking tenant"
                        );
                        self.resources.tenants.set_status(tenant.id, TenantStatus::Blocked);
                        // Anchor the retention countdown at the trial end,
                        // not at sweep time, so the purge date does not
                        // drift with sweep cadence.
                        self.resources.tenants.set_blocked_at(tenant.id, ends_at);
                        outcome.blocked += 1;
                    }
                }
                TenantStatus::Blocked => {
                    let Some(blocked_at) = tenant.blocked_at else {
                        continue;
                    };
                    if now >= blocked_at + retention {
                        self.resources.purge_tenant(tenant.id);
                        outcome.purged += 1;
                    } else {
                        debug!(
                            tenant_id = %tenant.id,
                            purge_at = %(blocked_at + retention),
                            "Blocked trial still inside retention window"
                        );
                    }
                }
                TenantStatus::Active | TenantStatus::Deleted => {}
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use wavesend_dispatch::CampaignStore;
    use wavesend_quota::QuotaTracker;
    use wavesend_restriction::{RestrictionList, RestrictionReason};
    use wavesend_tenancy::{ConnectionKind, ConnectionRegistry, TenantRegistry};

    fn resources() -> TenantResources {
        TenantResources {
            tenants: Arc::new(TenantRegistry::new()),
            connections: Arc::new(ConnectionRegistry::new()),
            campaigns: Arc::new(CampaignStore::new()),
            restrictions: Arc::new(RestrictionList::new()),
            quota: Arc::new(QuotaTracker::new()),
        }
    }

    fn worker(resources: &TenantResources) -> TrialLifecycleWorker {
        TrialLifecycleWorker::new(LifecycleConfig::default(), resources.clone())
    }

    #[test]
    fn test_expired_trial_is_blocked_not_deleted() {
        let res = resources();
        let worker = worker(&res);
        let tenant = res.tenants.create_tenant("Acme", 7);
        let ended = Utc::now() - chrono::Duration::minutes(1);
        res.tenants.set_trial_ends_at(tenant.id, ended);

        let outcome = worker.run(Utc::now());

        assert_eq!(outcome, TrialSweepOutcome { blocked: 1, purged: 0 });
        let tenant = res.tenants.get_tenant(tenant.id).unwrap();
        assert_eq!(tenant.status, TenantStatus::Blocked);
        assert_eq!(tenant.blocked_at, Some(ended));
        assert!(!tenant.can_send());
    }

    #[test]
    fn test_active_trial_untouched() {
        let res = resources();
        let worker = worker(&res);
        let tenant = res.tenants.create_tenant("Acme", 7);

        let outcome = worker.run(Utc::now());

        assert_eq!(outcome, TrialSweepOutcome::default());
        assert_eq!(
            res.tenants.get_tenant(tenant.id).unwrap().status,
            TenantStatus::Trial
        );
    }

    #[test]
    fn test_retention_window_boundary() {
        let res = resources();
        let worker = worker(&res);
        let tenant = res.tenants.create_tenant("Acme", 7);
        let ended = Utc::now() - chrono::Duration::days(19);
        res.tenants.set_trial_ends_at(tenant.id, ended);

        // Blocked on the first sweep; 19 days in, still retained.
        worker.run(Utc::now());
        let outcome = worker.run(Utc::now());
        assert_eq!(outcome, TrialSweepOutcome::default());
        assert!(res.tenants.get_tenant(tenant.id).is_some());

        // Just past the 20 day window the account is purged.
        let outcome = worker.run(ended + chrono::Duration::days(20) + chrono::Duration::minutes(1));
        assert_eq!(outcome, TrialSweepOutcome { blocked: 0, purged: 1 });
        assert!(res.tenants.get_tenant(tenant.id).is_none());
    }

    #[test]
    fn test_purge_removes_all_tenant_resources() {
        let res = resources();
        let worker = worker(&res);
        let tenant = res.tenants.create_tenant("Acme", 7);
        let connection = res
            .connections
            .register(tenant.id, "official", ConnectionKind::ApiToken);
        res.campaigns.create_campaign(
            tenant.id,
            connection.id,
            "Launch",
            wavesend_dispatch::MessageTemplate {
                name: "promo".into(),
                body: "Hi {{name}}".into(),
            },
            vec![wavesend_dispatch::Recipient {
                phone_number: "+5511999990001".into(),
                name: "Ana".into(),
            }],
            Utc::now(),
        );
        res.restrictions
            .add(tenant.id, "+5511999990002", RestrictionReason::UserOptOut, None);

        res.tenants
            .set_trial_ends_at(tenant.id, Utc::now() - chrono::Duration::days(30));
        worker.run(Utc::now());
        worker.run(Utc::now());

        assert!(res.tenants.get_tenant(tenant.id).is_none());
        assert!(res.connections.connections_for_tenant(tenant.id).is_empty());
        assert_eq!(res.campaigns.count(), 0);
        assert!(res.restrictions.entries_for_tenant(tenant.id).is_empty());
    }

    #[test]
    fn test_payment_during_retention_cancels_purge() {
        let res = resources();
        let worker = worker(&res);
        let tenant = res.tenants.create_tenant("Acme", 7);
        res.tenants
            .set_trial_ends_at(tenant.id, Utc::now() - chrono::Duration::days(5));
        worker.run(Utc::now());

        res.tenants
            .record_payment(tenant.id, wavesend_tenancy::PlanTier::Starter, 30);

        let outcome = worker.run(Utc::now() + chrono::Duration::days(30));
        assert_eq!(outcome, TrialSweepOutcome::default());
        assert_eq!(
            res.tenants.get_tenant(tenant.id).unwrap().status,
            TenantStatus::Active
        );
    }
}
