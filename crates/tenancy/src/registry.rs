//! Tenant registry — the authoritative view of tenant status, trial and
//! payment dates. Rows are mutated only by the lifecycle workers and
//! payment events; the dispatch engine reads.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::plan::{PlanLimits, PlanTier};

/// Tenant lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    Active,
    Trial,
    Blocked,
    Deleted,
}

/// A single tenant account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tenant {
    pub id: Uuid,
    pub name: String,
    pub status: TenantStatus,
    pub is_trial: bool,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub plan: PlanTier,
    pub payment_due_at: Option<DateTime<Utc>>,
    /// Anchor for the retention/grace countdown once blocked.
    pub blocked_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tenant {
    /// Whether the dispatch engine may send on behalf of this tenant.
    pub fn can_send(&self) -> bool {
        matches!(self.status, TenantStatus::Active | TenantStatus::Trial)
    }

    /// Quota limits from the tenant's plan.
    pub fn limits(&self) -> PlanLimits {
        self.plan.limits()
    }
}

/// Thread-safe tenant registry backed by `DashMap`.
pub struct TenantRegistry {
    tenants: DashMap<Uuid, Tenant>,
}

impl Default for TenantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TenantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            tenants: DashMap::new(),
        }
    }

    /// Sign up a new tenant. Every signup starts on an automatic trial
    /// window of `trial_days`.
    pub fn create_tenant(&self, name: impl Into<String>, trial_days: u32) -> Tenant {
        let now = Utc::now();
        let tenant = Tenant {
            id: Uuid::new_v4(),
            name: name.into(),
            status: TenantStatus::Trial,
            is_trial: true,
            trial_ends_at: Some(now + Duration::days(i64::from(trial_days))),
            plan: PlanTier::Trial,
            payment_due_at: None,
            blocked_at: None,
            created_at: now,
            updated_at: now,
        };
        info!(tenant_id = %tenant.id, tenant_name = %tenant.name, "Tenant created on trial");
        self.tenants.insert(tenant.id, tenant.clone());
        tenant
    }

    /// Look up a tenant by id.
    pub fn get_tenant(&self, id: Uuid) -> Option<Tenant> {
        self.tenants.get(&id).map(|e| e.value().clone())
    }

    /// List all tenants.
    pub fn list_tenants(&self) -> Vec<Tenant> {
        self.tenants.iter().map(|e| e.value().clone()).collect()
    }

    /// Transition a tenant's status. Records the blocked-at anchor when
    /// entering `Blocked` and clears it when leaving.
    pub fn set_status(&self, id: Uuid, status: TenantStatus) -> Option<Tenant> {
        if let Some(mut entry) = self.tenants.get_mut(&id) {
            let now = Utc::now();
            match status {
                TenantStatus::Blocked => {
                    if entry.blocked_at.is_none() {
                        entry.blocked_at = Some(now);
                    }
                }
                TenantStatus::Active | TenantStatus::Trial => {
                    entry.blocked_at = None;
                }
                TenantStatus::Deleted => {}
            }
            entry.status = status;
            entry.updated_at = now;
            info!(tenant_id = %id, ?status, "Tenant status updated");
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Override the blocked-at anchor. Used by sweeps that need a
    /// deterministic countdown start.
    pub fn set_blocked_at(&self, id: Uuid, at: DateTime<Utc>) -> Option<()> {
        self.tenants.get_mut(&id).map(|mut entry| {
            entry.blocked_at = Some(at);
            entry.updated_at = Utc::now();
        })
    }

    /// Override the trial deadline.
    pub fn set_trial_ends_at(&self, id: Uuid, at: DateTime<Utc>) -> Option<()> {
        self.tenants.get_mut(&id).map(|mut entry| {
            entry.trial_ends_at = Some(at);
            entry.updated_at = Utc::now();
        })
    }

    /// Override the payment due date without touching status or plan.
    pub fn set_payment_due_at(&self, id: Uuid, at: DateTime<Utc>) -> Option<()> {
        self.tenants.get_mut(&id).map(|mut entry| {
            entry.payment_due_at = Some(at);
            entry.updated_at = Utc::now();
        })
    }

    /// Record a successful payment: the tenant leaves trial/blocked state
    /// and the due date advances one billing period from now.
    pub fn record_payment(&self, id: Uuid, plan: PlanTier, period_days: u32) -> Option<Tenant> {
        if let Some(mut entry) = self.tenants.get_mut(&id) {
            let now = Utc::now();
            entry.status = TenantStatus::Active;
            entry.is_trial = false;
            entry.trial_ends_at = None;
            entry.blocked_at = None;
            entry.plan = plan;
            entry.payment_due_at = Some(now + Duration::days(i64::from(period_days)));
            entry.updated_at = now;
            info!(tenant_id = %id, ?plan, "Payment recorded, tenant active");
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Remove the tenant record entirely. Dependent resources are purged
    /// by the caller (lifecycle workers own the purge sequence).
    pub fn delete_tenant(&self, id: Uuid) -> Option<Tenant> {
        let removed = self.tenants.remove(&id).map(|(_, t)| t);
        if removed.is_some() {
            info!(tenant_id = %id, "Tenant record deleted");
        }
        removed
    }

    /// Number of registered tenants.
    pub fn count(&self) -> usize {
        self.tenants.len()
    }
}
