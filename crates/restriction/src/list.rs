//! Per-tenant block-list of phone numbers with optional expiry. Consulted
//! read-only by the dispatch path; expired entries are inert for blocking
//! purposes but physically removed only by the cleanup sweep.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Why a phone number was restricted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RestrictionReason {
    #[default]
    UserOptOut,
    ProviderBlock,
    Complained,
    Regulatory,
    AdminAction,
}

/// A single restriction record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestrictionEntry {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub phone_number: String,
    pub reason: RestrictionReason,
    pub added_at: DateTime<Utc>,
    /// If set, the entry stops blocking at this time.
    pub expires_at: Option<DateTime<Utc>>,
}

impl RestrictionEntry {
    fn is_active(&self, at: DateTime<Utc>) -> bool {
        self.expires_at.map_or(true, |exp| exp > at)
    }
}

/// Thread-safe restriction list backed by `DashMap`, keyed per tenant.
pub struct RestrictionList {
    entries: DashMap<(Uuid, String), Vec<RestrictionEntry>>,
}

impl Default for RestrictionList {
    fn default() -> Self {
        Self::new()
    }
}

impl RestrictionList {
    /// Create an empty restriction list.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Add a restriction for `phone_number` under `tenant_id`.
    ///
    /// * `ttl_days` - optional time-to-live; the entry auto-expires after
    ///   this period.
    pub fn add(
        &self,
        tenant_id: Uuid,
        phone_number: &str,
        reason: RestrictionReason,
        ttl_days: Option<u32>,
    ) -> RestrictionEntry {
        let now = Utc::now();
        let entry = RestrictionEntry {
            id: Uuid::new_v4(),
            tenant_id,
            phone_number: phone_number.to_string(),
            reason,
            added_at: now,
            expires_at: ttl_days.map(|d| now + Duration::days(i64::from(d))),
        };

        self.entries
            .entry((tenant_id, phone_number.to_string()))
            .or_default()
            .push(entry.clone());

        tracing::info!(
            tenant_id = %tenant_id,
            phone_number,
            reason = ?entry.reason,
            "restriction entry added"
        );
        entry
    }

    /// Check whether `phone_number` is blocked for `tenant_id` at `at`.
    /// Expired entries are ignored. Restrictions never cross tenants.
    pub fn is_blocked(&self, tenant_id: Uuid, phone_number: &str, at: DateTime<Utc>) -> bool {
        self.entries
            .get(&(tenant_id, phone_number.to_string()))
            .map(|list| list.iter().any(|e| e.is_active(at)))
            .unwrap_or(false)
    }

    /// Remove all entries for one number under one tenant. Returns the
    /// number of entries removed.
    pub fn remove(&self, tenant_id: Uuid, phone_number: &str) -> usize {
        self.entries
            .remove(&(tenant_id, phone_number.to_string()))
            .map(|(_, list)| list.len())
            .unwrap_or(0)
    }

    /// All entries (including expired) for a tenant.
    pub fn entries_for_tenant(&self, tenant_id: Uuid) -> Vec<RestrictionEntry> {
        self.entries
            .iter()
            .filter(|e| e.key().0 == tenant_id)
            .flat_map(|e| e.value().clone())
            .collect()
    }

    /// Drop every entry owned by a tenant. Returns the number removed.
    pub fn remove_for_tenant(&self, tenant_id: Uuid) -> usize {
        let keys: Vec<(Uuid, String)> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == tenant_id)
            .map(|e| e.key().clone())
            .collect();
        let mut removed = 0;
        for key in keys {
            if let Some((_, list)) = self.entries.remove(&key) {
                removed += list.len();
            }
        }
        removed
    }

    /// Physically remove every entry whose expiry has passed at `at`,
    /// across all tenants. Returns the number of entries removed.
    pub fn purge_expired(&self, at: DateTime<Utc>) -> usize {
        let mut purged = 0usize;
        let mut empty_keys = Vec::new();

        for mut entry in self.entries.iter_mut() {
            let before = entry.value().len();
            entry.value_mut().retain(|e| e.is_active(at));
            purged += before - entry.value().len();
            if entry.value().is_empty() {
                empty_keys.push(entry.key().clone());
            }
        }

        for key in empty_keys {
            self.entries.remove(&key);
        }

        if purged > 0 {
            tracing::info!(purged, "expired restriction entries purged");
        }
        purged
    }

    /// Total number of entries across all tenants.
    pub fn count(&self) -> usize {
        self.entries.iter().map(|e| e.value().len()).sum()
    }
}
