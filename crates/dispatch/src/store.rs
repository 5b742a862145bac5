//! In-memory campaign store backed by `DashMap`. Delivery records are the
//! single source of truth for progress and resumption: a restarted engine
//! derives where to continue entirely from their outcomes.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use wavesend_core::config::TimeConfig;
use wavesend_core::time::{parse_schedule, regional_offset};
use wavesend_core::WaveResult;

use crate::types::{
    Campaign, CampaignStatus, DeliveryOutcome, DeliveryRecord, MessageTemplate, Recipient,
};

/// Aggregate progress counters derived from delivery records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CampaignProgress {
    pub sent: u64,
    pub failed: u64,
    pub skipped: u64,
    pub total: u64,
}

impl CampaignProgress {
    /// True once every record has a terminal outcome.
    pub fn is_finished(&self) -> bool {
        self.sent + self.failed + self.skipped >= self.total
    }
}

/// Thread-safe store of campaigns and their delivery records.
pub struct CampaignStore {
    campaigns: DashMap<Uuid, Campaign>,
    deliveries: DashMap<Uuid, Vec<DeliveryRecord>>,
}

impl Default for CampaignStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CampaignStore {
    pub fn new() -> Self {
        Self {
            campaigns: DashMap::new(),
            deliveries: DashMap::new(),
        }
    }

    /// Create a campaign and its pending delivery records, one per
    /// recipient, in audience insertion order.
    pub fn create_campaign(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        name: impl Into<String>,
        template: MessageTemplate,
        recipients: Vec<Recipient>,
        scheduled_at: DateTime<Utc>,
    ) -> Campaign {
        let now = Utc::now();
        let campaign = Campaign {
            id: Uuid::new_v4(),
            tenant_id,
            connection_id,
            name: name.into(),
            status: CampaignStatus::Scheduled,
            scheduled_at,
            template,
            created_at: now,
            updated_at: now,
        };

        let records: Vec<DeliveryRecord> = recipients
            .into_iter()
            .enumerate()
            .map(|(position, recipient)| DeliveryRecord {
                campaign_id: campaign.id,
                recipient,
                position,
                outcome: DeliveryOutcome::Pending,
                attempts: 0,
                last_error: None,
                updated_at: now,
            })
            .collect();

        info!(
            campaign_id = %campaign.id,
            tenant_id = %tenant_id,
            recipients = records.len(),
            "Campaign created"
        );
        self.deliveries.insert(campaign.id, records);
        self.campaigns.insert(campaign.id, campaign.clone());
        campaign
    }

    /// Campaign intake for schedule times supplied as strings. Naive
    /// inputs are interpreted in the configured regional offset before
    /// the campaign is stored.
    #[allow(clippy::too_many_arguments)]
    pub fn create_campaign_scheduled(
        &self,
        tenant_id: Uuid,
        connection_id: Uuid,
        name: impl Into<String>,
        template: MessageTemplate,
        recipients: Vec<Recipient>,
        schedule: &str,
        time: &TimeConfig,
    ) -> WaveResult<Campaign> {
        let offset = regional_offset(time)?;
        let scheduled_at = parse_schedule(schedule, offset)?;
        Ok(self.create_campaign(tenant_id, connection_id, name, template, recipients, scheduled_at))
    }

    pub fn get_campaign(&self, id: Uuid) -> Option<Campaign> {
        self.campaigns.get(&id).map(|e| e.value().clone())
    }

    pub fn list_campaigns(&self) -> Vec<Campaign> {
        self.campaigns.iter().map(|e| e.value().clone()).collect()
    }

    /// Update a campaign's status.
    pub fn set_status(&self, id: Uuid, status: CampaignStatus) -> Option<Campaign> {
        if let Some(mut entry) = self.campaigns.get_mut(&id) {
            entry.status = status;
            entry.updated_at = Utc::now();
            info!(campaign_id = %id, ?status, "Campaign status updated");
            Some(entry.clone())
        } else {
            None
        }
    }

    /// Campaigns whose scheduled time has passed and that still have work:
    /// `Scheduled` and `Running` always qualify; `Paused` qualifies so the
    /// engine can re-check connectivity and resume.
    pub fn due_campaigns(&self, now: DateTime<Utc>) -> Vec<Campaign> {
        self.campaigns
            .iter()
            .filter(|e| {
                let c = e.value();
                matches!(
                    c.status,
                    CampaignStatus::Scheduled | CampaignStatus::Running | CampaignStatus::Paused
                ) && c.scheduled_at <= now
            })
            .map(|e| e.value().clone())
            .collect()
    }

    /// Delivery records for a campaign in processing order.
    pub fn deliveries(&self, campaign_id: Uuid) -> Vec<DeliveryRecord> {
        self.deliveries
            .get(&campaign_id)
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Record an outcome for one recipient. Terminal records are immutable;
    /// attempts to overwrite them are logged and ignored.
    pub fn mark_outcome(
        &self,
        campaign_id: Uuid,
        position: usize,
        outcome: DeliveryOutcome,
        attempts: u32,
        last_error: Option<String>,
    ) {
        if let Some(mut records) = self.deliveries.get_mut(&campaign_id) {
            if let Some(record) = records.iter_mut().find(|r| r.position == position) {
                if record.outcome.is_terminal() {
                    warn!(
                        campaign_id = %campaign_id,
                        position,
                        current = ?record.outcome,
                        attempted = ?outcome,
                        "Refusing to overwrite terminal delivery outcome"
                    );
                    return;
                }
                record.outcome = outcome;
                record.attempts = attempts;
                record.last_error = last_error;
                record.updated_at = Utc::now();
            }
        }
    }

    /// Aggregate progress for a campaign, derived from delivery records.
    pub fn progress(&self, campaign_id: Uuid) -> CampaignProgress {
        let records = self.deliveries(campaign_id);
        let mut progress = CampaignProgress {
            sent: 0,
            failed: 0,
            skipped: 0,
            total: records.len() as u64,
        };
        for record in &records {
            match record.outcome {
                DeliveryOutcome::Sent => progress.sent += 1,
                DeliveryOutcome::Failed => progress.failed += 1,
                DeliveryOutcome::SkippedRestricted => progress.skipped += 1,
                // Deferred, still outstanding.
                DeliveryOutcome::SkippedQuota | DeliveryOutcome::Pending => {}
            }
        }
        progress
    }

    /// Drop all campaigns and deliveries owned by a tenant. Returns the
    /// number of campaigns removed.
    pub fn remove_for_tenant(&self, tenant_id: Uuid) -> usize {
        let ids: Vec<Uuid> = self
            .campaigns
            .iter()
            .filter(|e| e.value().tenant_id == tenant_id)
            .map(|e| *e.key())
            .collect();
        for id in &ids {
            self.campaigns.remove(id);
            self.deliveries.remove(id);
        }
        ids.len()
    }

    pub fn count(&self) -> usize {
        self.campaigns.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn recipients(n: usize) -> Vec<Recipient> {
        (0..n)
            .map(|i| Recipient {
                phone_number: format!("+551199999{i:04}"),
                name: format!("Contact {i}"),
            })
            .collect()
    }

    fn template() -> MessageTemplate {
        MessageTemplate {
            name: "promo".into(),
            body: "Hi {{name}}".into(),
        }
    }

    #[test]
    fn test_create_campaign_seeds_pending_records() {
        let store = CampaignStore::new();
        let campaign = store.create_campaign(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Launch",
            template(),
            recipients(3),
            Utc::now(),
        );

        let records = store.deliveries(campaign.id);
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.outcome == DeliveryOutcome::Pending));
        // Stable insertion order.
        assert_eq!(
            records.iter().map(|r| r.position).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_naive_schedule_interpreted_regionally() {
        let store = CampaignStore::new();
        let campaign = store
            .create_campaign_scheduled(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "Launch",
                template(),
                recipients(1),
                "2026-09-01T09:00:00",
                &TimeConfig {
                    utc_offset_hours: -3,
                },
            )
            .unwrap();

        // 09:00 at UTC-3 is 12:00 UTC.
        assert_eq!(campaign.scheduled_at.to_rfc3339(), "2026-09-01T12:00:00+00:00");
    }

    #[test]
    fn test_due_selection() {
        let store = CampaignStore::new();
        let now = Utc::now();
        let due = store.create_campaign(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "due",
            template(),
            recipients(1),
            now - Duration::minutes(1),
        );
        let future = store.create_campaign(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "future",
            template(),
            recipients(1),
            now + Duration::hours(1),
        );

        let selected = store.due_campaigns(now);
        assert!(selected.iter().any(|c| c.id == due.id));
        assert!(!selected.iter().any(|c| c.id == future.id));
    }

    #[test]
    fn test_terminal_records_are_immutable() {
        let store = CampaignStore::new();
        let campaign = store.create_campaign(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "c",
            template(),
            recipients(1),
            Utc::now(),
        );

        store.mark_outcome(campaign.id, 0, DeliveryOutcome::Sent, 1, None);
        store.mark_outcome(campaign.id, 0, DeliveryOutcome::Failed, 2, Some("late".into()));

        let records = store.deliveries(campaign.id);
        assert_eq!(records[0].outcome, DeliveryOutcome::Sent);
        assert_eq!(records[0].attempts, 1);
    }

    #[test]
    fn test_quota_skip_is_retriable() {
        let store = CampaignStore::new();
        let campaign = store.create_campaign(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "c",
            template(),
            recipients(1),
            Utc::now(),
        );

        store.mark_outcome(campaign.id, 0, DeliveryOutcome::SkippedQuota, 0, None);
        // A later cycle may still move it to Sent.
        store.mark_outcome(campaign.id, 0, DeliveryOutcome::Sent, 1, None);
        assert_eq!(store.deliveries(campaign.id)[0].outcome, DeliveryOutcome::Sent);
    }

    #[test]
    fn test_progress_counts() {
        let store = CampaignStore::new();
        let campaign = store.create_campaign(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "c",
            template(),
            recipients(4),
            Utc::now(),
        );

        store.mark_outcome(campaign.id, 0, DeliveryOutcome::Sent, 1, None);
        store.mark_outcome(campaign.id, 1, DeliveryOutcome::Failed, 3, Some("boom".into()));
        store.mark_outcome(campaign.id, 2, DeliveryOutcome::SkippedRestricted, 0, None);

        let progress = store.progress(campaign.id);
        assert_eq!(progress.sent, 1);
        assert_eq!(progress.failed, 1);
        assert_eq!(progress.skipped, 1);
        assert_eq!(progress.total, 4);
        assert!(!progress.is_finished());
    }
}
