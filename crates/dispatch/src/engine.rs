//! Campaign dispatch engine — a continuously running loop that pulls due
//! campaigns across all tenants fairly, applies restriction and quota
//! checks per recipient, sends through the outbound transport with bounded
//! retries, and records every outcome on the delivery records.
//!
//! All engine state is derived from persisted delivery records, so a
//! restarted engine resumes from the first non-terminal recipient without
//! re-sending to anyone already marked `Sent`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use wavesend_core::config::DispatchConfig;
use wavesend_core::progress::{ProgressSink, ProgressUpdate};
use wavesend_core::{WaveError, WaveResult};
use wavesend_quota::QuotaTracker;
use wavesend_restriction::RestrictionList;
use wavesend_tenancy::{Connection, ConnectionKind, ConnectionRegistry, TenantRegistry};

use crate::store::CampaignStore;
use crate::transport::{OutboundTransport, SendError};
use crate::types::{Campaign, CampaignStatus, DeliveryOutcome};

/// The dispatch engine. One instance per process per channel; constructed
/// at startup and handed to the scheduler/runtime by `Arc`.
pub struct DispatchEngine {
    config: DispatchConfig,
    store: Arc<CampaignStore>,
    tenants: Arc<TenantRegistry>,
    connections: Arc<ConnectionRegistry>,
    restrictions: Arc<RestrictionList>,
    quota: Arc<QuotaTracker>,
    transport: Arc<dyn OutboundTransport>,
    progress: Arc<dyn ProgressSink>,
}

/// Handle returned by [`DispatchEngine::start`]. Dropping it does not stop
/// the engine; call [`DispatchHandle::stop`] for a graceful shutdown.
pub struct DispatchHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DispatchHandle {
    /// Signal shutdown and wait for the loop to finish its in-flight
    /// cycle. No send is interrupted mid-flight.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "Dispatch engine task panicked");
        }
    }
}

impl DispatchEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: DispatchConfig,
        store: Arc<CampaignStore>,
        tenants: Arc<TenantRegistry>,
        connections: Arc<ConnectionRegistry>,
        restrictions: Arc<RestrictionList>,
        quota: Arc<QuotaTracker>,
        transport: Arc<dyn OutboundTransport>,
        progress: Arc<dyn ProgressSink>,
    ) -> Self {
        Self {
            config,
            store,
            tenants,
            connections,
            restrictions,
            quota,
            transport,
            progress,
        }
    }

    /// Spawn the continuous processing loop.
    pub fn start(self: Arc<Self>) -> DispatchHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let engine = self;

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(StdDuration::from_millis(
                engine.config.cycle_interval_ms.max(1),
            ));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!("Dispatch engine started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => break,
                    _ = interval.tick() => {
                        // Once a cycle starts it runs to completion; shutdown
                        // is only honored between cycles.
                        engine.run_cycle(Utc::now()).await;
                    }
                }
            }

            info!("Dispatch engine stopped");
        });

        DispatchHandle { shutdown, task }
    }

    /// One engine cycle: select due campaigns and process one campaign per
    /// tenant, tenants in a deterministic order so no backlog starves
    /// another tenant's.
    pub async fn run_cycle(&self, now: DateTime<Utc>) {
        let due = self.store.due_campaigns(now);
        if due.is_empty() {
            return;
        }

        let mut by_tenant: BTreeMap<Uuid, Vec<Campaign>> = BTreeMap::new();
        for campaign in due {
            by_tenant.entry(campaign.tenant_id).or_default().push(campaign);
        }

        for (tenant_id, mut campaigns) in by_tenant {
            campaigns.sort_by_key(|c| (c.scheduled_at, c.id));
            let campaign = campaigns.remove(0);
            if let Err(e) = self.process_campaign(&campaign, now).await {
                error!(
                    campaign_id = %campaign.id,
                    tenant_id = %tenant_id,
                    error = %e,
                    "Campaign processing failed this cycle"
                );
            }
        }
    }

    async fn process_campaign(&self, campaign: &Campaign, now: DateTime<Utc>) -> WaveResult<()> {
        let tenant = self
            .tenants
            .get_tenant(campaign.tenant_id)
            .ok_or(WaveError::TenantNotFound(campaign.tenant_id))?;

        if !tenant.can_send() {
            debug!(
                campaign_id = %campaign.id,
                tenant_id = %tenant.id,
                status = ?tenant.status,
                "Tenant not allowed to send, campaign left untouched"
            );
            return Ok(());
        }

        let connection = self
            .connections
            .get(campaign.connection_id)
            .ok_or(WaveError::ConnectionNotFound(campaign.connection_id))?;

        // A device-paired session may be offline. That is a transport
        // availability problem, not a per-recipient failure: pause and
        // retry on a later cycle.
        if connection.kind == ConnectionKind::QrSession && !connection.is_connected() {
            if campaign.status != CampaignStatus::Paused {
                warn!(
                    campaign_id = %campaign.id,
                    connection_id = %connection.id,
                    "Session disconnected, pausing campaign"
                );
                self.store.set_status(campaign.id, CampaignStatus::Paused);
            }
            return Ok(());
        }

        if campaign.status != CampaignStatus::Running {
            self.store.set_status(campaign.id, CampaignStatus::Running);
        }

        let limits = tenant.limits();
        let mut quota_exhausted = false;

        for record in self.store.deliveries(campaign.id) {
            // Already-terminal records were handled in a previous cycle or
            // a previous process lifetime.
            if record.outcome.is_terminal() {
                continue;
            }

            if self
                .restrictions
                .is_blocked(campaign.tenant_id, &record.recipient.phone_number, now)
            {
                self.store.mark_outcome(
                    campaign.id,
                    record.position,
                    DeliveryOutcome::SkippedRestricted,
                    record.attempts,
                    None,
                );
                self.publish_progress(campaign);
                continue;
            }

            if let Err(period) = self.quota.try_consume_message(
                campaign.tenant_id,
                limits.max_messages_per_day,
                limits.max_messages_per_month,
                now,
            ) {
                warn!(
                    campaign_id = %campaign.id,
                    tenant_id = %campaign.tenant_id,
                    period = %period,
                    "Quota exhausted, deferring remaining recipients"
                );
                self.store.mark_outcome(
                    campaign.id,
                    record.position,
                    DeliveryOutcome::SkippedQuota,
                    record.attempts,
                    None,
                );
                self.publish_progress(campaign);
                quota_exhausted = true;
                break;
            }

            let body = campaign.template.render(&record.recipient);
            match self
                .send_with_retry(&connection, &record.recipient.phone_number, &body)
                .await
            {
                Ok(attempts) => {
                    self.store.mark_outcome(
                        campaign.id,
                        record.position,
                        DeliveryOutcome::Sent,
                        attempts,
                        None,
                    );
                }
                Err((attempts, e)) => {
                    // The reserved quota slot goes back; failed sends do
                    // not count against the plan.
                    self.quota.release_message(campaign.tenant_id, now);
                    self.store.mark_outcome(
                        campaign.id,
                        record.position,
                        DeliveryOutcome::Failed,
                        attempts,
                        Some(e.to_string()),
                    );
                }
            }
            self.publish_progress(campaign);

            if self.config.send_interval_ms > 0 {
                tokio::time::sleep(StdDuration::from_millis(self.config.send_interval_ms)).await;
            }
        }

        if !quota_exhausted {
            self.finish_if_complete(campaign);
        }
        Ok(())
    }

    /// Send one message, retrying transient failures with exponential
    /// backoff up to the configured attempt budget. Permanent failures are
    /// terminal on the first attempt. Returns the attempt count.
    async fn send_with_retry(
        &self,
        connection: &Connection,
        phone_number: &str,
        body: &str,
    ) -> Result<u32, (u32, SendError)> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.transport.send(connection, phone_number, body).await {
                Ok(_message_id) => return Ok(attempt),
                Err(e @ SendError::Permanent(_)) => return Err((attempt, e)),
                Err(SendError::Transient(msg)) => {
                    if attempt >= self.config.max_attempts {
                        return Err((attempt, SendError::Transient(msg)));
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        to = phone_number,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %msg,
                        "Transient send failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> StdDuration {
        let base = self.config.retry_base_delay_ms.max(1);
        let exp = base.saturating_mul(1u64 << (attempt - 1).min(10));
        let jitter = rand::thread_rng().gen_range(0..=base / 2);
        StdDuration::from_millis(exp.saturating_add(jitter))
    }

    fn finish_if_complete(&self, campaign: &Campaign) {
        let progress = self.store.progress(campaign.id);
        if !progress.is_finished() {
            return;
        }

        let ratio = if progress.total == 0 {
            0.0
        } else {
            progress.failed as f64 / progress.total as f64
        };
        let status = if ratio > self.config.failure_ratio_threshold {
            CampaignStatus::Failed
        } else {
            CampaignStatus::Completed
        };

        info!(
            campaign_id = %campaign.id,
            sent = progress.sent,
            failed = progress.failed,
            skipped = progress.skipped,
            ?status,
            "Campaign finished"
        );
        self.store.set_status(campaign.id, status);
        self.publish_progress(campaign);
    }

    fn publish_progress(&self, campaign: &Campaign) {
        let p = self.store.progress(campaign.id);
        self.progress.publish(ProgressUpdate {
            campaign_id: campaign.id,
            tenant_id: campaign.tenant_id,
            sent: p.sent,
            failed: p.failed,
            skipped: p.skipped,
            total: p.total,
            timestamp: Utc::now(),
        });
    }
}
