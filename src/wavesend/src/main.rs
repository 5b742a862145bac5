//! WaveSend — multi-tenant bulk messaging worker.
//!
//! Main entry point that wires the registries, the dispatch engine and
//! the periodic lifecycle sweeps, then runs until interrupted.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing::{info, warn};

use wavesend_core::config::AppConfig;
use wavesend_core::progress::noop_sink;
use wavesend_dispatch::{CampaignStore, DispatchEngine, LogTransport, MessageTemplate, Recipient};
use wavesend_lifecycle::{LogNotifier, PaymentRenewalWorker, TenantResources, TrialLifecycleWorker};
use wavesend_quota::QuotaTracker;
use wavesend_restriction::{RestrictionCleanupWorker, RestrictionList, RestrictionReason};
use wavesend_scheduler::Scheduler;
use wavesend_tenancy::{ConnectionKind, ConnectionRegistry, TenantRegistry};

#[derive(Parser, Debug)]
#[command(name = "wavesend")]
#[command(about = "Multi-tenant bulk messaging worker")]
#[command(version)]
struct Cli {
    /// Node identifier (overrides config)
    #[arg(long, env = "WAVESEND__NODE_ID")]
    node_id: Option<String>,

    /// Dispatch cycle interval in milliseconds (overrides config)
    #[arg(long, env = "WAVESEND__DISPATCH__CYCLE_INTERVAL_MS")]
    cycle_interval_ms: Option<u64>,

    /// Seed a demo tenant with one campaign for local smoke runs
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wavesend=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("WaveSend starting up");

    // Load configuration
    let mut config = AppConfig::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(interval) = cli.cycle_interval_ms {
        config.dispatch.cycle_interval_ms = interval;
    }

    info!(
        node_id = %config.node_id,
        cycle_interval_ms = config.dispatch.cycle_interval_ms,
        restriction_sweep_secs = config.scheduler.restriction_sweep_secs,
        lifecycle_sweep_secs = config.scheduler.lifecycle_sweep_secs,
        "Configuration loaded"
    );

    // Shared state
    let tenants = Arc::new(TenantRegistry::new());
    let connections = Arc::new(ConnectionRegistry::new());
    let campaigns = Arc::new(CampaignStore::new());
    let restrictions = Arc::new(RestrictionList::new());
    let quota = Arc::new(QuotaTracker::new());

    if cli.seed_demo {
        seed_demo_data(&config, &tenants, &connections, &campaigns, &restrictions);
    }

    // Dispatch engine
    let engine = Arc::new(DispatchEngine::new(
        config.dispatch.clone(),
        campaigns.clone(),
        tenants.clone(),
        connections.clone(),
        restrictions.clone(),
        quota.clone(),
        Arc::new(LogTransport),
        noop_sink(),
    ));
    let engine_handle = engine.start();

    // Periodic sweeps
    let resources = TenantResources {
        tenants: tenants.clone(),
        connections: connections.clone(),
        campaigns: campaigns.clone(),
        restrictions: restrictions.clone(),
        quota: quota.clone(),
    };
    let cleanup = Arc::new(RestrictionCleanupWorker::new(restrictions.clone()));
    let trial = Arc::new(TrialLifecycleWorker::new(
        config.lifecycle.clone(),
        resources.clone(),
    ));
    let payment = Arc::new(PaymentRenewalWorker::new(
        config.lifecycle.clone(),
        resources,
        Arc::new(LogNotifier),
    ));

    let mut scheduler = Scheduler::new();
    scheduler.register(
        "restriction-cleanup",
        Duration::from_secs(config.scheduler.restriction_sweep_secs),
        true,
        move || {
            cleanup.run();
            Ok(())
        },
    );
    scheduler.register(
        "trial-lifecycle",
        Duration::from_secs(config.scheduler.lifecycle_sweep_secs),
        true,
        move || {
            trial.run(Utc::now());
            Ok(())
        },
    );
    scheduler.register(
        "payment-renewal",
        Duration::from_secs(config.scheduler.lifecycle_sweep_secs),
        true,
        move || {
            payment.run(Utc::now());
            Ok(())
        },
    );
    let scheduler_handle = scheduler.start();

    info!("WaveSend is running");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    scheduler_handle.stop().await;
    engine_handle.stop().await;

    info!("WaveSend stopped");
    Ok(())
}

/// Create one trial tenant with an always-connected channel and a small
/// campaign due immediately. Useful with `--cycle-interval-ms 1000` to
/// watch the engine work.
fn seed_demo_data(
    config: &AppConfig,
    tenants: &Arc<TenantRegistry>,
    connections: &Arc<ConnectionRegistry>,
    campaigns: &Arc<CampaignStore>,
    restrictions: &Arc<RestrictionList>,
) {
    let tenant = tenants.create_tenant("Demo Tenant", config.lifecycle.trial_days);
    let connection = connections.register(tenant.id, "demo-official", ConnectionKind::ApiToken);
    restrictions.add(
        tenant.id,
        "+5511999990002",
        RestrictionReason::UserOptOut,
        None,
    );

    let recipients = vec![
        Recipient {
            phone_number: "+5511999990001".into(),
            name: "Ana".into(),
        },
        Recipient {
            phone_number: "+5511999990002".into(),
            name: "Bruno".into(),
        },
        Recipient {
            phone_number: "+5511999990003".into(),
            name: "Carla".into(),
        },
    ];
    let campaign = campaigns.create_campaign(
        tenant.id,
        connection.id,
        "Demo launch",
        MessageTemplate {
            name: "welcome".into(),
            body: "Hi {{name}}, welcome aboard".into(),
        },
        recipients,
        Utc::now(),
    );

    info!(
        tenant_id = %tenant.id,
        campaign_id = %campaign.id,
        "Demo data seeded"
    );
}
