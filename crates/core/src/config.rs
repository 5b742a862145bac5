use serde::Deserialize;

/// Root application configuration. Loaded from environment variables
/// with the prefix `WAVESEND__`.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub time: TimeConfig,
}

/// Tuning knobs for the campaign dispatch engine.
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// How often the engine polls for due campaigns.
    #[serde(default = "default_cycle_interval_ms")]
    pub cycle_interval_ms: u64,
    /// Pause between consecutive sends within one campaign.
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,
    /// Total attempts per recipient for transient provider failures.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay for exponential retry backoff.
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    /// A finished campaign whose failed/total ratio exceeds this is marked
    /// Failed instead of Completed.
    #[serde(default = "default_failure_ratio_threshold")]
    pub failure_ratio_threshold: f64,
}

/// Windows for the trial and payment lifecycle workers.
#[derive(Debug, Clone, Deserialize)]
pub struct LifecycleConfig {
    #[serde(default = "default_trial_days")]
    pub trial_days: u32,
    /// Days a blocked trial tenant is retained before deletion.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    /// Days a payment-blocked tenant is retained before deletion.
    #[serde(default = "default_grace_days")]
    pub grace_days: u32,
    /// Billing period length applied when a payment is recorded.
    #[serde(default = "default_billing_period_days")]
    pub billing_period_days: u32,
}

/// Cadences for the periodic workers, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "default_restriction_sweep_secs")]
    pub restriction_sweep_secs: u64,
    #[serde(default = "default_lifecycle_sweep_secs")]
    pub lifecycle_sweep_secs: u64,
}

/// Timezone policy for schedule inputs that arrive without an offset.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeConfig {
    /// Fixed regional offset (hours east of UTC) applied to naive inputs.
    #[serde(default = "default_utc_offset_hours")]
    pub utc_offset_hours: i32,
}

// Default functions
fn default_node_id() -> String {
    "wavesend-01".to_string()
}
fn default_cycle_interval_ms() -> u64 {
    5000
}
fn default_send_interval_ms() -> u64 {
    0
}
fn default_max_attempts() -> u32 {
    3
}
fn default_retry_base_delay_ms() -> u64 {
    500
}
fn default_failure_ratio_threshold() -> f64 {
    0.5
}
fn default_trial_days() -> u32 {
    7
}
fn default_retention_days() -> u32 {
    20
}
fn default_grace_days() -> u32 {
    20
}
fn default_billing_period_days() -> u32 {
    30
}
fn default_restriction_sweep_secs() -> u64 {
    3600
}
fn default_lifecycle_sweep_secs() -> u64 {
    7200
}
fn default_utc_offset_hours() -> i32 {
    -3
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: default_cycle_interval_ms(),
            send_interval_ms: default_send_interval_ms(),
            max_attempts: default_max_attempts(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            failure_ratio_threshold: default_failure_ratio_threshold(),
        }
    }
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            trial_days: default_trial_days(),
            retention_days: default_retention_days(),
            grace_days: default_grace_days(),
            billing_period_days: default_billing_period_days(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            restriction_sweep_secs: default_restriction_sweep_secs(),
            lifecycle_sweep_secs: default_lifecycle_sweep_secs(),
        }
    }
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            utc_offset_hours: default_utc_offset_hours(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            dispatch: DispatchConfig::default(),
            lifecycle: LifecycleConfig::default(),
            scheduler: SchedulerConfig::default(),
            time: TimeConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder().add_source(
            config::Environment::with_prefix("WAVESEND")
                .separator("__")
                .try_parsing(true)
                .list_separator(","),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }
}
