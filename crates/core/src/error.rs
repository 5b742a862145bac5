use thiserror::Error;

pub type WaveResult<T> = Result<T, WaveError>;

#[derive(Error, Debug)]
pub enum WaveError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tenant not found: {0}")]
    TenantNotFound(uuid::Uuid),

    #[error("Tenant is not allowed to send: {0}")]
    TenantBlocked(uuid::Uuid),

    #[error("Campaign not found: {0}")]
    CampaignNotFound(uuid::Uuid),

    #[error("Connection not found: {0}")]
    ConnectionNotFound(uuid::Uuid),

    #[error("Quota exhausted for tenant {tenant_id} ({period})")]
    QuotaExhausted {
        tenant_id: uuid::Uuid,
        period: String,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
