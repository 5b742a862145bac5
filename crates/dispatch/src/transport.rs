//! Outbound transport seam. The engine only knows this contract; real
//! provider clients (official API or device session) live behind it.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use wavesend_tenancy::Connection;

/// Send failure taxonomy. Transient failures are retried with backoff;
/// permanent failures are terminal immediately.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("transient provider failure: {0}")]
    Transient(String),
    #[error("permanent send failure: {0}")]
    Permanent(String),
}

/// Outbound provider contract. Returns the provider-side message id.
#[async_trait]
pub trait OutboundTransport: Send + Sync {
    async fn send(
        &self,
        connection: &Connection,
        phone_number: &str,
        body: &str,
    ) -> Result<String, SendError>;
}

/// Development transport that logs the send and fabricates a message id.
pub struct LogTransport;

#[async_trait]
impl OutboundTransport for LogTransport {
    async fn send(
        &self,
        connection: &Connection,
        phone_number: &str,
        body: &str,
    ) -> Result<String, SendError> {
        tracing::info!(
            connection_id = %connection.id,
            kind = ?connection.kind,
            to = phone_number,
            body_len = body.len(),
            "Sending outbound message"
        );
        Ok(Uuid::new_v4().to_string())
    }
}
