//! Per-tenant messaging connections — either an official API-token channel
//! or a QR-paired device session whose connectivity comes and goes.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// How the connection reaches the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionKind {
    /// Official provider API with a long-lived token.
    ApiToken,
    /// Device-paired session established by scanning a QR code.
    QrSession,
}

/// Connectivity of the underlying transport session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// A tenant's outbound messaging connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub kind: ConnectionKind,
    pub state: ConnectionState,
}

impl Connection {
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }
}

/// Registry of connections across all tenants.
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, Connection>,
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection. API-token connections start connected; QR
    /// sessions start disconnected until the device pairs.
    pub fn register(&self, tenant_id: Uuid, name: impl Into<String>, kind: ConnectionKind) -> Connection {
        let connection = Connection {
            id: Uuid::new_v4(),
            tenant_id,
            name: name.into(),
            kind,
            state: match kind {
                ConnectionKind::ApiToken => ConnectionState::Connected,
                ConnectionKind::QrSession => ConnectionState::Disconnected,
            },
        };
        info!(
            connection_id = %connection.id,
            tenant_id = %tenant_id,
            ?kind,
            "Connection registered"
        );
        self.connections.insert(connection.id, connection.clone());
        connection
    }

    pub fn get(&self, id: Uuid) -> Option<Connection> {
        self.connections.get(&id).map(|e| e.value().clone())
    }

    /// Flip connectivity (QR session paired or dropped).
    pub fn set_state(&self, id: Uuid, state: ConnectionState) -> Option<Connection> {
        if let Some(mut entry) = self.connections.get_mut(&id) {
            entry.state = state;
            info!(connection_id = %id, ?state, "Connection state changed");
            Some(entry.clone())
        } else {
            None
        }
    }

    pub fn connections_for_tenant(&self, tenant_id: Uuid) -> Vec<Connection> {
        self.connections
            .iter()
            .filter(|e| e.value().tenant_id == tenant_id)
            .map(|e| e.value().clone())
            .collect()
    }

    /// Drop every connection owned by a tenant. Returns the number removed.
    pub fn remove_for_tenant(&self, tenant_id: Uuid) -> usize {
        let ids: Vec<Uuid> = self
            .connections
            .iter()
            .filter(|e| e.value().tenant_id == tenant_id)
            .map(|e| *e.key())
            .collect();
        for id in &ids {
            self.connections.remove(id);
        }
        ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_token_starts_connected() {
        let registry = ConnectionRegistry::new();
        let conn = registry.register(Uuid::new_v4(), "official", ConnectionKind::ApiToken);
        assert!(conn.is_connected());
    }

    #[test]
    fn test_qr_session_pairs_later() {
        let registry = ConnectionRegistry::new();
        let conn = registry.register(Uuid::new_v4(), "device-1", ConnectionKind::QrSession);
        assert!(!conn.is_connected());

        let paired = registry
            .set_state(conn.id, ConnectionState::Connected)
            .unwrap();
        assert!(paired.is_connected());
    }

    #[test]
    fn test_remove_for_tenant() {
        let registry = ConnectionRegistry::new();
        let tenant = Uuid::new_v4();
        registry.register(tenant, "a", ConnectionKind::ApiToken);
        registry.register(tenant, "b", ConnectionKind::QrSession);
        registry.register(Uuid::new_v4(), "other", ConnectionKind::ApiToken);

        assert_eq!(registry.remove_for_tenant(tenant), 2);
        assert!(registry.connections_for_tenant(tenant).is_empty());
    }
}
