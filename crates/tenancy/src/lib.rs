//! Multi-tenancy — tenant lifecycle state, plan quotas, and per-tenant
//! messaging connections.

pub mod connection;
pub mod plan;
pub mod registry;

pub use connection::{Connection, ConnectionKind, ConnectionRegistry, ConnectionState};
pub use plan::{PlanLimits, PlanTier};
pub use registry::{Tenant, TenantRegistry, TenantStatus};
