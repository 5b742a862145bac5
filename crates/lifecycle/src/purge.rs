//! Tenant purge. Deleting an account removes every resource it owns;
//! the ordering here keeps the dispatch engine from picking up campaigns
//! of a tenant that is mid-purge.

use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use wavesend_dispatch::CampaignStore;
use wavesend_quota::QuotaTracker;
use wavesend_restriction::RestrictionList;
use wavesend_tenancy::{ConnectionRegistry, TenantRegistry, TenantStatus};

/// Shared handles to every per-tenant resource store. Both lifecycle
/// workers operate through this bundle.
#[derive(Clone)]
pub struct TenantResources {
    pub tenants: Arc<TenantRegistry>,
    pub connections: Arc<ConnectionRegistry>,
    pub campaigns: Arc<CampaignStore>,
    pub restrictions: Arc<RestrictionList>,
    pub quota: Arc<QuotaTracker>,
}

impl TenantResources {
    /// Remove a tenant and everything it owns. The tenant row is flipped
    /// to `Deleted` first so the dispatch engine refuses its campaigns
    /// while the dependent stores are drained.
    pub fn purge_tenant(&self, tenant_id: Uuid) {
        self.tenants.set_status(tenant_id, TenantStatus::Deleted);

        let campaigns = self.campaigns.remove_for_tenant(tenant_id);
        let restrictions = self.restrictions.remove_for_tenant(tenant_id);
        let connections = self.connections.remove_for_tenant(tenant_id);
        self.quota.remove_for_tenant(tenant_id);
        self.tenants.delete_tenant(tenant_id);

        info!(
            tenant_id = %tenant_id,
            campaigns,
            restrictions,
            connections,
            "Tenant purged after retention window"
        );
    }
}
