//! Pricing plans and the quota limits they carry.

use serde::{Deserialize, Serialize};

/// SaaS pricing tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanTier {
    Trial,
    Starter,
    Professional,
    Enterprise,
}

/// Per-tenant resource ceilings defined by the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_users: u32,
    pub max_connections: u32,
    pub max_campaigns_per_month: u32,
    pub max_messages_per_day: u64,
    pub max_messages_per_month: u64,
    pub max_templates: u32,
    pub max_contacts: u64,
}

impl PlanTier {
    /// Return the quota limits for this tier.
    pub fn limits(self) -> PlanLimits {
        match self {
            PlanTier::Trial => PlanLimits {
                max_users: 2,
                max_connections: 1,
                max_campaigns_per_month: 3,
                max_messages_per_day: 200,
                max_messages_per_month: 1_000,
                max_templates: 5,
                max_contacts: 500,
            },
            PlanTier::Starter => PlanLimits {
                max_users: 5,
                max_connections: 2,
                max_campaigns_per_month: 20,
                max_messages_per_day: 2_000,
                max_messages_per_month: 30_000,
                max_templates: 25,
                max_contacts: 10_000,
            },
            PlanTier::Professional => PlanLimits {
                max_users: 25,
                max_connections: 10,
                max_campaigns_per_month: 200,
                max_messages_per_day: 20_000,
                max_messages_per_month: 400_000,
                max_templates: 100,
                max_contacts: 200_000,
            },
            PlanTier::Enterprise => PlanLimits {
                max_users: u32::MAX,
                max_connections: u32::MAX,
                max_campaigns_per_month: u32::MAX,
                max_messages_per_day: u64::MAX,
                max_messages_per_month: u64::MAX,
                max_templates: u32::MAX,
                max_contacts: u64::MAX,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_limits_ordering() {
        let trial = PlanTier::Trial.limits();
        let starter = PlanTier::Starter.limits();
        let pro = PlanTier::Professional.limits();

        assert!(trial.max_messages_per_day < starter.max_messages_per_day);
        assert!(starter.max_messages_per_day < pro.max_messages_per_day);
        assert_eq!(PlanTier::Enterprise.limits().max_messages_per_day, u64::MAX);
    }
}
