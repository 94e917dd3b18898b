use crate::backend::Backend;
use crate::errors::ServiceResult;
use crate::models::{Entitlement, SubscriptionStatus, SubscriptionTier};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::SubscriptionTier::{Elite, Pro};

/// Premium features and the tiers that unlock them.
pub const FEATURE_TIERS: &[(&str, &[SubscriptionTier])] = &[
    ("unlimited_sessions", &[Pro, Elite]),
    ("advanced_analytics", &[Pro, Elite]),
    ("premium_soundscapes", &[Pro, Elite]),
    ("personal_coaching", &[Elite]),
    ("custom_programs", &[Elite]),
];

pub fn tiers_for_feature(feature: &str) -> Option<&'static [SubscriptionTier]> {
    FEATURE_TIERS
        .iter()
        .find(|(name, _)| *name == feature)
        .map(|(_, tiers)| *tiers)
}

#[derive(Clone)]
pub struct EntitlementService {
    backend: Arc<dyn Backend>,
}

impl EntitlementService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub async fn check_subscription_status(&self) -> ServiceResult<Entitlement> {
        let owner = self.backend.record_owner().await?;
        Ok(self.backend.entitlement(&owner).await?.unwrap_or_default())
    }

    /// Unknown features, and any failure to resolve the entitlement, deny
    /// access.
    pub async fn has_feature_access(&self, feature: &str) -> bool {
        let Some(tiers) = tiers_for_feature(feature) else {
            return false;
        };
        match self.check_subscription_status().await {
            Ok(entitlement) => tiers.contains(&entitlement.tier),
            Err(err) => {
                debug!(feature, "entitlement lookup failed: {err}");
                false
            }
        }
    }

    pub async fn update_subscription(
        &self,
        tier: SubscriptionTier,
        status: SubscriptionStatus,
        ends_at: Option<DateTime<Utc>>,
    ) -> ServiceResult<Entitlement> {
        let owner = self.backend.record_owner().await?;
        let entitlement = Entitlement {
            tier,
            status,
            ends_at,
        };
        let stored = self.backend.put_entitlement(&owner, &entitlement).await?;
        info!(tier = ?stored.tier, status = ?stored.status, "subscription updated");
        Ok(stored)
    }
}
