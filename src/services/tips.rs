use super::EntitlementService;
use crate::backend::{Backend, TipFilter};
use crate::errors::ServiceResult;
use crate::models::Tip;
use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::warn;

/// Feature that unlocks premium tips.
const PREMIUM_TIP_FEATURE: &str = "advanced_analytics";
const DAILY_TIP_POOL_SIZE: usize = 10;

const DEFAULT_TIPS: &[(&str, &str, &str, bool)] = &[
    (
        "1",
        "Dopamine fasting isn't about complete deprivation - it's about intentional consumption",
        "dopamine",
        false,
    ),
    (
        "2",
        "Your brain needs 90 minutes to reset dopamine levels after overstimulation",
        "dopamine",
        false,
    ),
    (
        "3",
        "Natural rewards like sunlight and exercise create sustainable dopamine",
        "mindfulness",
        false,
    ),
    (
        "4",
        "Every small win builds momentum - celebrate completing sessions",
        "productivity",
        false,
    ),
    (
        "5",
        "Boredom is your brain's way of encouraging creativity and reflection",
        "mindfulness",
        false,
    ),
    (
        "6",
        "Try the 'Pomodoro Technique' - 25 minutes of focus followed by a 5-minute break",
        "productivity",
        false,
    ),
    (
        "7",
        "Advanced: Create a 'dopamine schedule' to balance digital stimulation throughout your day",
        "dopamine",
        true,
    ),
];

/// Built-in tips used whenever the backend has none to offer.
pub fn default_tips() -> Vec<Tip> {
    DEFAULT_TIPS
        .iter()
        .map(|(id, text, category, is_premium)| Tip {
            id: (*id).to_string(),
            tip_text: (*text).to_string(),
            tip_category: (*category).to_string(),
            is_premium: *is_premium,
        })
        .collect()
}

fn builtin_pool(filter: &TipFilter<'_>) -> Vec<Tip> {
    default_tips()
        .into_iter()
        .filter(|tip| filter.include_premium || !tip.is_premium)
        .filter(|tip| filter.category.is_none_or(|category| tip.tip_category == category))
        .collect()
}

#[derive(Clone)]
pub struct TipService {
    backend: Arc<dyn Backend>,
    entitlements: EntitlementService,
}

impl TipService {
    pub fn new(backend: Arc<dyn Backend>, entitlements: EntitlementService) -> Self {
        Self {
            backend,
            entitlements,
        }
    }

    /// A random tip the caller is entitled to. Not pinned to the date: each
    /// call draws again.
    pub async fn get_daily_tip(&self) -> Tip {
        let filter = TipFilter {
            include_premium: self.entitlements.has_feature_access(PREMIUM_TIP_FEATURE).await,
            category: None,
            limit: Some(DAILY_TIP_POOL_SIZE),
        };
        let pool = match self.backend.tip_pool(filter.clone()).await {
            Ok(tips) if !tips.is_empty() => tips,
            Ok(_) => builtin_pool(&filter),
            Err(err) => {
                warn!("tip pool unavailable, using built-in tips: {err}");
                builtin_pool(&filter)
            }
        };

        let tip = pool.choose(&mut rand::thread_rng()).cloned();
        tip.unwrap_or_else(|| default_tips().remove(0))
    }

    pub async fn get_tips_by_category(&self, category: &str) -> ServiceResult<Vec<Tip>> {
        let filter = TipFilter {
            include_premium: self.entitlements.has_feature_access(PREMIUM_TIP_FEATURE).await,
            category: Some(category),
            limit: None,
        };
        let tips = self.backend.tip_pool(filter.clone()).await?;
        if tips.is_empty() {
            return Ok(builtin_pool(&filter));
        }
        Ok(tips)
    }
}
