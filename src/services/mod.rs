//! Application services. Each one holds the process backend and never looks
//! at configuration itself.

mod analytics;
mod entitlements;
mod export;
mod identity;
mod moods;
mod sessions;
mod tips;

pub use analytics::AnalyticsService;
pub use entitlements::{EntitlementService, FEATURE_TIERS, tiers_for_feature};
pub use export::ExportService;
pub use identity::IdentityService;
pub use moods::MoodService;
pub use sessions::SessionService;
pub use tips::{TipService, default_tips};

use crate::backend::Backend;
use std::sync::Arc;

#[derive(Clone)]
pub struct Services {
    pub identity: IdentityService,
    pub sessions: SessionService,
    pub moods: MoodService,
    pub tips: TipService,
    pub entitlements: EntitlementService,
    pub analytics: AnalyticsService,
    pub export: ExportService,
}

impl Services {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        let entitlements = EntitlementService::new(Arc::clone(&backend));
        Self {
            identity: IdentityService::new(Arc::clone(&backend)),
            sessions: SessionService::new(Arc::clone(&backend)),
            moods: MoodService::new(Arc::clone(&backend)),
            tips: TipService::new(Arc::clone(&backend), entitlements.clone()),
            analytics: AnalyticsService::new(Arc::clone(&backend)),
            export: ExportService::new(backend),
            entitlements,
        }
    }
}
