use crate::backend::Backend;
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{AnalyticsEvent, SessionEventData};
use crate::stats::window_start;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

const FOCUS_TIMER_SCREEN: &str = "FocusTimer";

#[derive(Clone)]
pub struct AnalyticsService {
    backend: Arc<dyn Backend>,
}

impl AnalyticsService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Records an event for the current user. Without a user the event is
    /// only logged.
    pub async fn track_event(
        &self,
        event_type: &str,
        event_data: Value,
        screen_name: Option<&str>,
    ) -> ServiceResult<Option<AnalyticsEvent>> {
        let owner = match self.backend.record_owner().await {
            Ok(owner) => owner,
            Err(ServiceError::Unauthenticated) => {
                info!(event_type, data = %event_data, "analytics event without user");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        let event = AnalyticsEvent {
            id: Uuid::new_v4().to_string(),
            user_id: owner,
            event_type: event_type.to_string(),
            event_data,
            screen_name: screen_name.map(str::to_string),
            created_at: Utc::now(),
        };
        self.backend.insert_event(event).await
    }

    pub async fn track_session_event(
        &self,
        event_type: &str,
        session: SessionEventData,
    ) -> ServiceResult<Option<AnalyticsEvent>> {
        let data = serde_json::to_value(session)?;
        self.track_event(event_type, data, Some(FOCUS_TIMER_SCREEN))
            .await
    }

    /// Events of the trailing `days` window, most recent first.
    pub async fn get_user_analytics(&self, days: u32) -> ServiceResult<Vec<AnalyticsEvent>> {
        let owner = match self.backend.record_owner().await {
            Ok(owner) => owner,
            Err(ServiceError::Unauthenticated) => return Ok(Vec::new()),
            Err(err) => return Err(err),
        };
        let since = window_start(Utc::now(), days);
        self.backend.events_since(&owner, since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::models::SessionType;
    use crate::storage::LocalStore;

    #[tokio::test]
    async fn local_events_are_only_logged() {
        let analytics =
            AnalyticsService::new(Arc::new(LocalBackend::new(LocalStore::in_memory())));
        let stored = analytics
            .track_session_event(
                "session_completed",
                SessionEventData {
                    session_duration: 25,
                    session_type: SessionType::Focus,
                    completed: true,
                    interruptions: 0,
                },
            )
            .await
            .unwrap();
        assert!(stored.is_none());
        assert!(analytics.get_user_analytics(30).await.unwrap().is_empty());
        assert!(analytics.get_user_analytics(u32::MAX).await.unwrap().is_empty());
    }
}
