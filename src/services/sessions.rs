use crate::backend::{Backend, SessionTransition};
use crate::errors::ServiceResult;
use crate::models::{DailyFocusPoint, FocusSession, SessionType, UserStats};
use crate::stats::build_focus_week;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct SessionService {
    backend: Arc<dyn Backend>,
}

impl SessionService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Every call creates a new running record.
    pub async fn start_session(
        &self,
        duration_minutes: u32,
        session_type: SessionType,
    ) -> ServiceResult<FocusSession> {
        let owner = self.backend.record_owner().await?;
        let session = FocusSession {
            id: Uuid::new_v4().to_string(),
            user_id: owner,
            planned_duration_minutes: duration_minutes,
            actual_duration_minutes: None,
            session_type,
            started_at: Utc::now(),
            completed_at: None,
            completed: false,
            cancelled_at: None,
        };
        let session = self.backend.insert_session(session).await?;
        info!(session_id = %session.id, duration_minutes, "focus session started");
        Ok(session)
    }

    /// Returns `None` when no record has this id. Counters are only updated
    /// when the record actually moved to completed, and a failed counter
    /// update is logged rather than returned.
    pub async fn complete_session(
        &self,
        session_id: &str,
        actual_minutes: u32,
    ) -> ServiceResult<Option<FocusSession>> {
        let owner = self.backend.record_owner().await?;
        let now = Utc::now();
        let transition = SessionTransition::Complete {
            actual_minutes,
            at: now,
        };
        let Some(update) = self
            .backend
            .transition_session(&owner, session_id, transition)
            .await?
        else {
            debug!(session_id, "complete: no matching session");
            return Ok(None);
        };

        if update.changed {
            match self
                .backend
                .record_completion(&owner, now.date_naive())
                .await
            {
                Ok(stats) => info!(
                    session_id,
                    actual_minutes,
                    streak = stats.current_streak,
                    total = stats.total_sessions,
                    "focus session completed"
                ),
                Err(err) => warn!(session_id, "session completed but counters not updated: {err}"),
            }
        }
        Ok(Some(update.session))
    }

    pub async fn cancel_session(&self, session_id: &str) -> ServiceResult<Option<FocusSession>> {
        let owner = self.backend.record_owner().await?;
        let transition = SessionTransition::Cancel { at: Utc::now() };
        let update = self
            .backend
            .transition_session(&owner, session_id, transition)
            .await?;
        if let Some(update) = &update {
            if update.changed {
                info!(session_id, "focus session cancelled");
            }
        }
        Ok(update.map(|update| update.session))
    }

    pub async fn get_user_sessions(&self, limit: usize) -> ServiceResult<Vec<FocusSession>> {
        let owner = self.backend.record_owner().await?;
        self.backend.list_sessions(&owner, Some(limit)).await
    }

    pub async fn get_user_stats(&self) -> ServiceResult<UserStats> {
        let owner = self.backend.record_owner().await?;
        self.backend
            .user_stats(&owner, Utc::now().date_naive())
            .await
    }

    /// Completed sessions and minutes for each of the last seven days.
    pub async fn get_focus_week(&self) -> ServiceResult<Vec<DailyFocusPoint>> {
        let owner = self.backend.record_owner().await?;
        let sessions = self.backend.list_sessions(&owner, None).await?;
        Ok(build_focus_week(&sessions))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::models::SessionStatus;
    use crate::storage::LocalStore;

    fn service() -> SessionService {
        SessionService::new(Arc::new(LocalBackend::new(LocalStore::in_memory())))
    }

    #[tokio::test]
    async fn start_then_complete() {
        let sessions = service();
        let started = sessions.start_session(25, SessionType::Focus).await.unwrap();
        assert_eq!(started.planned_duration_minutes, 25);
        assert_eq!(started.status(), SessionStatus::Running);

        let done = sessions
            .complete_session(&started.id, 25)
            .await
            .unwrap()
            .unwrap();
        assert!(done.completed);
        assert_eq!(done.actual_duration_minutes, Some(25));
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn unknown_id_is_not_an_error() {
        let sessions = service();
        assert!(sessions.complete_session("nope", 10).await.unwrap().is_none());
        assert_eq!(sessions.get_user_stats().await.unwrap().total_sessions, 0);
    }

    #[tokio::test]
    async fn repeated_completion_counts_once() {
        let sessions = service();
        let started = sessions.start_session(10, SessionType::Focus).await.unwrap();
        sessions.complete_session(&started.id, 10).await.unwrap();
        let again = sessions
            .complete_session(&started.id, 99)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again.actual_duration_minutes, Some(10));
        assert_eq!(sessions.get_user_stats().await.unwrap().total_sessions, 1);
    }

    #[tokio::test]
    async fn cancelled_session_stays_out_of_counters() {
        let sessions = service();
        let started = sessions.start_session(25, SessionType::DeepWork).await.unwrap();
        let cancelled = sessions.cancel_session(&started.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status(), SessionStatus::Cancelled);
        assert!(cancelled.completed_at.is_none());

        sessions.complete_session(&started.id, 25).await.unwrap();
        let stats = sessions.get_user_stats().await.unwrap();
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.current_streak, 0);
    }

    #[tokio::test]
    async fn focus_week_counts_todays_completion() {
        let sessions = service();
        let started = sessions.start_session(30, SessionType::Focus).await.unwrap();
        sessions.complete_session(&started.id, 20).await.unwrap();

        let week = sessions.get_focus_week().await.unwrap();
        let today = week.last().unwrap();
        assert_eq!(today.sessions_completed, 1);
        assert_eq!(today.focus_minutes, 20);
    }
}
