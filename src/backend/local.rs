use super::{Backend, BackendKind, SessionTransition, SessionUpdate, TipFilter};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{
    AnalyticsEvent, Entitlement, FocusSession, LOCAL_USER_ID, MoodEntry, OAuthProvider,
    SignUpOutcome, SignUpProfile, Tip, UserIdentity, UserStats,
};
use crate::stats::streak_from_sessions;
use crate::storage::{
    LocalStore, MOOD_ENTRIES_KEY, MOOD_HISTORY_KEY, SESSIONS_KEY, STREAK_KEY, SUBSCRIPTION_KEY,
    TOTAL_SESSIONS_KEY, USER_KEY,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::info;

/// Maximum length of the mood trend ring.
pub const MOOD_HISTORY_CAPACITY: usize = 7;

/// Backend over the local key-value file. Acts for a single demo user and
/// performs no credential checks.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    store: LocalStore,
}

impl LocalBackend {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    async fn remember_user(&self, email: &str, display_name: &str) -> ServiceResult<UserIdentity> {
        let user = UserIdentity {
            id: format!("demo-{}", Utc::now().timestamp_millis()),
            email: email.to_string(),
            display_name: display_name.to_string(),
        };
        self.store.set(USER_KEY, &user).await?;
        Ok(user)
    }
}

fn owned_sessions(sessions: Vec<FocusSession>, owner: &str) -> Vec<FocusSession> {
    sessions
        .into_iter()
        .filter(|session| session.user_id == owner)
        .collect()
}

fn owned_entries(entries: Vec<MoodEntry>, owner: &str) -> Vec<MoodEntry> {
    entries
        .into_iter()
        .filter(|entry| entry.user_id == owner)
        .collect()
}

#[async_trait]
impl Backend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        profile: &SignUpProfile,
    ) -> ServiceResult<SignUpOutcome> {
        let user = self.remember_user(email, &profile.display_name).await?;
        Ok(SignUpOutcome::SignedIn(user))
    }

    async fn sign_in(&self, email: &str, _password: &str) -> ServiceResult<UserIdentity> {
        self.remember_user(email, "Demo User").await
    }

    async fn sign_out(&self) -> ServiceResult<()> {
        self.store.remove(USER_KEY).await
    }

    async fn current_user(&self) -> ServiceResult<Option<UserIdentity>> {
        self.store.get(USER_KEY).await
    }

    async fn provider_sign_in_url(&self, _provider: OAuthProvider) -> ServiceResult<String> {
        Err(ServiceError::NotAvailable("OAuth sign in"))
    }

    async fn record_owner(&self) -> ServiceResult<String> {
        Ok(LOCAL_USER_ID.to_string())
    }

    async fn insert_session(&self, session: FocusSession) -> ServiceResult<FocusSession> {
        self.store
            .write(|data| {
                let mut sessions: Vec<FocusSession> = data.get_or_default(SESSIONS_KEY)?;
                sessions.insert(0, session.clone());
                data.set(SESSIONS_KEY, &sessions)?;
                Ok(session)
            })
            .await
    }

    async fn transition_session(
        &self,
        owner: &str,
        session_id: &str,
        transition: SessionTransition,
    ) -> ServiceResult<Option<SessionUpdate>> {
        self.store
            .write(|data| {
                let mut sessions: Vec<FocusSession> = data.get_or_default(SESSIONS_KEY)?;
                let Some(session) = sessions
                    .iter_mut()
                    .find(|session| session.id == session_id && session.user_id == owner)
                else {
                    return Ok(None);
                };

                let changed = transition.apply(session);
                let update = SessionUpdate {
                    session: session.clone(),
                    changed,
                };
                if changed {
                    data.set(SESSIONS_KEY, &sessions)?;
                }
                Ok(Some(update))
            })
            .await
    }

    async fn list_sessions(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<FocusSession>> {
        let sessions: Vec<FocusSession> = self
            .store
            .read(|data| data.get_or_default(SESSIONS_KEY))
            .await?;
        let mut sessions = owned_sessions(sessions, owner);
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        if let Some(limit) = limit {
            sessions.truncate(limit);
        }
        Ok(sessions)
    }

    async fn record_completion(&self, owner: &str, today: NaiveDate) -> ServiceResult<UserStats> {
        self.store
            .write(|data| {
                let sessions: Vec<FocusSession> = data.get_or_default(SESSIONS_KEY)?;
                let current_streak = streak_from_sessions(&owned_sessions(sessions, owner), today);
                let total: u32 = data.get_or_default(TOTAL_SESSIONS_KEY)?;
                let stats = UserStats {
                    current_streak,
                    total_sessions: total.saturating_add(1),
                };
                // Kept in the file for other readers of it; `user_stats`
                // recomputes the streak from sessions.
                data.set(STREAK_KEY, &stats.current_streak)?;
                data.set(TOTAL_SESSIONS_KEY, &stats.total_sessions)?;
                Ok(stats)
            })
            .await
    }

    async fn user_stats(&self, owner: &str, today: NaiveDate) -> ServiceResult<UserStats> {
        self.store
            .read(|data| {
                let sessions: Vec<FocusSession> = data.get_or_default(SESSIONS_KEY)?;
                Ok(UserStats {
                    current_streak: streak_from_sessions(&owned_sessions(sessions, owner), today),
                    total_sessions: data.get_or_default(TOTAL_SESSIONS_KEY)?,
                })
            })
            .await
    }

    async fn insert_mood(&self, entry: MoodEntry) -> ServiceResult<MoodEntry> {
        self.store
            .write(|data| {
                let mut entries: Vec<MoodEntry> = data.get_or_default(MOOD_ENTRIES_KEY)?;
                entries.insert(0, entry.clone());
                data.set(MOOD_ENTRIES_KEY, &entries)?;

                let mut history: Vec<u8> = data.get_or_default(MOOD_HISTORY_KEY)?;
                history.push(entry.mood_score);
                if history.len() > MOOD_HISTORY_CAPACITY {
                    let excess = history.len() - MOOD_HISTORY_CAPACITY;
                    history.drain(..excess);
                }
                data.set(MOOD_HISTORY_KEY, &history)?;
                Ok(entry)
            })
            .await
    }

    async fn list_mood_entries(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<MoodEntry>> {
        let entries: Vec<MoodEntry> = self
            .store
            .read(|data| data.get_or_default(MOOD_ENTRIES_KEY))
            .await?;
        let mut entries = owned_entries(entries, owner);
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = limit {
            entries.truncate(limit);
        }
        Ok(entries)
    }

    async fn mood_entries_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> ServiceResult<Vec<MoodEntry>> {
        let mut entries = self.list_mood_entries(owner, None).await?;
        entries.retain(|entry| entry.created_at >= since);
        entries.reverse();
        Ok(entries)
    }

    async fn mood_history(&self, _owner: &str, _days: u32) -> ServiceResult<Vec<u8>> {
        self.store
            .read(|data| data.get_or_default(MOOD_HISTORY_KEY))
            .await
    }

    async fn entitlement(&self, _owner: &str) -> ServiceResult<Option<Entitlement>> {
        self.store.get(SUBSCRIPTION_KEY).await
    }

    async fn put_entitlement(
        &self,
        _owner: &str,
        entitlement: &Entitlement,
    ) -> ServiceResult<Entitlement> {
        self.store.set(SUBSCRIPTION_KEY, entitlement).await?;
        Ok(entitlement.clone())
    }

    async fn tip_pool(&self, _filter: TipFilter<'_>) -> ServiceResult<Vec<Tip>> {
        Ok(Vec::new())
    }

    async fn insert_event(&self, event: AnalyticsEvent) -> ServiceResult<Option<AnalyticsEvent>> {
        info!(
            event_type = %event.event_type,
            screen = event.screen_name.as_deref().unwrap_or("-"),
            data = %event.event_data,
            "analytics event"
        );
        Ok(None)
    }

    async fn events_since(
        &self,
        _owner: &str,
        _since: DateTime<Utc>,
    ) -> ServiceResult<Vec<AnalyticsEvent>> {
        Ok(Vec::new())
    }
}
