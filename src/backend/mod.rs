//! Storage backends.
//!
//! A process uses exactly one backend, chosen from the configuration at
//! startup and shared by every service. Reads and writes never cross from
//! one backend to the other.

mod local;
mod remote;

pub use local::{LocalBackend, MOOD_HISTORY_CAPACITY};
pub use remote::RemoteBackend;

use crate::errors::ServiceResult;
use crate::models::{
    AnalyticsEvent, Entitlement, FocusSession, MoodEntry, OAuthProvider, SignUpOutcome,
    SignUpProfile, Tip, UserIdentity, UserStats,
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Local,
    Remote,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionTransition {
    Complete {
        actual_minutes: u32,
        at: DateTime<Utc>,
    },
    Cancel {
        at: DateTime<Utc>,
    },
}

impl SessionTransition {
    pub fn apply(self, session: &mut FocusSession) -> bool {
        match self {
            Self::Complete { actual_minutes, at } => session.complete(actual_minutes, at),
            Self::Cancel { at } => session.cancel(at),
        }
    }
}

/// A session located by a transition, and whether the transition changed it.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub session: FocusSession,
    pub changed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TipFilter<'a> {
    pub include_premium: bool,
    pub category: Option<&'a str>,
    pub limit: Option<usize>,
}

#[async_trait]
pub trait Backend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> ServiceResult<SignUpOutcome>;

    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<UserIdentity>;

    async fn sign_out(&self) -> ServiceResult<()>;

    async fn current_user(&self) -> ServiceResult<Option<UserIdentity>>;

    async fn provider_sign_in_url(&self, provider: OAuthProvider) -> ServiceResult<String>;

    /// User id that partitions the records read and written for the caller.
    async fn record_owner(&self) -> ServiceResult<String>;

    async fn insert_session(&self, session: FocusSession) -> ServiceResult<FocusSession>;

    async fn transition_session(
        &self,
        owner: &str,
        session_id: &str,
        transition: SessionTransition,
    ) -> ServiceResult<Option<SessionUpdate>>;

    /// Most recent first.
    async fn list_sessions(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<FocusSession>>;

    /// Updates the streak and total-session counters after a completion.
    async fn record_completion(&self, owner: &str, today: NaiveDate) -> ServiceResult<UserStats>;

    async fn user_stats(&self, owner: &str, today: NaiveDate) -> ServiceResult<UserStats>;

    async fn insert_mood(&self, entry: MoodEntry) -> ServiceResult<MoodEntry>;

    /// Most recent first.
    async fn list_mood_entries(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<MoodEntry>>;

    /// Oldest first.
    async fn mood_entries_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> ServiceResult<Vec<MoodEntry>>;

    /// Trend series for charting, oldest first.
    async fn mood_history(&self, owner: &str, days: u32) -> ServiceResult<Vec<u8>>;

    async fn entitlement(&self, owner: &str) -> ServiceResult<Option<Entitlement>>;

    async fn put_entitlement(
        &self,
        owner: &str,
        entitlement: &Entitlement,
    ) -> ServiceResult<Entitlement>;

    /// Tips stored by the backend. An empty pool means "use the built-in tips".
    async fn tip_pool(&self, filter: TipFilter<'_>) -> ServiceResult<Vec<Tip>>;

    /// Returns the stored event, or `None` when the backend only logs it.
    async fn insert_event(&self, event: AnalyticsEvent) -> ServiceResult<Option<AnalyticsEvent>>;

    /// Most recent first.
    async fn events_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> ServiceResult<Vec<AnalyticsEvent>>;
}
