use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// User id that owns every record written in local mode.
pub const LOCAL_USER_ID: &str = "demo";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: String,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct SignUpProfile {
    pub display_name: String,
    pub username: Option<String>,
}

/// Result of a sign-up that did not fail.
///
/// Hosted backends may require the address to be verified before a session
/// is issued; callers must branch on that case separately from errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "user", rename_all = "snake_case")]
pub enum SignUpOutcome {
    SignedIn(UserIdentity),
    PendingConfirmation(UserIdentity),
}

impl SignUpOutcome {
    pub fn user(&self) -> &UserIdentity {
        match self {
            Self::SignedIn(user) | Self::PendingConfirmation(user) => user,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OAuthProvider {
    Google,
    Apple,
}

impl OAuthProvider {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Apple => "apple",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    #[default]
    Focus,
    ShortBreak,
    LongBreak,
    DeepWork,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusSession {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "session_duration")]
    pub planned_duration_minutes: u32,
    #[serde(rename = "actual_duration", default)]
    pub actual_duration_minutes: Option<u32>,
    #[serde(default)]
    pub session_type: SessionType,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl FocusSession {
    pub fn status(&self) -> SessionStatus {
        if self.completed {
            SessionStatus::Completed
        } else if self.cancelled_at.is_some() {
            SessionStatus::Cancelled
        } else {
            SessionStatus::Running
        }
    }

    /// Applies the completion fields. Returns false if the record already
    /// left the running state.
    pub fn complete(&mut self, actual_minutes: u32, at: DateTime<Utc>) -> bool {
        if self.status() != SessionStatus::Running {
            return false;
        }
        self.completed = true;
        self.actual_duration_minutes = Some(actual_minutes);
        self.completed_at = Some(at);
        true
    }

    pub fn cancel(&mut self, at: DateTime<Utc>) -> bool {
        if self.status() != SessionStatus::Running {
            return false;
        }
        self.cancelled_at = Some(at);
        true
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MoodInput {
    pub score: u8,
    #[serde(default)]
    pub emoji: Option<String>,
    #[serde(default)]
    pub energy: Option<u8>,
    #[serde(default)]
    pub stress: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MoodEntry {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub session_id: Option<String>,
    pub mood_score: u8,
    #[serde(default)]
    pub mood_emoji: Option<String>,
    #[serde(default)]
    pub energy_level: Option<u8>,
    #[serde(default)]
    pub stress_level: Option<u8>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub date: NaiveDate,
}

impl MoodEntry {
    pub fn after_session(&self) -> bool {
        self.session_id.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserStats {
    pub current_streak: u32,
    pub total_sessions: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    #[default]
    Free,
    Pro,
    Elite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Cancelled,
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Entitlement {
    #[serde(rename = "subscription_tier", default)]
    pub tier: SubscriptionTier,
    #[serde(rename = "subscription_status", default)]
    pub status: SubscriptionStatus,
    #[serde(rename = "subscription_ends_at", default)]
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tip {
    pub id: String,
    pub tip_text: String,
    pub tip_category: String,
    #[serde(default)]
    pub is_premium: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: String,
    pub user_id: String,
    pub event_type: String,
    #[serde(default)]
    pub event_data: serde_json::Value,
    #[serde(default)]
    pub screen_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SessionEventData {
    pub session_duration: u32,
    pub session_type: SessionType,
    pub completed: bool,
    pub interruptions: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDataExport {
    pub mood_entries: Vec<MoodEntry>,
    pub focus_sessions: Vec<FocusSession>,
    pub export_date: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct DailyFocusPoint {
    pub date: String,
    pub sessions_completed: u32,
    pub focus_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub display_name: String,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthRequest {
    pub provider: OAuthProvider,
}

#[derive(Debug, Serialize)]
pub struct OAuthResponse {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    pub duration_minutes: u32,
    #[serde(default)]
    pub session_type: SessionType,
}

#[derive(Debug, Deserialize)]
pub struct CompleteSessionRequest {
    pub actual_duration_minutes: u32,
}

#[derive(Debug, Deserialize)]
pub struct LogMoodRequest {
    #[serde(flatten)]
    pub mood: MoodInput,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubscriptionRequest {
    pub tier: SubscriptionTier,
    pub status: SubscriptionStatus,
    #[serde(default)]
    pub ends_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct FeatureAccessResponse {
    pub feature: String,
    pub access: bool,
}

#[derive(Debug, Serialize)]
pub struct TimerResponse {
    pub session_id: String,
    pub remaining_seconds: u64,
}

#[derive(Debug, Deserialize)]
pub struct TrackEventRequest {
    pub event_type: String,
    #[serde(default)]
    pub event_data: serde_json::Value,
    #[serde(default)]
    pub screen_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}
