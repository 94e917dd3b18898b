use super::{
    Backend, BackendKind, MOOD_HISTORY_CAPACITY, SessionTransition, SessionUpdate, TipFilter,
};
use crate::errors::{ServiceError, ServiceResult};
use crate::models::{
    AnalyticsEvent, Entitlement, FocusSession, MoodEntry, OAuthProvider, SignUpOutcome,
    SignUpProfile, Tip, UserIdentity, UserStats,
};
use crate::stats::{mood_trend, window_start};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned, de::IgnoredAny};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const RETURN_REPRESENTATION: &str = "return=representation";

#[derive(Debug, Clone)]
struct AuthSession {
    access_token: String,
    user: UserIdentity,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    user_metadata: UserMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct UserMetadata {
    #[serde(default)]
    full_name: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

impl From<AuthUser> for UserIdentity {
    fn from(user: AuthUser) -> Self {
        let metadata = user.user_metadata;
        Self {
            id: user.id,
            email: user.email.unwrap_or_default(),
            display_name: metadata
                .full_name
                .or(metadata.name)
                .or(metadata.username)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct StreakRow {
    current_streak: u32,
}

/// Hosted backend: GoTrue-style auth under `/auth/v1` and PostgREST tables
/// under `/rest/v1`, every row scoped to the signed-in user.
#[derive(Debug)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    anon_key: String,
    redirect_url: String,
    session: RwLock<Option<AuthSession>>,
}

impl RemoteBackend {
    pub fn new(base_url: &str, anon_key: &str, redirect_url: &str) -> ServiceResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_string();
        Url::parse(&base_url)
            .map_err(|err| ServiceError::Validation(format!("invalid backend url: {err}")))?;
        Ok(Self {
            client: Client::builder().build()?,
            base_url,
            anon_key: anon_key.trim().to_string(),
            redirect_url: redirect_url.to_string(),
            session: RwLock::new(None),
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{path}", self.base_url)
    }

    fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{path}", self.base_url)
    }

    async fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let token = match self.session.read().await.as_ref() {
            Some(session) => session.access_token.clone(),
            None => self.anon_key.clone(),
        };
        self.client
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
    }

    async fn store_session(&self, token: TokenResponse) -> UserIdentity {
        let user = UserIdentity::from(token.user);
        *self.session.write().await = Some(AuthSession {
            access_token: token.access_token,
            user: user.clone(),
        });
        user
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
    ) -> ServiceResult<Vec<T>> {
        let builder = self
            .request(Method::GET, &self.rest_url(table))
            .await
            .query(query);
        read_json(builder.send().await?).await
    }

    async fn insert<T, R>(&self, table: &str, row: &R) -> ServiceResult<T>
    where
        T: DeserializeOwned,
        R: Serialize + Sync,
    {
        let builder = self
            .request(Method::POST, &self.rest_url(table))
            .await
            .header("Prefer", RETURN_REPRESENTATION)
            .json(row);
        let rows: Vec<T> = read_json(builder.send().await?).await?;
        first_row(rows, table)
    }

    async fn update<T: DeserializeOwned>(
        &self,
        table: &str,
        query: &[(&str, String)],
        changes: &Value,
    ) -> ServiceResult<Vec<T>> {
        let builder = self
            .request(Method::PATCH, &self.rest_url(table))
            .await
            .header("Prefer", RETURN_REPRESENTATION)
            .query(query)
            .json(changes);
        read_json(builder.send().await?).await
    }

    async fn completed_session_count(&self, owner: &str) -> ServiceResult<u32> {
        let rows: Vec<IgnoredAny> = self
            .select(
                "focus_sessions",
                &[
                    ("select", "id".to_string()),
                    ("user_id", eq(owner)),
                    ("completed", "eq.true".to_string()),
                ],
            )
            .await?;
        Ok(u32::try_from(rows.len()).unwrap_or(u32::MAX))
    }
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn first_row<T>(rows: Vec<T>, table: &str) -> ServiceResult<T> {
    rows.into_iter().next().ok_or_else(|| ServiceError::Remote {
        status: 500,
        message: format!("{table}: no row returned"),
    })
}

async fn read_json<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
    let response = check_status(response).await?;
    Ok(response.json().await?)
}

async fn check_status(response: Response) -> ServiceResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ServiceError::Remote {
        status: status.as_u16(),
        message: error_message(&body)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string()),
    })
}

/// Pulls the human-readable message out of an auth or REST error body.
fn error_message(body: &str) -> Option<String> {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["msg", "message", "error_description", "error"] {
            if let Some(text) = value.get(key).and_then(Value::as_str) {
                return Some(text.to_string());
            }
        }
    }
    let trimmed = body.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[async_trait]
impl Backend for RemoteBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Remote
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> ServiceResult<SignUpOutcome> {
        let builder = self
            .request(Method::POST, &self.auth_url("signup"))
            .await
            .json(&json!({
                "email": email,
                "password": password,
                "data": {
                    "username": profile.username,
                    "full_name": profile.display_name,
                },
            }));
        let body: Value = read_json(builder.send().await?).await?;

        // Without a session the backend is waiting for the address to be confirmed.
        let outcome = if body.get("access_token").is_some() {
            let token: TokenResponse = serde_json::from_value(body)?;
            SignUpOutcome::SignedIn(self.store_session(token).await)
        } else {
            let user: AuthUser = serde_json::from_value(body)?;
            SignUpOutcome::PendingConfirmation(user.into())
        };

        let user = outcome.user();
        let row = json!({
            "id": user.id,
            "username": profile.username,
            "email": email,
            "full_name": profile.display_name,
        });
        let builder = self
            .request(Method::POST, &self.rest_url("user_profiles"))
            .await
            .json(&row);
        if let Err(err) = check_status(builder.send().await?).await {
            warn!(user_id = %user.id, "failed to create user profile: {err}");
        }

        info!(user_id = %user.id, "signed up");
        Ok(outcome)
    }

    async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<UserIdentity> {
        let builder = self
            .client
            .post(self.auth_url("token"))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }));
        let token: TokenResponse = read_json(builder.send().await?).await?;
        let user = self.store_session(token).await;
        info!(user_id = %user.id, "signed in");
        Ok(user)
    }

    async fn sign_out(&self) -> ServiceResult<()> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        let builder = self
            .client
            .post(self.auth_url("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token);
        check_status(builder.send().await?).await?;
        info!(user_id = %session.user.id, "signed out");
        Ok(())
    }

    async fn current_user(&self) -> ServiceResult<Option<UserIdentity>> {
        if self.session.read().await.is_none() {
            return Ok(None);
        }
        let response = self
            .request(Method::GET, &self.auth_url("user"))
            .await
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::UNAUTHORIZED {
            debug!("access token rejected, dropping session");
            *self.session.write().await = None;
            return Ok(None);
        }
        let user: AuthUser = read_json(response).await?;
        let user = UserIdentity::from(user);
        if let Some(session) = self.session.write().await.as_mut() {
            session.user = user.clone();
        }
        Ok(Some(user))
    }

    async fn provider_sign_in_url(&self, provider: OAuthProvider) -> ServiceResult<String> {
        let url = Url::parse_with_params(
            &self.auth_url("authorize"),
            &[
                ("provider", provider.as_str()),
                ("redirect_to", self.redirect_url.as_str()),
            ],
        )
        .map_err(|err| ServiceError::Validation(format!("invalid backend url: {err}")))?;
        Ok(url.to_string())
    }

    async fn record_owner(&self) -> ServiceResult<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.user.id.clone())
            .ok_or(ServiceError::Unauthenticated)
    }

    async fn insert_session(&self, session: FocusSession) -> ServiceResult<FocusSession> {
        self.insert("focus_sessions", &session).await
    }

    async fn transition_session(
        &self,
        owner: &str,
        session_id: &str,
        transition: SessionTransition,
    ) -> ServiceResult<Option<SessionUpdate>> {
        let changes = match transition {
            SessionTransition::Complete { actual_minutes, at } => json!({
                "completed": true,
                "actual_duration": actual_minutes,
                "completed_at": timestamp(at),
            }),
            SessionTransition::Cancel { at } => json!({ "cancelled_at": timestamp(at) }),
        };
        let updated: Vec<FocusSession> = self
            .update(
                "focus_sessions",
                &[
                    ("id", eq(session_id)),
                    ("user_id", eq(owner)),
                    ("completed", "eq.false".to_string()),
                    ("cancelled_at", "is.null".to_string()),
                ],
                &changes,
            )
            .await?;
        if let Some(session) = updated.into_iter().next() {
            return Ok(Some(SessionUpdate {
                session,
                changed: true,
            }));
        }

        // Either unknown or already finished.
        let existing: Vec<FocusSession> = self
            .select(
                "focus_sessions",
                &[
                    ("select", "*".to_string()),
                    ("id", eq(session_id)),
                    ("user_id", eq(owner)),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;
        Ok(existing.into_iter().next().map(|session| SessionUpdate {
            session,
            changed: false,
        }))
    }

    async fn list_sessions(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<FocusSession>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("user_id", eq(owner)),
            ("order", "started_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.select("focus_sessions", &query).await
    }

    async fn record_completion(&self, owner: &str, today: NaiveDate) -> ServiceResult<UserStats> {
        let builder = self
            .request(Method::POST, &self.rest_url("rpc/calculate_user_streak"))
            .await
            .json(&json!({ "user_uuid": owner }));
        let current_streak: u32 = read_json(builder.send().await?).await?;

        let builder = self
            .request(Method::POST, &self.rest_url("user_streaks"))
            .await
            .header("Prefer", "resolution=merge-duplicates")
            .json(&json!({
                "user_id": owner,
                "current_streak": current_streak,
                "last_activity_date": today.to_string(),
            }));
        check_status(builder.send().await?).await?;

        Ok(UserStats {
            current_streak,
            total_sessions: self.completed_session_count(owner).await?,
        })
    }

    async fn user_stats(&self, owner: &str, _today: NaiveDate) -> ServiceResult<UserStats> {
        let rows: Vec<StreakRow> = self
            .select(
                "user_streaks",
                &[
                    ("select", "current_streak".to_string()),
                    ("user_id", eq(owner)),
                ],
            )
            .await?;
        Ok(UserStats {
            current_streak: rows.first().map(|row| row.current_streak).unwrap_or(0),
            total_sessions: self.completed_session_count(owner).await?,
        })
    }

    async fn insert_mood(&self, entry: MoodEntry) -> ServiceResult<MoodEntry> {
        self.insert("mood_entries", &entry).await
    }

    async fn list_mood_entries(
        &self,
        owner: &str,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<MoodEntry>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("user_id", eq(owner)),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = limit {
            query.push(("limit", limit.to_string()));
        }
        self.select("mood_entries", &query).await
    }

    async fn mood_entries_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> ServiceResult<Vec<MoodEntry>> {
        self.select(
            "mood_entries",
            &[
                ("select", "*".to_string()),
                ("user_id", eq(owner)),
                ("created_at", format!("gte.{}", timestamp(since))),
                ("order", "created_at.asc".to_string()),
            ],
        )
        .await
    }

    async fn mood_history(&self, owner: &str, days: u32) -> ServiceResult<Vec<u8>> {
        let now = Utc::now();
        let entries = self
            .mood_entries_since(owner, window_start(now, days))
            .await?;
        let mut history = mood_trend(&entries, now.date_naive(), days);
        if history.len() > MOOD_HISTORY_CAPACITY {
            let excess = history.len() - MOOD_HISTORY_CAPACITY;
            history.drain(..excess);
        }
        Ok(history)
    }

    async fn entitlement(&self, owner: &str) -> ServiceResult<Option<Entitlement>> {
        let rows: Vec<Entitlement> = self
            .select(
                "user_profiles",
                &[
                    (
                        "select",
                        "subscription_tier,subscription_status,subscription_ends_at".to_string(),
                    ),
                    ("id", eq(owner)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn put_entitlement(
        &self,
        owner: &str,
        entitlement: &Entitlement,
    ) -> ServiceResult<Entitlement> {
        let changes = serde_json::to_value(entitlement)?;
        let rows: Vec<Entitlement> = self
            .update("user_profiles", &[("id", eq(owner))], &changes)
            .await?;
        first_row(rows, "user_profiles")
    }

    async fn tip_pool(&self, filter: TipFilter<'_>) -> ServiceResult<Vec<Tip>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("active", "eq.true".to_string()),
            ("order", "display_order.asc".to_string()),
        ];
        if !filter.include_premium {
            query.push(("is_premium", "eq.false".to_string()));
        }
        if let Some(category) = filter.category {
            query.push(("tip_category", eq(category)));
        }
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        self.select("daily_tips", &query).await
    }

    async fn insert_event(&self, event: AnalyticsEvent) -> ServiceResult<Option<AnalyticsEvent>> {
        Ok(Some(self.insert("app_analytics", &event).await?))
    }

    async fn events_since(
        &self,
        owner: &str,
        since: DateTime<Utc>,
    ) -> ServiceResult<Vec<AnalyticsEvent>> {
        self.select(
            "app_analytics",
            &[
                ("select", "*".to_string()),
                ("user_id", eq(owner)),
                ("created_at", format!("gte.{}", timestamp(since))),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_prefers_backend_text() {
        assert_eq!(
            error_message(
                r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#
            ),
            Some("Invalid login credentials".to_string())
        );
        assert_eq!(
            error_message(r#"{"code":"23505","message":"duplicate key value"}"#),
            Some("duplicate key value".to_string())
        );
        assert_eq!(error_message("upstream down"), Some("upstream down".to_string()));
        assert_eq!(error_message("   "), None);
    }

    #[test]
    fn metadata_name_falls_back_to_username() {
        let user: AuthUser = serde_json::from_value(json!({
            "id": "u-1",
            "email": "a@b.c",
            "user_metadata": { "username": "ab" }
        }))
        .unwrap();
        let identity = UserIdentity::from(user);
        assert_eq!(identity.display_name, "ab");
        assert_eq!(identity.email, "a@b.c");
    }

    #[tokio::test]
    async fn signed_out_remote_has_no_owner() {
        let backend =
            RemoteBackend::new("http://127.0.0.1:9", "anon", "http://localhost/cb").unwrap();
        assert!(matches!(
            backend.record_owner().await,
            Err(ServiceError::Unauthenticated)
        ));
        assert_eq!(backend.current_user().await.unwrap(), None);
        backend.sign_out().await.unwrap();
    }

    #[tokio::test]
    async fn provider_url_carries_redirect() {
        let backend = RemoteBackend::new(
            "https://demo.supabase.co/",
            "anon",
            "http://localhost:3000/auth/callback",
        )
        .unwrap();
        let url = backend
            .provider_sign_in_url(OAuthProvider::Apple)
            .await
            .unwrap();
        assert!(url.starts_with("https://demo.supabase.co/auth/v1/authorize?provider=apple"));
        assert!(url.contains("redirect_to=http%3A%2F%2Flocalhost%3A3000%2Fauth%2Fcallback"));
    }
}
