use crate::errors::AppError;
use crate::models::{
    AnalyticsEvent, CompleteSessionRequest, DailyFocusPoint, DaysQuery, Entitlement,
    FeatureAccessResponse, FocusSession, LimitQuery, LogMoodRequest, MoodEntry, OAuthRequest,
    OAuthResponse, SignInRequest, SignUpOutcome, SignUpProfile, SignUpRequest,
    StartSessionRequest, Tip, TimerResponse, TrackEventRequest, UpdateSubscriptionRequest,
    UserIdentity, UserStats,
};
use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use serde_json::json;

const DEFAULT_SESSION_LIMIT: usize = 50;
const DEFAULT_MOOD_LIMIT: usize = 30;
const DEFAULT_HISTORY_DAYS: u32 = 7;
const DEFAULT_ANALYTICS_DAYS: u32 = 30;

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({ "backend": state.services.identity.backend_kind() }))
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> Result<Json<SignUpOutcome>, AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::bad_request("email is required"));
    }
    let profile = SignUpProfile {
        display_name: payload.display_name,
        username: payload.username,
    };
    let outcome = state
        .services
        .identity
        .sign_up(email, &payload.password, &profile)
        .await?;
    Ok(Json(outcome))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<UserIdentity>, AppError> {
    let email = payload.email.trim();
    if email.is_empty() {
        return Err(AppError::bad_request("email is required"));
    }
    let user = state
        .services
        .identity
        .sign_in(email, &payload.password)
        .await?;
    Ok(Json(user))
}

pub async fn sign_out(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state.services.identity.sign_out().await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn current_user(
    State(state): State<AppState>,
) -> Result<Json<Option<UserIdentity>>, AppError> {
    Ok(Json(state.services.identity.current_user().await?))
}

pub async fn oauth(
    State(state): State<AppState>,
    Json(payload): Json<OAuthRequest>,
) -> Result<Json<OAuthResponse>, AppError> {
    let url = state
        .services
        .identity
        .sign_in_with_provider(payload.provider)
        .await?;
    Ok(Json(OAuthResponse { url }))
}

pub async fn start_session(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<FocusSession>, AppError> {
    validate_duration(payload.duration_minutes)?;
    let session = state
        .services
        .sessions
        .start_session(payload.duration_minutes, payload.session_type)
        .await?;
    Ok(Json(session))
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<FocusSession>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_SESSION_LIMIT);
    Ok(Json(state.services.sessions.get_user_sessions(limit).await?))
}

/// Responds with `null` when no session has this id.
pub async fn complete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CompleteSessionRequest>,
) -> Result<Json<Option<FocusSession>>, AppError> {
    let session = state
        .services
        .sessions
        .complete_session(&id, payload.actual_duration_minutes)
        .await?;
    Ok(Json(session))
}

pub async fn cancel_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<FocusSession>>, AppError> {
    Ok(Json(state.services.sessions.cancel_session(&id).await?))
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<UserStats>, AppError> {
    Ok(Json(state.services.sessions.get_user_stats().await?))
}

pub async fn get_focus_week(
    State(state): State<AppState>,
) -> Result<Json<Vec<DailyFocusPoint>>, AppError> {
    Ok(Json(state.services.sessions.get_focus_week().await?))
}

pub async fn log_mood(
    State(state): State<AppState>,
    Json(payload): Json<LogMoodRequest>,
) -> Result<Json<MoodEntry>, AppError> {
    let mood = payload.mood;
    if !(1..=5).contains(&mood.score) {
        return Err(AppError::bad_request("score must be between 1 and 5"));
    }
    for (name, level) in [("energy", mood.energy), ("stress", mood.stress)] {
        if level.is_some_and(|level| !(1..=10).contains(&level)) {
            return Err(AppError::bad_request(format!(
                "{name} must be between 1 and 10"
            )));
        }
    }
    let entry = state
        .services
        .moods
        .log_mood(mood, payload.session_id)
        .await?;
    Ok(Json(entry))
}

pub async fn list_moods(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<Vec<MoodEntry>>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_MOOD_LIMIT);
    Ok(Json(state.services.moods.get_mood_entries(limit).await?))
}

pub async fn mood_history(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<u8>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_HISTORY_DAYS);
    Ok(Json(state.services.moods.get_mood_history(days).await?))
}

pub async fn mood_analytics(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<MoodEntry>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    Ok(Json(state.services.moods.get_mood_analytics(days).await?))
}

pub async fn daily_tip(State(state): State<AppState>) -> Json<Tip> {
    Json(state.services.tips.get_daily_tip().await)
}

pub async fn tips_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<Tip>>, AppError> {
    Ok(Json(
        state.services.tips.get_tips_by_category(&category).await?,
    ))
}

pub async fn get_subscription(
    State(state): State<AppState>,
) -> Result<Json<Entitlement>, AppError> {
    Ok(Json(
        state
            .services
            .entitlements
            .check_subscription_status()
            .await?,
    ))
}

pub async fn update_subscription(
    State(state): State<AppState>,
    Json(payload): Json<UpdateSubscriptionRequest>,
) -> Result<Json<Entitlement>, AppError> {
    let entitlement = state
        .services
        .entitlements
        .update_subscription(payload.tier, payload.status, payload.ends_at)
        .await?;
    Ok(Json(entitlement))
}

pub async fn feature_access(
    State(state): State<AppState>,
    Path(feature): Path<String>,
) -> Json<FeatureAccessResponse> {
    let access = state
        .services
        .entitlements
        .has_feature_access(&feature)
        .await;
    Json(FeatureAccessResponse { feature, access })
}

pub async fn start_timer(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<Json<FocusSession>, AppError> {
    validate_duration(payload.duration_minutes)?;
    let session = state
        .timers
        .start(payload.duration_minutes, payload.session_type)
        .await?;
    Ok(Json(session))
}

pub async fn timer_remaining(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TimerResponse>, AppError> {
    let remaining_seconds = state
        .timers
        .remaining(&id)
        .await
        .ok_or_else(|| AppError::not_found("no countdown for this session"))?;
    Ok(Json(TimerResponse {
        session_id: id,
        remaining_seconds,
    }))
}

pub async fn stop_timer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Option<FocusSession>>, AppError> {
    Ok(Json(state.timers.stop(&id).await?))
}

pub async fn track_event(
    State(state): State<AppState>,
    Json(payload): Json<TrackEventRequest>,
) -> Result<Json<Option<AnalyticsEvent>>, AppError> {
    if payload.event_type.trim().is_empty() {
        return Err(AppError::bad_request("event_type is required"));
    }
    let event = state
        .services
        .analytics
        .track_event(
            &payload.event_type,
            payload.event_data,
            payload.screen_name.as_deref(),
        )
        .await?;
    Ok(Json(event))
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<DaysQuery>,
) -> Result<Json<Vec<AnalyticsEvent>>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_ANALYTICS_DAYS);
    Ok(Json(state.services.analytics.get_user_analytics(days).await?))
}

/// Export document served as a file download.
pub async fn export(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let document = state.services.export.export_user_data().await?;
    let body = serde_json::to_string_pretty(&document).map_err(AppError::internal)?;
    let filename = format!(
        "attachment; filename=\"dopamind-data-{}.json\"",
        document.export_date.format("%Y-%m-%d")
    );
    Ok((
        [
            (header::CONTENT_TYPE, "application/json".to_string()),
            (header::CONTENT_DISPOSITION, filename),
        ],
        body,
    ))
}

fn validate_duration(minutes: u32) -> Result<(), AppError> {
    if minutes == 0 {
        return Err(AppError::bad_request("duration_minutes must be positive"));
    }
    Ok(())
}
