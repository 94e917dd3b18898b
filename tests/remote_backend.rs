use chrono::{Duration, Utc};
use dopamind::backend::{Backend, RemoteBackend};
use dopamind::models::{MoodInput, SessionType, SignUpOutcome, SignUpProfile};
use dopamind::services::default_tips;
use dopamind::{ServiceError, Services};
use serde_json::json;
use std::sync::Arc;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ANON_KEY: &str = "anon-key";
const TOKEN: &str = "tok-1";
const USER_ID: &str = "u-1";

fn remote_services(server: &MockServer) -> (Arc<RemoteBackend>, Services) {
    let backend = Arc::new(
        RemoteBackend::new(&server.uri(), ANON_KEY, "http://localhost:3000/auth/callback")
            .unwrap(),
    );
    let services = Services::new(backend.clone());
    (backend, services)
}

fn session_row(completed: bool) -> serde_json::Value {
    json!({
        "id": "sess-1",
        "user_id": USER_ID,
        "session_duration": 25,
        "actual_duration": if completed { json!(25) } else { json!(null) },
        "session_type": "focus",
        "started_at": "2026-01-05T09:00:00Z",
        "completed_at": if completed { json!("2026-01-05T09:25:00Z") } else { json!(null) },
        "completed": completed,
        "cancelled_at": null,
    })
}

async fn mount_sign_in(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .and(header("apikey", ANON_KEY))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": TOKEN,
            "token_type": "bearer",
            "user": {
                "id": USER_ID,
                "email": "a@b.c",
                "user_metadata": { "full_name": "Ada" }
            }
        })))
        .mount(server)
        .await;
}

async fn signed_in(server: &MockServer) -> Services {
    mount_sign_in(server).await;
    let (_, services) = remote_services(server);
    services.identity.sign_in("a@b.c", "pw").await.unwrap();
    services
}

#[tokio::test]
async fn sign_in_stores_session_and_scopes_records() {
    let server = MockServer::start().await;
    mount_sign_in(&server).await;
    let (backend, services) = remote_services(&server);

    let user = services.identity.sign_in("a@b.c", "pw").await.unwrap();
    assert_eq!(user.id, USER_ID);
    assert_eq!(user.display_name, "Ada");
    assert_eq!(backend.record_owner().await.unwrap(), USER_ID);
}

#[tokio::test]
async fn sign_up_without_token_is_pending_confirmation() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/signup"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "u-2",
            "email": "new@b.c",
            "user_metadata": { "full_name": "New" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_profiles"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    let (_, services) = remote_services(&server);

    let profile = SignUpProfile {
        display_name: "New".into(),
        username: Some("new".into()),
    };
    let outcome = services
        .identity
        .sign_up("new@b.c", "pw", &profile)
        .await
        .unwrap();
    assert!(matches!(outcome, SignUpOutcome::PendingConfirmation(_)));
    assert_eq!(outcome.user().id, "u-2");

    let err = services
        .sessions
        .start_session(25, SessionType::Focus)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Unauthenticated));
}

#[tokio::test]
async fn backend_error_message_is_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": "invalid_grant",
            "error_description": "Invalid login credentials"
        })))
        .mount(&server)
        .await;
    let (_, services) = remote_services(&server);

    let err = services.identity.sign_in("a@b.c", "bad").await.unwrap_err();
    assert_eq!(err.to_string(), "Invalid login credentials");
    assert!(matches!(err, ServiceError::Remote { status: 400, .. }));
}

#[tokio::test]
async fn completing_session_refreshes_streak() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    Mock::given(method("POST"))
        .and(path("/rest/v1/focus_sessions"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .and(header("prefer", "return=representation"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([session_row(false)])))
        .mount(&server)
        .await;
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/focus_sessions"))
        .and(query_param("id", "eq.sess-1"))
        .and(query_param("completed", "eq.false"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([session_row(true)])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/calculate_user_streak"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(3)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/user_streaks"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/focus_sessions"))
        .and(query_param("completed", "eq.true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{ "id": "sess-1" }])))
        .mount(&server)
        .await;

    let started = services
        .sessions
        .start_session(25, SessionType::Focus)
        .await
        .unwrap();
    assert_eq!(started.user_id, USER_ID);

    let completed = services
        .sessions
        .complete_session("sess-1", 25)
        .await
        .unwrap()
        .unwrap();
    assert!(completed.completed);
    assert_eq!(completed.actual_duration_minutes, Some(25));
}

#[tokio::test]
async fn completing_unknown_session_touches_nothing() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/focus_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/focus_sessions"))
        .and(query_param("id", "eq.missing"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/calculate_user_streak"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(1)))
        .expect(0)
        .mount(&server)
        .await;

    let result = services
        .sessions
        .complete_session("missing", 10)
        .await
        .unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn daily_tip_falls_back_when_pool_fails() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/daily_tips"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    let (_, services) = remote_services(&server);

    let tip = services.tips.get_daily_tip().await;
    assert!(!tip.is_premium);
    assert!(default_tips().contains(&tip));

    let err = services
        .tips
        .get_tips_by_category("focus")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "boom");
}

#[tokio::test]
async fn mood_history_is_built_from_entries() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    let now = Utc::now();
    let entry = |score: u8, at: chrono::DateTime<Utc>| {
        json!({
            "id": format!("m-{score}"),
            "user_id": USER_ID,
            "mood_score": score,
            "created_at": at.to_rfc3339(),
            "date": at.date_naive().to_string(),
        })
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/mood_entries"))
        .and(query_param("user_id", format!("eq.{USER_ID}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            entry(4, now - Duration::hours(1)),
            entry(2, now - Duration::days(2)),
        ])))
        .mount(&server)
        .await;

    let history = services.moods.get_mood_history(7).await.unwrap();
    assert_eq!(history, vec![2, 4]);
}

#[tokio::test]
async fn logged_mood_carries_owner() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    let now = Utc::now();
    Mock::given(method("POST"))
        .and(path("/rest/v1/mood_entries"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!([{
            "id": "m-1",
            "user_id": USER_ID,
            "session_id": "sess-1",
            "mood_score": 5,
            "energy_level": 7,
            "created_at": now.to_rfc3339(),
            "date": now.date_naive().to_string(),
        }])))
        .expect(1)
        .mount(&server)
        .await;

    let input = MoodInput {
        score: 5,
        energy: Some(7),
        ..MoodInput::default()
    };
    let entry = services
        .moods
        .log_mood(input, Some("sess-1".into()))
        .await
        .unwrap();
    assert_eq!(entry.user_id, USER_ID);
    assert!(entry.after_session());
}

#[tokio::test]
async fn rejected_token_signs_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/v1/user"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "msg": "JWT expired" })))
        .mount(&server)
        .await;
    let services = signed_in(&server).await;

    assert_eq!(services.identity.current_user().await.unwrap(), None);
    assert!(matches!(
        services.sessions.get_user_stats().await,
        Err(ServiceError::Unauthenticated)
    ));
}

#[tokio::test]
async fn mood_history_keeps_latest_seven_scores() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    let now = Utc::now();
    let rows: Vec<serde_json::Value> = (0..10u8)
        .map(|i| {
            let at = now - Duration::minutes(i64::from(10 - i));
            json!({
                "id": format!("m-{i}"),
                "user_id": USER_ID,
                "mood_score": i % 5 + 1,
                "created_at": at.to_rfc3339(),
                "date": at.date_naive().to_string(),
            })
        })
        .collect();
    Mock::given(method("GET"))
        .and(path("/rest/v1/mood_entries"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!(rows)))
        .mount(&server)
        .await;

    let history = services.moods.get_mood_history(7).await.unwrap();
    assert_eq!(history, vec![4, 5, 1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn oversized_window_starts_at_epoch() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/mood_entries"))
        .and(query_param("created_at", "gte.1970-01-01T00:00:00.000Z"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    assert!(services.moods.get_mood_history(u32::MAX).await.unwrap().is_empty());
    assert!(services
        .moods
        .get_mood_analytics(u32::MAX)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn mood_entries_request_newest_first_with_limit() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    let now = Utc::now();
    let row = |id: &str, score: u8, at: chrono::DateTime<Utc>| {
        json!({
            "id": id,
            "user_id": USER_ID,
            "mood_score": score,
            "created_at": at.to_rfc3339(),
            "date": at.date_naive().to_string(),
        })
    };
    Mock::given(method("GET"))
        .and(path("/rest/v1/mood_entries"))
        .and(query_param("user_id", format!("eq.{USER_ID}").as_str()))
        .and(query_param("order", "created_at.desc"))
        .and(query_param("limit", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row("m-new", 5, now),
            row("m-old", 3, now - Duration::hours(2)),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let entries = services.moods.get_mood_entries(2).await.unwrap();
    let ids: Vec<&str> = entries.iter().map(|entry| entry.id.as_str()).collect();
    assert_eq!(ids, vec!["m-new", "m-old"]);
}

#[tokio::test]
async fn sessions_request_newest_first_with_limit() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    let mut newer = session_row(false);
    newer["id"] = json!("sess-2");
    newer["started_at"] = json!("2026-01-05T10:00:00Z");
    Mock::given(method("GET"))
        .and(path("/rest/v1/focus_sessions"))
        .and(query_param("user_id", format!("eq.{USER_ID}").as_str()))
        .and(query_param("order", "started_at.desc"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([newer, session_row(true)])))
        .expect(1)
        .mount(&server)
        .await;

    let sessions = services.sessions.get_user_sessions(10).await.unwrap();
    let ids: Vec<&str> = sessions.iter().map(|session| session.id.as_str()).collect();
    assert_eq!(ids, vec!["sess-2", "sess-1"]);
    assert!(sessions[0].started_at > sessions[1].started_at);
}

#[tokio::test]
async fn failed_streak_refresh_still_returns_completed_session() {
    let server = MockServer::start().await;
    let services = signed_in(&server).await;

    Mock::given(method("PATCH"))
        .and(path("/rest/v1/focus_sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([session_row(true)])))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/rest/v1/rpc/calculate_user_streak"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "message": "rpc down" })))
        .expect(1)
        .mount(&server)
        .await;

    let completed = services
        .sessions
        .complete_session("sess-1", 25)
        .await
        .unwrap()
        .expect("completed row is returned");
    assert!(completed.completed);
    assert_eq!(completed.actual_duration_minutes, Some(25));
}
