use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/auth/signup", post(handlers::sign_up))
        .route("/api/auth/signin", post(handlers::sign_in))
        .route("/api/auth/signout", post(handlers::sign_out))
        .route("/api/auth/user", get(handlers::current_user))
        .route("/api/auth/oauth", post(handlers::oauth))
        .route(
            "/api/sessions",
            get(handlers::list_sessions).post(handlers::start_session),
        )
        .route("/api/sessions/:id/complete", post(handlers::complete_session))
        .route("/api/sessions/:id/cancel", post(handlers::cancel_session))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/stats/week", get(handlers::get_focus_week))
        .route("/api/moods", get(handlers::list_moods).post(handlers::log_mood))
        .route("/api/moods/history", get(handlers::mood_history))
        .route("/api/moods/analytics", get(handlers::mood_analytics))
        .route("/api/tips/daily", get(handlers::daily_tip))
        .route("/api/tips/category/:category", get(handlers::tips_by_category))
        .route(
            "/api/subscription",
            get(handlers::get_subscription).put(handlers::update_subscription),
        )
        .route("/api/features/:feature", get(handlers::feature_access))
        .route("/api/timer", post(handlers::start_timer))
        .route(
            "/api/timer/:id",
            get(handlers::timer_remaining).delete(handlers::stop_timer),
        )
        .route(
            "/api/analytics/events",
            get(handlers::list_events).post(handlers::track_event),
        )
        .route("/api/export", get(handlers::export))
        .with_state(state)
}
