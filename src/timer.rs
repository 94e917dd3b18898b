//! Countdown for running focus sessions.
//!
//! Each countdown ticks once per second. Reaching zero issues exactly one
//! completion call; stopping halts the tick and cancels the record.

use crate::errors::ServiceResult;
use crate::models::{FocusSession, SessionEventData, SessionType};
use crate::services::{AnalyticsService, SessionService};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

struct Countdown {
    remaining: watch::Receiver<u64>,
    stop: oneshot::Sender<()>,
}

#[derive(Clone)]
pub struct TimerRegistry {
    sessions: SessionService,
    analytics: AnalyticsService,
    countdowns: Arc<Mutex<HashMap<String, Countdown>>>,
}

impl TimerRegistry {
    pub fn new(sessions: SessionService, analytics: AnalyticsService) -> Self {
        Self {
            sessions,
            analytics,
            countdowns: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts a session record and its countdown.
    pub async fn start(
        &self,
        duration_minutes: u32,
        session_type: SessionType,
    ) -> ServiceResult<FocusSession> {
        let session = self
            .sessions
            .start_session(duration_minutes, session_type)
            .await?;

        let (remaining_tx, remaining_rx) = watch::channel(u64::from(duration_minutes) * 60);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.countdowns.lock().await.insert(
            session.id.clone(),
            Countdown {
                remaining: remaining_rx,
                stop: stop_tx,
            },
        );

        tokio::spawn(self.clone().run(session.clone(), remaining_tx, stop_rx));
        Ok(session)
    }

    /// Seconds left, or `None` when no countdown runs for this session.
    pub async fn remaining(&self, session_id: &str) -> Option<u64> {
        self.countdowns
            .lock()
            .await
            .get(session_id)
            .map(|countdown| *countdown.remaining.borrow())
    }

    /// Halts the countdown, if any, and cancels the record.
    pub async fn stop(&self, session_id: &str) -> ServiceResult<Option<FocusSession>> {
        if let Some(countdown) = self.countdowns.lock().await.remove(session_id) {
            let _ = countdown.stop.send(());
        }
        let session = self.sessions.cancel_session(session_id).await?;
        if let Some(session) = &session {
            self.track("session_stopped", session).await;
        }
        Ok(session)
    }

    async fn run(
        self,
        session: FocusSession,
        remaining: watch::Sender<u64>,
        mut stop: oneshot::Receiver<()>,
    ) {
        let mut ticker = interval(Duration::from_secs(1));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately.
        ticker.tick().await;

        loop {
            let left = *remaining.borrow();
            if left == 0 {
                break;
            }
            tokio::select! {
                _ = &mut stop => {
                    debug!(session_id = %session.id, "countdown stopped");
                    return;
                }
                _ = ticker.tick() => {
                    remaining.send_modify(|left| *left = left.saturating_sub(1));
                }
            }
        }

        if self.countdowns.lock().await.remove(&session.id).is_none() {
            // Stopped between the last tick and now.
            return;
        }

        let minutes = session.planned_duration_minutes;
        match self.sessions.complete_session(&session.id, minutes).await {
            Ok(Some(completed)) => {
                info!(session_id = %completed.id, "countdown finished");
                self.track("session_completed", &completed).await;
            }
            Ok(None) => warn!(session_id = %session.id, "countdown finished for unknown session"),
            Err(err) => warn!(session_id = %session.id, "failed to complete session: {err}"),
        }
    }

    async fn track(&self, event_type: &str, session: &FocusSession) {
        let data = SessionEventData {
            session_duration: session.planned_duration_minutes,
            session_type: session.session_type,
            completed: session.completed,
            interruptions: 0,
        };
        if let Err(err) = self.analytics.track_session_event(event_type, data).await {
            debug!("failed to record {event_type}: {err}");
        }
    }
}
