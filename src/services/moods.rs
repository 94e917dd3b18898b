use crate::backend::Backend;
use crate::errors::ServiceResult;
use crate::models::{MoodEntry, MoodInput};
use crate::stats::window_start;
use chrono::Utc;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct MoodService {
    backend: Arc<dyn Backend>,
}

impl MoodService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// Stores a new entry. The score range is checked by callers.
    pub async fn log_mood(
        &self,
        input: MoodInput,
        session_id: Option<String>,
    ) -> ServiceResult<MoodEntry> {
        let owner = self.backend.record_owner().await?;
        let now = Utc::now();
        let entry = MoodEntry {
            id: Uuid::new_v4().to_string(),
            user_id: owner,
            session_id,
            mood_score: input.score,
            mood_emoji: input.emoji,
            energy_level: input.energy,
            stress_level: input.stress,
            notes: input.notes,
            created_at: now,
            date: now.date_naive(),
        };
        let entry = self.backend.insert_mood(entry).await?;
        info!(
            entry_id = %entry.id,
            score = entry.mood_score,
            after_session = entry.after_session(),
            "mood logged"
        );
        Ok(entry)
    }

    pub async fn get_mood_entries(&self, limit: usize) -> ServiceResult<Vec<MoodEntry>> {
        let owner = self.backend.record_owner().await?;
        self.backend.list_mood_entries(&owner, Some(limit)).await
    }

    /// Trend series for charting, oldest first.
    pub async fn get_mood_history(&self, days: u32) -> ServiceResult<Vec<u8>> {
        let owner = self.backend.record_owner().await?;
        self.backend.mood_history(&owner, days).await
    }

    /// Entries logged in the trailing `days` window, oldest first.
    pub async fn get_mood_analytics(&self, days: u32) -> ServiceResult<Vec<MoodEntry>> {
        let owner = self.backend.record_owner().await?;
        let since = window_start(Utc::now(), days);
        self.backend.mood_entries_since(&owner, since).await
    }
}
