use crate::backend::Backend;
use crate::errors::ServiceResult;
use crate::models::UserDataExport;
use chrono::Utc;
use std::sync::Arc;

#[derive(Clone)]
pub struct ExportService {
    backend: Arc<dyn Backend>,
}

impl ExportService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    /// All mood entries and focus sessions of the current user. Both lists
    /// are always present, whichever backend is active.
    pub async fn export_user_data(&self) -> ServiceResult<UserDataExport> {
        let owner = self.backend.record_owner().await?;
        let mood_entries = self.backend.list_mood_entries(&owner, None).await?;
        let focus_sessions = self.backend.list_sessions(&owner, None).await?;
        Ok(UserDataExport {
            mood_entries,
            focus_sessions,
            export_date: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::storage::LocalStore;

    #[tokio::test]
    async fn empty_export_still_has_both_lists() {
        let export = ExportService::new(Arc::new(LocalBackend::new(LocalStore::in_memory())));
        let document = serde_json::to_value(export.export_user_data().await.unwrap()).unwrap();
        assert_eq!(document["moodEntries"], serde_json::json!([]));
        assert_eq!(document["focusSessions"], serde_json::json!([]));
        assert!(document["exportDate"].is_string());
    }
}
