use crate::errors::ServiceResult;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::{collections::BTreeMap, path::Path, path::PathBuf, sync::Arc};
use tokio::{fs, sync::Mutex};
use tracing::error;

pub const USER_KEY: &str = "dopamind_user";
pub const SESSIONS_KEY: &str = "dopamind_sessions";
pub const MOOD_ENTRIES_KEY: &str = "dopamind_mood_entries";
pub const MOOD_HISTORY_KEY: &str = "dopamind_mood_history";
pub const STREAK_KEY: &str = "dopamind_streak";
pub const TOTAL_SESSIONS_KEY: &str = "dopamind_total_sessions";
pub const SUBSCRIPTION_KEY: &str = "dopamind_subscription";

/// String-keyed JSON blobs, the on-disk analogue of browser local storage.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalData {
    entries: BTreeMap<String, serde_json::Value>,
}

impl LocalData {
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> ServiceResult<Option<T>> {
        match self.entries.get(key) {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }

    pub fn get_or_default<T: DeserializeOwned + Default>(&self, key: &str) -> ServiceResult<T> {
        Ok(self.get(key)?.unwrap_or_default())
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> ServiceResult<()> {
        self.entries.insert(key.to_string(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

/// Shared handle to the local key-value file.
///
/// Every write goes through [`LocalStore::write`], which applies the change
/// to a copy, persists it and only then publishes it, all under one lock.
#[derive(Debug, Clone)]
pub struct LocalStore {
    path: Option<PathBuf>,
    data: Arc<Mutex<LocalData>>,
}

impl LocalStore {
    pub async fn open(path: PathBuf) -> ServiceResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let data = load_data(&path).await;
        Ok(Self {
            path: Some(path),
            data: Arc::new(Mutex::new(data)),
        })
    }

    /// A store that is never written to disk.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Arc::new(Mutex::new(LocalData::default())),
        }
    }

    pub async fn read<R>(&self, f: impl FnOnce(&LocalData) -> ServiceResult<R>) -> ServiceResult<R> {
        let data = self.data.lock().await;
        f(&data)
    }

    pub async fn write<R>(
        &self,
        f: impl FnOnce(&mut LocalData) -> ServiceResult<R>,
    ) -> ServiceResult<R> {
        let mut data = self.data.lock().await;
        let mut next = data.clone();
        let result = f(&mut next)?;
        if let Some(path) = &self.path {
            persist_data(path, &next).await?;
        }
        *data = next;
        Ok(result)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> ServiceResult<Option<T>> {
        self.read(|data| data.get(key)).await
    }

    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> ServiceResult<()> {
        self.write(|data| data.set(key, value)).await
    }

    pub async fn remove(&self, key: &str) -> ServiceResult<()> {
        self.write(|data| {
            data.remove(key);
            Ok(())
        })
        .await
    }
}

pub async fn load_data(path: &Path) -> LocalData {
    match fs::read(path).await {
        Ok(bytes) => match serde_json::from_slice(&bytes) {
            Ok(data) => data,
            Err(err) => {
                error!("failed to parse local data file: {err}");
                LocalData::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => LocalData::default(),
        Err(err) => {
            error!("failed to read local data file: {err}");
            LocalData::default()
        }
    }
}

pub async fn persist_data(path: &Path, data: &LocalData) -> ServiceResult<()> {
    let payload = serde_json::to_vec_pretty(data)?;
    fs::write(path, payload).await?;
    Ok(())
}
