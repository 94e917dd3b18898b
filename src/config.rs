use crate::backend::{Backend, LocalBackend, RemoteBackend};
use crate::errors::ServiceResult;
use crate::storage::LocalStore;
use std::{env, path::PathBuf, sync::Arc};
use tracing::info;

const DEFAULT_DATA_PATH: &str = "data/dopamind.json";
const DEFAULT_REDIRECT_URL: &str = "http://localhost:3000/auth/callback";
const DEFAULT_PORT: u16 = 8080;

/// Process-wide settings, fixed for the lifetime of the process.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub data_path: PathBuf,
    pub port: u16,
    pub oauth_redirect_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            supabase_url: env::var("SUPABASE_URL").unwrap_or_default(),
            supabase_anon_key: env::var("SUPABASE_ANON_KEY").unwrap_or_default(),
            data_path: env::var("APP_DATA_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_PATH)),
            port: env::var("PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(DEFAULT_PORT),
            oauth_redirect_url: env::var("OAUTH_REDIRECT_URL")
                .unwrap_or_else(|_| DEFAULT_REDIRECT_URL.to_string()),
        }
    }

    pub fn is_remote_configured(&self) -> bool {
        !self.supabase_url.trim().is_empty() && !self.supabase_anon_key.trim().is_empty()
    }

    /// Builds the single storage backend used by every service.
    pub async fn backend(&self) -> ServiceResult<Arc<dyn Backend>> {
        if self.is_remote_configured() {
            info!(url = %self.supabase_url, "using hosted backend");
            let remote = RemoteBackend::new(
                &self.supabase_url,
                &self.supabase_anon_key,
                &self.oauth_redirect_url,
            )?;
            return Ok(Arc::new(remote));
        }

        info!(path = %self.data_path.display(), "hosted backend not configured, using local storage");
        let store = LocalStore::open(self.data_path.clone()).await?;
        Ok(Arc::new(LocalBackend::new(store)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, key: &str) -> Config {
        Config {
            supabase_url: url.into(),
            supabase_anon_key: key.into(),
            ..Config::default()
        }
    }

    #[test]
    fn remote_requires_both_values() {
        assert!(config("https://x.supabase.co", "anon").is_remote_configured());
        assert!(!config("https://x.supabase.co", "").is_remote_configured());
        assert!(!config("", "anon").is_remote_configured());
        assert!(!config("  ", "anon").is_remote_configured());
    }

    #[tokio::test]
    async fn unconfigured_remote_selects_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config {
            data_path: dir.path().join("state.json"),
            ..Config::default()
        };
        let backend = cfg.backend().await.unwrap();
        assert_eq!(backend.kind(), crate::backend::BackendKind::Local);
    }
}
