use crate::backend::{Backend, BackendKind};
use crate::errors::ServiceResult;
use crate::models::{OAuthProvider, SignUpOutcome, SignUpProfile, UserIdentity};
use std::sync::Arc;
use tracing::info;

#[derive(Clone)]
pub struct IdentityService {
    backend: Arc<dyn Backend>,
}

impl IdentityService {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self { backend }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        profile: &SignUpProfile,
    ) -> ServiceResult<SignUpOutcome> {
        let outcome = self.backend.sign_up(email, password, profile).await?;
        if let SignUpOutcome::PendingConfirmation(user) = &outcome {
            info!(user_id = %user.id, "sign-up awaiting email confirmation");
        }
        Ok(outcome)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<UserIdentity> {
        self.backend.sign_in(email, password).await
    }

    /// Succeeds even when nobody is signed in.
    pub async fn sign_out(&self) -> ServiceResult<()> {
        self.backend.sign_out().await
    }

    pub async fn current_user(&self) -> ServiceResult<Option<UserIdentity>> {
        self.backend.current_user().await
    }

    /// URL the caller must be redirected to for a provider login.
    pub async fn sign_in_with_provider(&self, provider: OAuthProvider) -> ServiceResult<String> {
        self.backend.provider_sign_in_url(provider).await
    }
}
