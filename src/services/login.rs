//! Login callback flow
//!
//! code → access token → identity → session cookies → repository.
//! Provisioning at login only warms things up; a failure there is logged
//! and the login still succeeds, since every submission provisions again.

use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{Identity, OAuthProvider, SessionManager};
use crate::store::{ProvisionOutcome, RepositoryProvisioner};
use crate::types::TinymindError;

/// Result of a completed login
#[derive(Debug)]
pub struct LoginOutcome {
    pub identity: Identity,
    /// `Set-Cookie` values for the new session
    pub cookies: [String; 2],
    /// None if provisioning failed
    pub repository: Option<ProvisionOutcome>,
}

pub struct LoginService {
    provider: Arc<dyn OAuthProvider>,
    provisioner: Arc<RepositoryProvisioner>,
    sessions: SessionManager,
}

impl LoginService {
    pub fn new(
        provider: Arc<dyn OAuthProvider>,
        provisioner: Arc<RepositoryProvisioner>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            provider,
            provisioner,
            sessions,
        }
    }

    /// Where to send a browser that starts a login
    pub fn authorize_url(&self) -> String {
        self.provider.authorize_url()
    }

    /// Finish a login from the provider's callback code
    pub async fn complete(&self, code: &str) -> Result<LoginOutcome, TinymindError> {
        if code.is_empty() {
            return Err(TinymindError::AuthExchangeFailed("empty authorization code".into()));
        }

        let access_token = self.provider.exchange_code(code).await?;
        let identity = self.provider.fetch_identity(&access_token).await?;
        let cookies = self.sessions.materialize(&identity.login, &access_token)?;

        let repository = match self
            .provisioner
            .ensure_repository(&identity.login, &access_token)
            .await
        {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(user = %identity.login, error = %e, "Provisioning at login failed, continuing");
                None
            }
        };

        info!(user = %identity.login, repository = ?repository, "Login completed");

        Ok(LoginOutcome {
            identity,
            cookies,
            repository,
        })
    }
}
