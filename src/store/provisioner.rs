//! Repository provisioning
//!
//! Each user's thoughts live in a fixed-name repository under their own
//! account. It is created lazily from a template the first time it is
//! needed. Existence is checked against GitHub every time; a repository can
//! be deleted or created out of band, so nothing is cached.

use std::sync::Arc;
use tracing::{info, warn};

use super::remote::{RemoteError, RemoteStore, RepoRef, TemplateRepoRequest};
use crate::config::Args;
use crate::types::TinymindError;

/// Description given to newly created repositories
pub const REPO_DESCRIPTION: &str = "My thoughts repository";

/// Where user repositories come from
#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub repo_name: String,
    pub template: RepoRef,
    pub private: bool,
}

impl ProvisionerConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            repo_name: args.repo_name.clone(),
            template: RepoRef::new(args.template_owner.clone(), args.template_repo.clone()),
            private: args.repo_private,
        }
    }
}

/// What `ensure_repository` found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionOutcome {
    /// The repository was already there (or a concurrent call created it)
    Existed,
    /// This call created it
    Created,
}

pub struct RepositoryProvisioner {
    remote: Arc<dyn RemoteStore>,
    config: ProvisionerConfig,
}

impl RepositoryProvisioner {
    pub fn new(remote: Arc<dyn RemoteStore>, config: ProvisionerConfig) -> Self {
        Self { remote, config }
    }

    /// The repository a user's thoughts live in
    pub fn repo_for(&self, username: &str) -> RepoRef {
        RepoRef::new(username, self.config.repo_name.clone())
    }

    /// Make sure the user's repository exists, creating it from the template if not.
    ///
    /// Only a definite "not found" leads to creation. Rate limits, auth and
    /// transport failures are returned as-is. If two first-time callers race,
    /// the loser sees "already exists" from the create call and treats it as
    /// success.
    pub async fn ensure_repository(
        &self,
        username: &str,
        token: &str,
    ) -> Result<ProvisionOutcome, TinymindError> {
        let repo = self.repo_for(username);

        match self.remote.get_repository(token, &repo).await {
            Ok(()) => return Ok(ProvisionOutcome::Existed),
            Err(RemoteError::NotFound) => {}
            Err(e) => {
                warn!(repo = %repo, error = %e, "Repository existence check failed");
                return Err(TinymindError::RepositoryProvisionFailed(format!(
                    "checking {}: {}",
                    repo, e
                )));
            }
        }

        let request = TemplateRepoRequest {
            template: self.config.template.clone(),
            target: repo.clone(),
            description: REPO_DESCRIPTION.to_string(),
            private: self.config.private,
        };

        match self.remote.create_repository_from_template(token, &request).await {
            Ok(()) => {
                info!(repo = %repo, template = %self.config.template, "Created repository from template");
                Ok(ProvisionOutcome::Created)
            }
            Err(RemoteError::AlreadyExists) => {
                info!(repo = %repo, "Repository created concurrently, continuing");
                Ok(ProvisionOutcome::Existed)
            }
            Err(e) => {
                warn!(repo = %repo, error = %e, "Repository creation failed");
                Err(TinymindError::RepositoryProvisionFailed(format!(
                    "creating {}: {}",
                    repo, e
                )))
            }
        }
    }
}
