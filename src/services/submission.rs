//! Thought submission
//!
//! Validates input, builds the record, makes sure the repository exists and
//! appends. A lost compare-and-swap re-runs the append from its read, up to
//! `max_attempts` times in total. Nothing is visible to readers unless the
//! final write lands; a repository created along the way stays, which is
//! harmless since provisioning is idempotent.

use chrono::Utc;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::Session;
use crate::store::{DocumentStore, RepositoryProvisioner};
use crate::types::{Thought, TinymindError, ValidationError};

pub struct SubmissionService {
    provisioner: Arc<RepositoryProvisioner>,
    documents: Arc<DocumentStore>,
    max_attempts: u32,
}

impl SubmissionService {
    pub fn new(
        provisioner: Arc<RepositoryProvisioner>,
        documents: Arc<DocumentStore>,
        max_attempts: u32,
    ) -> Self {
        Self {
            provisioner,
            documents,
            max_attempts: max_attempts.max(1),
        }
    }

    /// Append `content` to the session user's thoughts and return the stored record.
    ///
    /// Session and content are checked before any remote call.
    pub async fn submit(&self, session: Option<&Session>, content: &str) -> Result<Thought, TinymindError> {
        let session = session.ok_or(TinymindError::ValidationFailed(ValidationError::MissingSession))?;
        if content.trim().is_empty() {
            return Err(TinymindError::ValidationFailed(ValidationError::EmptyContent));
        }

        let record = Thought::new(content, session.username.as_str(), Utc::now());

        self.provisioner
            .ensure_repository(&session.username, &session.access_token)
            .await?;

        let mut attempt = 1;
        loop {
            match self
                .documents
                .append(&session.username, &session.access_token, record.clone())
                .await
            {
                Ok(()) => {
                    info!(user = %session.username, id = %record.id, attempt, "Thought submitted");
                    return Ok(record);
                }
                Err(e) if e.is_retriable() && attempt < self.max_attempts => {
                    warn!(user = %session.username, attempt, "Concurrent update, retrying append");
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
