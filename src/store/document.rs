//! The thoughts document
//!
//! Single authoritative path for reading and writing a user's
//! ThoughtCollection. Every write is a compare-and-swap against the revision
//! observed by the read that preceded it in the same call:
//!
//! ```text
//! load ──absent──▶ put(Create)  ──AlreadyExists──▶ load again, update once
//!   │
//!   └─present──▶ prepend ──▶ put(Replace(rev)) ──Conflict──▶ ConcurrentModification
//! ```
//!
//! There is no merge and no retry inside the store. Callers that want to
//! retry a lost race re-run `append` from the top.

use std::sync::Arc;
use tracing::{debug, info, warn};

use super::remote::{RemoteError, RemoteStore, RepoRef, RevisionToken, WriteCondition};
use crate::config::Args;
use crate::types::{Thought, ThoughtCollection, TinymindError};

/// Commit message for the first write of the file
pub const CREATE_MESSAGE: &str = "Create thoughts.json";
/// Commit message for every later write
pub const APPEND_MESSAGE: &str = "Add new thought";

/// Where the document lives inside each user's repository
#[derive(Debug, Clone)]
pub struct DocumentConfig {
    pub repo_name: String,
    pub path: String,
}

impl DocumentConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            repo_name: args.repo_name.clone(),
            path: args.thoughts_path.trim_matches('/').to_string(),
        }
    }
}

/// Current state of the document
enum Loaded {
    Absent,
    Present {
        collection: ThoughtCollection,
        revision: RevisionToken,
    },
}

pub struct DocumentStore {
    remote: Arc<dyn RemoteStore>,
    config: DocumentConfig,
}

impl DocumentStore {
    pub fn new(remote: Arc<dyn RemoteStore>, config: DocumentConfig) -> Self {
        Self { remote, config }
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    fn repo_for(&self, username: &str) -> RepoRef {
        RepoRef::new(username, self.config.repo_name.clone())
    }

    /// Read the user's thoughts, newest first. A file that was never written reads as empty.
    pub async fn read(&self, username: &str, token: &str) -> Result<ThoughtCollection, TinymindError> {
        match self.load(&self.repo_for(username), token).await? {
            Loaded::Absent => Ok(ThoughtCollection::new()),
            Loaded::Present { collection, .. } => Ok(collection),
        }
    }

    /// Put `record` at the front of the user's thoughts.
    ///
    /// Fails with `ConcurrentModification` if another writer changed the
    /// file between this call's read and write.
    pub async fn append(&self, username: &str, token: &str, record: Thought) -> Result<(), TinymindError> {
        let repo = self.repo_for(username);

        let (collection, revision) = match self.load(&repo, token).await? {
            Loaded::Present { collection, revision } => (collection, revision),
            Loaded::Absent => {
                let initial = ThoughtCollection::from(vec![record.clone()]);
                match self
                    .write(&repo, token, CREATE_MESSAGE, &initial, WriteCondition::Create)
                    .await
                {
                    Ok(_) => {
                        info!(repo = %repo, path = %self.config.path, "Created thoughts document");
                        return Ok(());
                    }
                    Err(RemoteError::AlreadyExists) => {
                        debug!(repo = %repo, "Thoughts document appeared concurrently, switching to update");
                        match self.load(&repo, token).await? {
                            Loaded::Present { collection, revision } => (collection, revision),
                            Loaded::Absent => {
                                return Err(TinymindError::RemoteWriteFailed(format!(
                                    "{} reported as existing but could not be read",
                                    self.config.path
                                )))
                            }
                        }
                    }
                    Err(e) => return Err(self.write_error(&repo, e, false)),
                }
            }
        };

        let mut updated = collection;
        updated.prepend(record);

        match self
            .write(&repo, token, APPEND_MESSAGE, &updated, WriteCondition::Replace(revision))
            .await
        {
            Ok(new_revision) => {
                debug!(repo = %repo, revision = %new_revision, count = updated.len(), "Appended thought");
                Ok(())
            }
            Err(e) => Err(self.write_error(&repo, e, true)),
        }
    }

    async fn load(&self, repo: &RepoRef, token: &str) -> Result<Loaded, TinymindError> {
        let file = self
            .remote
            .get_file(token, repo, &self.config.path)
            .await
            .map_err(|e| {
                warn!(repo = %repo, path = %self.config.path, error = %e, "Reading thoughts failed");
                TinymindError::RemoteReadFailed(format!("{}/{}: {}", repo, self.config.path, e))
            })?;

        match file {
            None => Ok(Loaded::Absent),
            Some(file) => {
                let collection = ThoughtCollection::from_base64(&file.content_base64).map_err(|e| {
                    warn!(repo = %repo, path = %file.path, error = %e, "Thoughts document is corrupt");
                    e
                })?;
                Ok(Loaded::Present {
                    collection,
                    revision: file.revision,
                })
            }
        }
    }

    /// Whole-file write under a CAS condition. Encoding failures surface as
    /// `Unexpected` so the caller maps every outcome in one place.
    async fn write(
        &self,
        repo: &RepoRef,
        token: &str,
        message: &str,
        collection: &ThoughtCollection,
        condition: WriteCondition,
    ) -> Result<RevisionToken, RemoteError> {
        let encoded = collection.to_base64().map_err(|e| RemoteError::Unexpected {
            status: 0,
            message: e.to_string(),
        })?;

        self.remote
            .put_file(token, repo, &self.config.path, message, &encoded, condition)
            .await
    }

    /// Only a `Replace` can lose the compare-and-swap; a create has no
    /// revision to be stale against.
    fn write_error(&self, repo: &RepoRef, err: RemoteError, replacing: bool) -> TinymindError {
        match err {
            RemoteError::Conflict if replacing => {
                info!(repo = %repo, path = %self.config.path, "Lost compare-and-swap on thoughts document");
                TinymindError::ConcurrentModification {
                    path: format!("{}/{}", repo, self.config.path),
                }
            }
            other => {
                warn!(repo = %repo, path = %self.config.path, error = %other, "Writing thoughts failed");
                TinymindError::RemoteWriteFailed(format!("{}/{}: {}", repo, self.config.path, other))
            }
        }
    }
}
