//! In-memory `RemoteStore`
//!
//! Behaves like the content API for the calls Tinymind makes: revision
//! tokens are SHA-256 digests of file content, `Replace` with a stale
//! revision is a `Conflict`, `Create` over an existing file is
//! `AlreadyExists`. Backs the tests.

use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use super::remote::{
    RemoteError, RemoteFile, RemoteStore, RepoRef, RevisionToken, TemplateRepoRequest,
    WriteCondition,
};

#[derive(Debug, Clone)]
struct StoredFile {
    content_base64: String,
    revision: RevisionToken,
    message: String,
}

/// A write another client slips in right before our next `put_file`
#[derive(Debug, Clone)]
struct PendingRace {
    repo: RepoRef,
    path: String,
    content_base64: String,
}

/// In-memory repository host
#[derive(Default)]
pub struct InMemoryRemote {
    repos: RwLock<HashSet<RepoRef>>,
    files: RwLock<HashMap<(RepoRef, String), StoredFile>>,
    failure: RwLock<Option<RemoteError>>,
    race: RwLock<Option<PendingRace>>,
    calls: AtomicUsize,
}

impl InMemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of remote calls made so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn add_repository(&self, repo: RepoRef) {
        self.repos.write().await.insert(repo);
    }

    pub async fn has_repository(&self, repo: &RepoRef) -> bool {
        self.repos.read().await.contains(repo)
    }

    /// Place a file directly, bypassing revision checks
    pub async fn seed_file(&self, repo: &RepoRef, path: &str, content_base64: &str) -> RevisionToken {
        let revision = revision_of(content_base64);
        self.files.write().await.insert(
            (repo.clone(), path.to_string()),
            StoredFile {
                content_base64: content_base64.to_string(),
                revision: revision.clone(),
                message: "seed".to_string(),
            },
        );
        revision
    }

    /// Current content of a file, if any
    pub async fn file_content(&self, repo: &RepoRef, path: &str) -> Option<String> {
        self.files
            .read()
            .await
            .get(&(repo.clone(), path.to_string()))
            .map(|f| f.content_base64.clone())
    }

    /// Commit message of the last write to a file
    pub async fn last_message(&self, repo: &RepoRef, path: &str) -> Option<String> {
        self.files
            .read()
            .await
            .get(&(repo.clone(), path.to_string()))
            .map(|f| f.message.clone())
    }

    /// Make every subsequent call fail with `error` (None restores service)
    pub async fn set_failure(&self, error: Option<RemoteError>) {
        *self.failure.write().await = error;
    }

    /// Have a competing writer replace the file just before the next `put_file`
    pub async fn race_next_put(&self, repo: &RepoRef, path: &str, content_base64: &str) {
        *self.race.write().await = Some(PendingRace {
            repo: repo.clone(),
            path: path.to_string(),
            content_base64: content_base64.to_string(),
        });
    }

    async fn enter(&self, token: &str) -> Result<(), RemoteError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if token.is_empty() {
            return Err(RemoteError::Unauthorized(401));
        }
        match self.failure.read().await.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl RemoteStore for InMemoryRemote {
    async fn get_repository(&self, token: &str, repo: &RepoRef) -> Result<(), RemoteError> {
        self.enter(token).await?;
        if self.repos.read().await.contains(repo) {
            Ok(())
        } else {
            Err(RemoteError::NotFound)
        }
    }

    async fn create_repository_from_template(
        &self,
        token: &str,
        request: &TemplateRepoRequest,
    ) -> Result<(), RemoteError> {
        self.enter(token).await?;

        let mut repos = self.repos.write().await;
        if repos.contains(&request.target) {
            return Err(RemoteError::AlreadyExists);
        }
        repos.insert(request.target.clone());
        drop(repos);

        // Copy whatever the template holds
        let mut files = self.files.write().await;
        let copied: Vec<_> = files
            .iter()
            .filter(|((repo, _), _)| *repo == request.template)
            .map(|((_, path), file)| ((request.target.clone(), path.clone()), file.clone()))
            .collect();
        files.extend(copied);

        Ok(())
    }

    async fn get_file(
        &self,
        token: &str,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        self.enter(token).await?;
        if !self.repos.read().await.contains(repo) {
            return Ok(None);
        }

        Ok(self
            .files
            .read()
            .await
            .get(&(repo.clone(), path.to_string()))
            .map(|f| RemoteFile {
                path: path.to_string(),
                content_base64: f.content_base64.clone(),
                revision: f.revision.clone(),
            }))
    }

    async fn put_file(
        &self,
        token: &str,
        repo: &RepoRef,
        path: &str,
        message: &str,
        content_base64: &str,
        condition: WriteCondition,
    ) -> Result<RevisionToken, RemoteError> {
        self.enter(token).await?;
        if !self.repos.read().await.contains(repo) {
            return Err(RemoteError::NotFound);
        }

        if let Some(race) = self.race.write().await.take() {
            self.seed_file(&race.repo, &race.path, &race.content_base64).await;
        }

        let key = (repo.clone(), path.to_string());
        let mut files = self.files.write().await;
        match (&condition, files.get(&key)) {
            (WriteCondition::Create, Some(_)) => return Err(RemoteError::AlreadyExists),
            (WriteCondition::Replace(_), None) => return Err(RemoteError::NotFound),
            (WriteCondition::Replace(expected), Some(current)) if current.revision != *expected => {
                return Err(RemoteError::Conflict)
            }
            _ => {}
        }

        let revision = revision_of(content_base64);
        files.insert(
            key,
            StoredFile {
                content_base64: content_base64.to_string(),
                revision: revision.clone(),
                message: message.to_string(),
            },
        );
        Ok(revision)
    }
}

fn revision_of(content_base64: &str) -> RevisionToken {
    let mut hasher = Sha256::new();
    hasher.update(content_base64.as_bytes());
    RevisionToken::new(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo() -> RepoRef {
        RepoRef::new("octocat", "tinymind-blog")
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let remote = InMemoryRemote::new();
        remote.add_repository(repo()).await;

        let first = remote
            .put_file("t", &repo(), "f.json", "create", "W10=", WriteCondition::Create)
            .await
            .unwrap();

        // Second create loses
        let again = remote
            .put_file("t", &repo(), "f.json", "create", "W10=", WriteCondition::Create)
            .await;
        assert_eq!(again, Err(RemoteError::AlreadyExists));

        let second = remote
            .put_file("t", &repo(), "f.json", "update", "WzFd", WriteCondition::Replace(first.clone()))
            .await
            .unwrap();
        assert_ne!(first, second);

        // Stale revision loses
        let stale = remote
            .put_file("t", &repo(), "f.json", "update", "WzJd", WriteCondition::Replace(first))
            .await;
        assert_eq!(stale, Err(RemoteError::Conflict));
        assert_eq!(remote.file_content(&repo(), "f.json").await.as_deref(), Some("WzFd"));
    }

    #[tokio::test]
    async fn test_template_generation() {
        let remote = InMemoryRemote::new();
        let template = RepoRef::new("13ruceYu", "tinymind-template");
        remote.add_repository(template.clone()).await;
        remote.seed_file(&template, "README.md", "aGk=").await;

        let request = TemplateRepoRequest {
            template,
            target: repo(),
            description: "My thoughts repository".into(),
            private: false,
        };
        remote.create_repository_from_template("t", &request).await.unwrap();

        assert!(remote.has_repository(&repo()).await);
        assert_eq!(remote.file_content(&repo(), "README.md").await.as_deref(), Some("aGk="));
        assert_eq!(
            remote.create_repository_from_template("t", &request).await,
            Err(RemoteError::AlreadyExists)
        );
    }

    #[tokio::test]
    async fn test_failure_injection_and_call_count() {
        let remote = InMemoryRemote::new();
        remote.set_failure(Some(RemoteError::RateLimited)).await;

        assert_eq!(remote.get_repository("t", &repo()).await, Err(RemoteError::RateLimited));
        assert_eq!(remote.get_repository("", &repo()).await, Err(RemoteError::Unauthorized(401)));
        assert_eq!(remote.call_count(), 2);
    }
}
