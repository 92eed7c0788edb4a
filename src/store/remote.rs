//! Remote content API seam
//!
//! The store behind Tinymind is a hosted repository, not a database. It offers
//! four calls and one concurrency primitive: each file comes back with a
//! revision token, and a write that presents a stale token is refused.
//! `WriteCondition` makes that compare-and-swap explicit at every call site.

use std::fmt;

/// Opaque per-file version (the blob SHA on GitHub)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RevisionToken(String);

impl RevisionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RevisionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Repository coordinates
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

impl RepoRef {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A file as read from the remote store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub content_base64: String,
    pub revision: RevisionToken,
}

/// Precondition attached to a file write
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteCondition {
    /// The file must not exist yet
    Create,
    /// The file must still be at this revision
    Replace(RevisionToken),
}

/// Request to instantiate a repository from a template
#[derive(Debug, Clone)]
pub struct TemplateRepoRequest {
    pub template: RepoRef,
    pub target: RepoRef,
    pub description: String,
    pub private: bool,
}

/// Failures reported by the remote store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("not found")]
    NotFound,

    /// `Replace` presented a revision that is no longer current
    #[error("revision conflict")]
    Conflict,

    /// `Create` hit an existing file, or a repository name is taken
    #[error("already exists")]
    AlreadyExists,

    #[error("unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("rate limited")]
    RateLimited,

    /// The file exists but the content API will not return its body
    #[error("file too large for contents API")]
    TooLarge,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: HTTP {status}: {message}")]
    Unexpected { status: u16, message: String },
}

/// Remote content operations used by the provisioner and document store
///
/// Every call is authenticated with the end user's access token.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// `Ok(())` if the repository exists, `Err(NotFound)` if not
    async fn get_repository(&self, token: &str, repo: &RepoRef) -> Result<(), RemoteError>;

    /// Create `request.target` from `request.template`
    async fn create_repository_from_template(
        &self,
        token: &str,
        request: &TemplateRepoRequest,
    ) -> Result<(), RemoteError>;

    /// Fetch a file; `Ok(None)` when it does not exist
    async fn get_file(
        &self,
        token: &str,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>, RemoteError>;

    /// Write a whole file under `condition`, returning the new revision
    async fn put_file(
        &self,
        token: &str,
        repo: &RepoRef,
        path: &str,
        message: &str,
        content_base64: &str,
        condition: WriteCondition,
    ) -> Result<RevisionToken, RemoteError>;
}
