//! Remote-repository datastore
//!
//! - `remote`: the content API seam and its CAS write condition
//! - `github`: GitHub REST implementation
//! - `memory`: in-memory implementation (tests and the `test-util` feature)
//! - `provisioner`: lazily creates each user's repository
//! - `document`: reads and appends to the thoughts file

pub mod document;
pub mod github;
#[cfg(any(test, feature = "test-util"))]
pub mod memory;
pub mod provisioner;
pub mod remote;

pub use document::{DocumentConfig, DocumentStore, APPEND_MESSAGE, CREATE_MESSAGE};
pub use github::GitHubContentClient;
#[cfg(any(test, feature = "test-util"))]
pub use memory::InMemoryRemote;
pub use provisioner::{ProvisionOutcome, ProvisionerConfig, RepositoryProvisioner, REPO_DESCRIPTION};
pub use remote::{
    RemoteError, RemoteFile, RemoteStore, RepoRef, RevisionToken, TemplateRepoRequest,
    WriteCondition,
};
