//! Error types for Tinymind
//!
//! One enum covers every failure a request can hit. Each variant carries the
//! internal detail for logs; `public_message()` is what a client gets to see.

use hyper::StatusCode;

/// Why an identity lookup failed.
///
/// The user sees the same "Authentication failed" for all of these, but the
/// logs need to tell a revoked token apart from a network blip.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentityFailure {
    #[error("provider rejected token (HTTP {status})")]
    Rejected { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed user response: {0}")]
    Malformed(String),
}

/// Input problems detected before any remote call is made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("missing or invalid session")]
    MissingSession,

    #[error("content is empty")]
    EmptyContent,
}

/// Main error type for Tinymind operations
#[derive(Debug, thiserror::Error)]
pub enum TinymindError {
    #[error("OAuth code exchange failed: {0}")]
    AuthExchangeFailed(String),

    #[error("Identity lookup failed: {0}")]
    IdentityLookupFailed(IdentityFailure),

    #[error("Repository provisioning failed: {0}")]
    RepositoryProvisionFailed(String),

    #[error("Remote read failed: {0}")]
    RemoteReadFailed(String),

    #[error("Remote write failed: {0}")]
    RemoteWriteFailed(String),

    #[error("Stored thoughts are corrupt: {0}")]
    CorruptStoreFailed(String),

    #[error("Concurrent modification of {path}")]
    ConcurrentModification { path: String },

    #[error("Validation failed: {0}")]
    ValidationFailed(ValidationError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TinymindError {
    /// Convert error to HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationFailed(ValidationError::MissingSession) => StatusCode::UNAUTHORIZED,
            Self::ValidationFailed(ValidationError::EmptyContent) => StatusCode::BAD_REQUEST,
            Self::ConcurrentModification { .. } => StatusCode::CONFLICT,
            Self::AuthExchangeFailed(_)
            | Self::IdentityLookupFailed(_)
            | Self::RepositoryProvisionFailed(_)
            | Self::RemoteReadFailed(_)
            | Self::RemoteWriteFailed(_)
            | Self::CorruptStoreFailed(_)
            | Self::Config(_)
            | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to hand to a client. Never includes internal detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::AuthExchangeFailed(_) | Self::IdentityLookupFailed(_) => "Authentication failed",
            Self::ValidationFailed(ValidationError::MissingSession) => {
                "You must be logged in to submit thoughts"
            }
            Self::ValidationFailed(ValidationError::EmptyContent) => "Content is required",
            Self::ConcurrentModification { .. } => {
                "Your thoughts were updated elsewhere at the same time, please try again"
            }
            Self::RemoteReadFailed(_) | Self::CorruptStoreFailed(_) => "Failed to load thoughts",
            Self::RepositoryProvisionFailed(_)
            | Self::RemoteWriteFailed(_)
            | Self::Config(_)
            | Self::Io(_) => "Failed to submit thought",
        }
    }

    /// Only a lost compare-and-swap is worth retrying from scratch.
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::ConcurrentModification { .. })
    }
}

/// Result type alias for Tinymind operations
pub type Result<T> = std::result::Result<T, TinymindError>;
