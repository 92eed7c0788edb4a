//! Authentication for Tinymind
//!
//! Provides:
//! - GitHub OAuth code exchange and identity lookup
//! - Cookie sessions signed with HS256

pub mod oauth;
pub mod session;

pub use oauth::{GitHubOAuth, GitHubOAuthConfig, Identity, OAuthProvider, USER_AGENT};
pub use session::{Session, SessionManager, SESSION_TTL_SECONDS, TOKEN_COOKIE, USERNAME_COOKIE};
