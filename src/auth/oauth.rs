//! GitHub OAuth: code exchange and identity lookup
//!
//! Login is the classic web flow:
//! 1. Browser hits `/auth/github` without a code, we redirect to `authorize`
//! 2. GitHub redirects back with `?code=...`
//! 3. `exchange_code` trades the code for an access token
//! 4. `fetch_identity` asks `/user` who owns the token
//!
//! Codes are single-use. GitHub answers a reused code with HTTP 200 and an
//! `error` field, so the body is inspected rather than trusting the status.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Args;
use crate::types::{IdentityFailure, TinymindError};

/// User agent sent on every GitHub call (the API rejects requests without one)
pub const USER_AGENT: &str = concat!("tinymind/", env!("CARGO_PKG_VERSION"));

/// Identity resolved from an access token
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Identity {
    /// Canonical login name
    pub login: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Identity provider operations needed by the login flow
#[async_trait::async_trait]
pub trait OAuthProvider: Send + Sync {
    /// URL the browser is sent to when a login starts
    fn authorize_url(&self) -> String;

    /// Trade a one-time authorization code for an access token
    async fn exchange_code(&self, code: &str) -> Result<String, TinymindError>;

    /// Resolve the owner of an access token
    async fn fetch_identity(&self, access_token: &str) -> Result<Identity, TinymindError>;
}

/// OAuth app settings
#[derive(Debug, Clone)]
pub struct GitHubOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub scopes: String,
    pub redirect_uri: Option<String>,
    /// e.g. `https://github.com/login/oauth`
    pub oauth_base: String,
    /// e.g. `https://api.github.com`
    pub api_base: String,
}

impl GitHubOAuthConfig {
    pub fn from_args(args: &Args) -> Self {
        Self {
            client_id: args.github_client_id.clone(),
            client_secret: args.github_client_secret.clone(),
            scopes: args.github_scopes.clone(),
            redirect_uri: args.redirect_uri(),
            oauth_base: args.github_oauth_url.trim_end_matches('/').to_string(),
            api_base: args.github_api_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    code: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenExchangeResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

#[derive(Serialize)]
struct AuthorizeQuery<'a> {
    client_id: &'a str,
    scope: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

/// reqwest-backed GitHub OAuth client
pub struct GitHubOAuth {
    config: GitHubOAuthConfig,
    http_client: reqwest::Client,
}

impl GitHubOAuth {
    pub fn new(config: GitHubOAuthConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait::async_trait]
impl OAuthProvider for GitHubOAuth {
    fn authorize_url(&self) -> String {
        let query = serde_urlencoded::to_string(AuthorizeQuery {
            client_id: &self.config.client_id,
            scope: &self.config.scopes,
            redirect_uri: self.config.redirect_uri.as_deref(),
        })
        .unwrap_or_default();

        format!("{}/authorize?{}", self.config.oauth_base, query)
    }

    async fn exchange_code(&self, code: &str) -> Result<String, TinymindError> {
        let url = format!("{}/access_token", self.config.oauth_base);
        debug!(url = %url, "Exchanging OAuth code");

        let response = self
            .http_client
            .post(&url)
            .header("Accept", "application/json")
            .json(&TokenExchangeRequest {
                client_id: &self.config.client_id,
                client_secret: &self.config.client_secret,
                code,
            })
            .send()
            .await
            // without_url: the error text stays free of anything request-specific
            .map_err(|e| TinymindError::AuthExchangeFailed(format!("transport: {}", e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TinymindError::AuthExchangeFailed(format!(
                "token endpoint returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: TokenExchangeResponse = response
            .json()
            .await
            .map_err(|e| TinymindError::AuthExchangeFailed(format!("malformed response: {}", e.without_url())))?;

        interpret_token_response(body)
    }

    async fn fetch_identity(&self, access_token: &str) -> Result<Identity, TinymindError> {
        let url = format!("{}/user", self.config.api_base);

        let response = self
            .http_client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| {
                TinymindError::IdentityLookupFailed(IdentityFailure::Transport(
                    e.without_url().to_string(),
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "GitHub rejected identity lookup");
            return Err(TinymindError::IdentityLookupFailed(IdentityFailure::Rejected {
                status: status.as_u16(),
            }));
        }

        let identity: Identity = response.json().await.map_err(|e| {
            TinymindError::IdentityLookupFailed(IdentityFailure::Malformed(
                e.without_url().to_string(),
            ))
        })?;

        if identity.login.is_empty() {
            return Err(TinymindError::IdentityLookupFailed(IdentityFailure::Malformed(
                "empty login".into(),
            )));
        }

        Ok(identity)
    }
}

fn interpret_token_response(body: TokenExchangeResponse) -> Result<String, TinymindError> {
    if let Some(error) = body.error {
        let detail = body
            .error_description
            .map(|d| format!("{}: {}", error, d))
            .unwrap_or(error);
        return Err(TinymindError::AuthExchangeFailed(detail));
    }

    match body.access_token {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(TinymindError::AuthExchangeFailed(
            "response carried no access_token".into(),
        )),
    }
}
