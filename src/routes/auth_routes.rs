//! HTTP Routes for Authentication
//!
//! - GET /auth/github  - Start login (no code) or finish it (provider callback)
//! - GET /auth/logout  - Clear the session cookies

use hyper::{Response, StatusCode};
use serde::Deserialize;
use tracing::{info, warn};

use super::{json_error, redirect, FullBody};
use crate::server::AppState;

/// Query parameters GitHub sends back to the callback
#[derive(Debug, Default, Deserialize)]
pub struct CallbackQuery {
    #[serde(default)]
    pub code: Option<String>,
    /// Set when the user denied access
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// GET /auth/github
///
/// Without `code`: redirect to the provider's authorize page.
/// With `code`: exchange it, resolve the user, set the session cookies and
/// redirect home. Any failure is a generic 500 "Authentication failed".
pub async fn handle_github_auth(state: &AppState, query: Option<&str>) -> Response<FullBody> {
    let params: CallbackQuery = match serde_urlencoded::from_str(query.unwrap_or("")) {
        Ok(p) => p,
        Err(e) => {
            warn!(error = %e, "Unparseable OAuth callback query");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed");
        }
    };

    if let Some(error) = params.error {
        warn!(
            error = %error,
            description = params.error_description.as_deref().unwrap_or(""),
            "Provider returned an OAuth error"
        );
        return json_error(StatusCode::INTERNAL_SERVER_ERROR, "Authentication failed");
    }

    let code = match params.code.as_deref() {
        Some(code) if !code.is_empty() => code,
        _ => {
            info!("Starting OAuth login");
            return redirect(&state.login.authorize_url(), &[]);
        }
    };

    match state.login.complete(code).await {
        Ok(outcome) => redirect(&state.args.home_url(), &outcome.cookies),
        Err(e) => {
            warn!(error = %e, "OAuth login failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.public_message())
        }
    }
}

/// GET /auth/logout
///
/// Clears both cookies whether or not a session exists.
pub fn handle_logout(state: &AppState) -> Response<FullBody> {
    redirect(&state.args.home_url(), &state.sessions.clear())
}
