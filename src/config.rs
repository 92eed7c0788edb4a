//! Configuration for Tinymind
//!
//! CLI arguments and environment variable handling using clap.
//! Every flag can also come from the environment (or a `.env` file).

use clap::Parser;
use std::net::SocketAddr;
use std::time::Duration;

use crate::types::TinymindError;

/// Minimum length of the secret used to sign session cookies
pub const MIN_SESSION_SECRET_LEN: usize = 32;

const DEV_SESSION_SECRET: &str = "dev-only-insecure-session-secret-0123456789";

/// Tinymind - a thought journal stored in your own GitHub repository
#[derive(Parser, Debug, Clone)]
#[command(name = "tinymind")]
#[command(about = "GitHub-backed thought journal server")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Public base URL of this server (used for the OAuth redirect_uri)
    #[arg(long, env = "BASE_URL")]
    pub base_url: Option<String>,

    /// GitHub OAuth app client ID
    #[arg(long, env = "GITHUB_ID", default_value = "")]
    pub github_client_id: String,

    /// GitHub OAuth app client secret
    #[arg(long, env = "GITHUB_SECRET", default_value = "", hide_env_values = true)]
    pub github_client_secret: String,

    /// Secret for signing the session cookie (required in production)
    #[arg(long, env = "SESSION_SECRET", hide_env_values = true)]
    pub session_secret: Option<String>,

    /// Enable development mode (insecure cookies, default session secret)
    #[arg(long, env = "DEV_MODE", default_value = "false")]
    pub dev_mode: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format (text or json)
    #[arg(long, env = "LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Timeout for every outbound GitHub call, in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "5000")]
    pub request_timeout_ms: u64,

    /// How many times a submission re-runs its read-modify-write after losing a race
    #[arg(long, env = "SUBMIT_MAX_ATTEMPTS", default_value = "3")]
    pub submit_max_attempts: u32,

    /// Base URL of the GitHub OAuth endpoints
    #[arg(long, env = "GITHUB_OAUTH_URL", default_value = "https://github.com/login/oauth")]
    pub github_oauth_url: String,

    /// Base URL of the GitHub REST API
    #[arg(long, env = "GITHUB_API_URL", default_value = "https://api.github.com")]
    pub github_api_url: String,

    /// OAuth scopes requested at login
    #[arg(long, env = "GITHUB_SCOPES", default_value = "read:user user:email")]
    pub github_scopes: String,

    /// Repository created under each user's account
    #[arg(long, env = "REPO_NAME", default_value = "tinymind-blog")]
    pub repo_name: String,

    /// Owner of the template repository
    #[arg(long, env = "TEMPLATE_OWNER", default_value = "13ruceYu")]
    pub template_owner: String,

    /// Name of the template repository
    #[arg(long, env = "TEMPLATE_REPO", default_value = "tinymind-template")]
    pub template_repo: String,

    /// Path of the thoughts file inside the repository
    #[arg(long, env = "THOUGHTS_PATH", default_value = "content/thoughts.json")]
    pub thoughts_path: String,

    /// Create user repositories as private
    #[arg(long, env = "REPO_PRIVATE", default_value = "false")]
    pub repo_private: bool,
}

impl Args {
    /// Get effective session secret (uses a fixed default in dev mode)
    pub fn session_secret(&self) -> Result<String, TinymindError> {
        match (&self.session_secret, self.dev_mode) {
            (Some(secret), _) => Ok(secret.clone()),
            (None, true) => Ok(DEV_SESSION_SECRET.to_string()),
            (None, false) => Err(TinymindError::Config(
                "SESSION_SECRET is required in production mode".into(),
            )),
        }
    }

    /// Timeout applied to outbound requests
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Cookies carry `Secure` everywhere except dev mode
    pub fn secure_cookies(&self) -> bool {
        !self.dev_mode
    }

    /// Callback URL registered with the OAuth app, if a base URL is known
    pub fn redirect_uri(&self) -> Option<String> {
        self.base_url
            .as_deref()
            .map(|base| format!("{}/auth/github", base.trim_end_matches('/')))
    }

    /// Where to send the browser after login/logout/submit
    pub fn home_url(&self) -> String {
        match self.base_url.as_deref() {
            Some(base) => format!("{}/", base.trim_end_matches('/')),
            None => "/".to_string(),
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.dev_mode {
            if self.github_client_id.is_empty() || self.github_client_secret.is_empty() {
                return Err("GITHUB_ID and GITHUB_SECRET are required in production mode".into());
            }
            match &self.session_secret {
                None => return Err("SESSION_SECRET is required in production mode".into()),
                Some(s) if s.len() < MIN_SESSION_SECRET_LEN => {
                    return Err(format!(
                        "SESSION_SECRET must be at least {} characters",
                        MIN_SESSION_SECRET_LEN
                    ));
                }
                Some(_) => {}
            }
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".into());
        }

        if self.submit_max_attempts == 0 {
            return Err("SUBMIT_MAX_ATTEMPTS must be at least 1".into());
        }

        if self.repo_name.is_empty() || self.thoughts_path.is_empty() {
            return Err("REPO_NAME and THOUGHTS_PATH must not be empty".into());
        }

        Ok(())
    }
}
