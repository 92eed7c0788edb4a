//! Cookie-held sessions
//!
//! A session is two cookies set and cleared together:
//! - `username`: the login name, readable by page scripts
//! - `gh_token`: the GitHub access token inside an HS256-signed envelope,
//!   `HttpOnly` and `Secure` outside dev mode
//!
//! The server keeps no session table. A request is authenticated only when
//! both cookies are present, the envelope verifies, and the envelope's
//! subject matches the `username` cookie.

use hyper::header::{HeaderMap, COOKIE};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

use crate::config::MIN_SESSION_SECRET_LEN;
use crate::types::TinymindError;

pub const USERNAME_COOKIE: &str = "username";
pub const TOKEN_COOKIE: &str = "gh_token";

/// Session lifetime: 7 days
pub const SESSION_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;

/// An authenticated session recovered from cookies
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub username: String,
    pub access_token: String,
    /// Unix timestamp after which the session is invalid
    pub expires_at: u64,
}

/// Payload of the signed `gh_token` cookie
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SessionClaims {
    /// Login name the token belongs to
    sub: String,
    /// GitHub access token
    gh: String,
    iat: u64,
    exp: u64,
}

/// Writes, reads and clears session cookies
#[derive(Clone)]
pub struct SessionManager {
    secret: String,
    ttl_seconds: u64,
    secure: bool,
}

impl SessionManager {
    /// Create a session manager
    ///
    /// Returns an error if the secret is too short to sign with
    pub fn new(secret: String, secure: bool) -> Result<Self, TinymindError> {
        if secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(TinymindError::Config(format!(
                "session secret must be at least {} characters",
                MIN_SESSION_SECRET_LEN
            )));
        }

        Ok(Self {
            secret,
            ttl_seconds: SESSION_TTL_SECONDS,
            secure,
        })
    }

    /// Build the two `Set-Cookie` values binding `username` to `access_token`
    pub fn materialize(&self, username: &str, access_token: &str) -> Result<[String; 2], TinymindError> {
        let now = unix_now();
        let claims = SessionClaims {
            sub: username.to_string(),
            gh: access_token.to_string(),
            iat: now,
            exp: now + self.ttl_seconds,
        };

        let envelope = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| TinymindError::Config(format!("failed to sign session: {}", e)))?;

        let max_age = self.ttl_seconds.to_string();
        Ok([
            self.cookie(USERNAME_COOKIE, &urlencoding::encode(username), &max_age, false),
            self.cookie(TOKEN_COOKIE, &envelope, &max_age, true),
        ])
    }

    /// `Set-Cookie` values that delete both cookies. Safe to send with or without a session.
    pub fn clear(&self) -> [String; 2] {
        [
            self.cookie(USERNAME_COOKIE, "", "0", false),
            self.cookie(TOKEN_COOKIE, "", "0", true),
        ]
    }

    /// Recover the session from request headers, if there is a valid one
    pub fn read(&self, headers: &HeaderMap) -> Option<Session> {
        let username = cookie_value(headers, USERNAME_COOKIE)?;
        let username = urlencoding::decode(&username).ok()?.into_owned();
        let envelope = cookie_value(headers, TOKEN_COOKIE)?;

        if username.is_empty() || envelope.is_empty() {
            return None;
        }

        let claims = match decode::<SessionClaims>(
            &envelope,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(data) => data.claims,
            Err(e) => {
                debug!(error = %e, "Rejected session envelope");
                return None;
            }
        };

        if claims.sub != username {
            debug!("Session cookies disagree on username");
            return None;
        }

        Some(Session {
            username,
            access_token: claims.gh,
            expires_at: claims.exp,
        })
    }

    fn cookie(&self, name: &str, value: &str, max_age: &str, secret: bool) -> String {
        let mut cookie = format!("{}={}; Path=/; Max-Age={}; SameSite=Lax", name, value, max_age);
        if secret {
            cookie.push_str("; HttpOnly");
            if self.secure {
                cookie.push_str("; Secure");
            }
        }
        cookie
    }
}

/// Find a cookie by name across all `Cookie` headers
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::header::HeaderValue;

    fn manager(secure: bool) -> SessionManager {
        SessionManager::new("test-secret-that-is-at-least-32-characters-long".into(), secure).unwrap()
    }

    /// Turn `Set-Cookie` values into a request `Cookie` header
    fn echo(set_cookies: &[String]) -> HeaderMap {
        let pairs: Vec<&str> = set_cookies
            .iter()
            .map(|c| c.split(';').next().unwrap())
            .collect();
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
        headers
    }

    #[test]
    fn test_materialize_then_read() {
        let sessions = manager(true);
        let cookies = sessions.materialize("octocat", "gho_abc").unwrap();

        let session = sessions.read(&echo(&cookies)).unwrap();
        assert_eq!(session.username, "octocat");
        assert_eq!(session.access_token, "gho_abc");
        assert!(session.expires_at > unix_now());
    }

    #[test]
    fn test_cookie_attributes() {
        let [username, token] = manager(true).materialize("octocat", "gho_abc").unwrap();

        assert!(username.starts_with("username=octocat;"));
        assert!(username.contains("Max-Age=604800"));
        assert!(username.contains("Path=/"));
        assert!(!username.contains("HttpOnly"));

        assert!(token.starts_with("gh_token="));
        assert!(token.contains("HttpOnly"));
        assert!(token.contains("Secure"));
        assert!(!token.contains("gho_abc"));

        let [_, dev_token] = manager(false).materialize("octocat", "gho_abc").unwrap();
        assert!(!dev_token.contains("Secure"));
    }

    #[test]
    fn test_half_session_is_unauthenticated() {
        let sessions = manager(true);
        let [username, token] = sessions.materialize("octocat", "gho_abc").unwrap();

        assert!(sessions.read(&echo(&[username])).is_none());
        assert!(sessions.read(&echo(&[token])).is_none());
        assert!(sessions.read(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_mismatched_username_is_rejected() {
        let sessions = manager(true);
        let [_, token] = sessions.materialize("octocat", "gho_abc").unwrap();
        let forged = "username=mallory".to_string();

        assert!(sessions.read(&echo(&[forged, token])).is_none());
    }

    #[test]
    fn test_foreign_signature_is_rejected() {
        let other = SessionManager::new("another-secret-that-is-at-least-32-chars".into(), true).unwrap();
        let cookies = other.materialize("octocat", "gho_abc").unwrap();

        assert!(manager(true).read(&echo(&cookies)).is_none());
    }

    #[test]
    fn test_clear_is_idempotent() {
        let sessions = manager(true);
        let first = sessions.clear();
        let second = sessions.clear();

        assert_eq!(first, second);
        assert!(first[0].starts_with("username=;"));
        assert!(first[1].starts_with("gh_token=;"));
        assert!(first.iter().all(|c| c.contains("Max-Age=0")));
        assert!(sessions.read(&echo(&first)).is_none());
    }

    #[test]
    fn test_username_is_percent_encoded() {
        let sessions = manager(true);
        let cookies = sessions.materialize("name with;semi", "gho_abc").unwrap();
        assert!(cookies[0].starts_with("username=name%20with%3Bsemi;"));

        let session = sessions.read(&echo(&cookies)).unwrap();
        assert_eq!(session.username, "name with;semi");
    }

    #[test]
    fn test_short_secret_rejected() {
        assert!(SessionManager::new("short".into(), true).is_err());
    }

    #[test]
    fn test_cookie_value_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("a=1; username=octocat"));

        assert_eq!(cookie_value(&headers, "username").as_deref(), Some("octocat"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }
}
