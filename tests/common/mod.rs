//! Shared fixtures for the HTTP flow tests

#![allow(dead_code)]

use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use clap::Parser;
use http_body_util::BodyExt;
use hyper::header::{HeaderMap, HeaderValue, COOKIE, LOCATION, SET_COOKIE};
use hyper::Response;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use tinymind::auth::{Identity, OAuthProvider};
use tinymind::routes::FullBody;
use tinymind::store::{InMemoryRemote, RepoRef};
use tinymind::types::TinymindError;
use tinymind::{AppState, Args};

pub const LOGIN: &str = "octocat";
pub const GOOD_CODE: &str = "code-123";
pub const ACCESS_TOKEN: &str = "gho_test_token";
pub const THOUGHTS_PATH: &str = "content/thoughts.json";

/// Provider that accepts `GOOD_CODE` exactly once
#[derive(Default)]
pub struct StubProvider {
    used: Mutex<HashSet<String>>,
}

#[async_trait::async_trait]
impl OAuthProvider for StubProvider {
    fn authorize_url(&self) -> String {
        "https://github.test/login/oauth/authorize?client_id=test".to_string()
    }

    async fn exchange_code(&self, code: &str) -> Result<String, TinymindError> {
        if code != GOOD_CODE {
            return Err(TinymindError::AuthExchangeFailed("bad_verification_code".into()));
        }
        if !self.used.lock().await.insert(code.to_string()) {
            return Err(TinymindError::AuthExchangeFailed("bad_verification_code".into()));
        }
        Ok(ACCESS_TOKEN.to_string())
    }

    async fn fetch_identity(&self, _access_token: &str) -> Result<Identity, TinymindError> {
        Ok(Identity {
            login: LOGIN.to_string(),
            email: None,
            name: Some("The Octocat".to_string()),
        })
    }
}

pub struct Harness {
    pub state: AppState,
    pub remote: Arc<InMemoryRemote>,
}

pub fn harness() -> Harness {
    let args = Args::try_parse_from(["tinymind", "--dev-mode"]).unwrap();
    let remote = Arc::new(InMemoryRemote::new());
    let state = AppState::with_backends(args, Arc::new(StubProvider::default()), remote.clone())
        .unwrap();
    Harness { state, remote }
}

pub fn user_repo() -> RepoRef {
    RepoRef::new(LOGIN, "tinymind-blog")
}

pub fn encode(json: &str) -> String {
    STANDARD.encode(json)
}

pub fn decode(content_base64: &str) -> serde_json::Value {
    let cleaned: String = content_base64.chars().filter(|c| !c.is_whitespace()).collect();
    serde_json::from_slice(&STANDARD.decode(cleaned).unwrap()).unwrap()
}

pub fn set_cookies(response: &Response<FullBody>) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap().to_string())
        .collect()
}

pub fn location(response: &Response<FullBody>) -> String {
    response.headers().get(LOCATION).unwrap().to_str().unwrap().to_string()
}

/// Turn `Set-Cookie` values into the `Cookie` header a browser would send back
pub fn cookie_headers(set_cookies: &[String]) -> HeaderMap {
    let pairs: Vec<&str> = set_cookies
        .iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .map(|c| c.split(';').next().unwrap_or(""))
        .collect();
    let mut headers = HeaderMap::new();
    if !pairs.is_empty() {
        headers.insert(COOKIE, HeaderValue::from_str(&pairs.join("; ")).unwrap());
    }
    headers
}

/// Log in through the callback route and return the resulting request headers
pub async fn login(state: &AppState) -> HeaderMap {
    let query = format!("code={}", GOOD_CODE);
    let response = tinymind::routes::handle_github_auth(state, Some(&query)).await;
    assert_eq!(response.status(), 302);
    cookie_headers(&set_cookies(&response))
}

pub async fn body_bytes(response: Response<FullBody>) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response<FullBody>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

pub async fn body_text(response: Response<FullBody>) -> String {
    String::from_utf8(body_bytes(response).await.to_vec()).unwrap()
}
