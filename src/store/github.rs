//! GitHub REST implementation of `RemoteStore`
//!
//! Endpoints used:
//! - `GET  /repos/{owner}/{repo}`
//! - `POST /repos/{template_owner}/{template_repo}/generate`
//! - `GET  /repos/{owner}/{repo}/contents/{path}`
//! - `PUT  /repos/{owner}/{repo}/contents/{path}`
//!
//! The contents API is whole-file: a PUT carries the full base64 body and,
//! when replacing, the blob `sha` last seen. GitHub answers a stale `sha`
//! with 409, and a create over an existing file with 422.

use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::remote::{
    RemoteError, RemoteFile, RemoteStore, RepoRef, RevisionToken, TemplateRepoRequest,
    WriteCondition,
};

const GITHUB_ACCEPT: &str = "application/vnd.github+json";

/// Longest error message kept from a GitHub response body
const MAX_ERROR_MESSAGE_LEN: usize = 200;

/// Content API client authenticated per call with the user's token
pub struct GitHubContentClient {
    api_base: String,
    http_client: reqwest::Client,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    owner: &'a str,
    name: &'a str,
    description: &'a str,
    private: bool,
    include_all_branches: bool,
}

#[derive(Debug, Deserialize)]
struct ContentResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: Option<String>,
    /// `base64`, or `none` when the file is over 1 MB and the body is omitted
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Serialize)]
struct PutContentRequest<'a> {
    message: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutContentResponse {
    content: PutContentFile,
}

#[derive(Debug, Deserialize)]
struct PutContentFile {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct GitHubErrorBody {
    #[serde(default)]
    message: String,
}

impl GitHubContentClient {
    pub fn new(api_base: &str, http_client: reqwest::Client) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
            http_client,
        }
    }

    fn repo_url(&self, repo: &RepoRef) -> String {
        format!(
            "{}/repos/{}/{}",
            self.api_base,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name)
        )
    }

    fn contents_url(&self, repo: &RepoRef, path: &str) -> String {
        format!("{}/contents/{}", self.repo_url(repo), encode_path(path))
    }
}

#[async_trait::async_trait]
impl RemoteStore for GitHubContentClient {
    async fn get_repository(&self, token: &str, repo: &RepoRef) -> Result<(), RemoteError> {
        let response = self
            .http_client
            .get(self.repo_url(repo))
            .header("Accept", GITHUB_ACCEPT)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(error_from_response(response).await)
    }

    async fn create_repository_from_template(
        &self,
        token: &str,
        request: &TemplateRepoRequest,
    ) -> Result<(), RemoteError> {
        let url = format!("{}/generate", self.repo_url(&request.template));
        debug!(template = %request.template, target = %request.target, "Generating repository from template");

        let response = self
            .http_client
            .post(&url)
            .header("Accept", GITHUB_ACCEPT)
            .bearer_auth(token)
            .json(&GenerateRequest {
                owner: &request.target.owner,
                name: &request.target.name,
                description: &request.description,
                private: request.private,
                include_all_branches: false,
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        // 422 "Name already exists on this account"
        if status == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(RemoteError::AlreadyExists);
        }
        Err(error_from_response(response).await)
    }

    async fn get_file(
        &self,
        token: &str,
        repo: &RepoRef,
        path: &str,
    ) -> Result<Option<RemoteFile>, RemoteError> {
        let response = self
            .http_client
            .get(self.contents_url(repo, path))
            .header("Accept", GITHUB_ACCEPT)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(error_from_response(response).await);
        }

        // A directory at `path` comes back as a JSON array and fails here
        let body: ContentResponse = response.json().await.map_err(|e| RemoteError::Unexpected {
            status: status.as_u16(),
            message: format!("unreadable contents response: {}", e.without_url()),
        })?;

        let content_base64 = match (body.encoding.as_deref(), body.content) {
            (Some("none"), _) | (_, None) => {
                warn!(path = %body.path, "Contents API returned no body for file");
                return Err(RemoteError::TooLarge);
            }
            (_, Some(content)) => content,
        };

        Ok(Some(RemoteFile {
            path: body.path,
            content_base64,
            revision: RevisionToken::new(body.sha),
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
        let sha = match &condition {
            WriteCondition::Create => None,
            WriteCondition::Replace(rev) => Some(rev.as_str()),
        };

        let response = self
            .http_client
            .put(self.contents_url(repo, path))
            .header("Accept", GITHUB_ACCEPT)
            .bearer_auth(token)
            .json(&PutContentRequest {
                message,
                content: content_base64,
                sha,
            })
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        if status.is_success() {
            let body: PutContentResponse =
                response.json().await.map_err(|e| RemoteError::Unexpected {
                    status: status.as_u16(),
                    message: format!("unreadable write response: {}", e.without_url()),
                })?;
            return Ok(RevisionToken::new(body.content.sha));
        }

        match (&condition, status.as_u16()) {
            // "... does not match ..."
            (WriteCondition::Replace(_), 409) => Err(RemoteError::Conflict),
            // "Invalid request. \"sha\" wasn't supplied."
            (WriteCondition::Create, 422) => Err(RemoteError::AlreadyExists),
            _ => Err(error_from_response(response).await),
        }
    }
}

/// Percent-encode each path segment, keeping the separators
fn encode_path(path: &str) -> String {
    path.trim_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

fn transport(err: reqwest::Error) -> RemoteError {
    let kind = if err.is_timeout() { "timeout" } else { "request failed" };
    RemoteError::Transport(format!("{}: {}", kind, err.without_url()))
}

async fn error_from_response(response: Response) -> RemoteError {
    let status = response.status();
    let rate_limit_exhausted = response
        .headers()
        .get("x-ratelimit-remaining")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.trim() == "0")
        .unwrap_or(false);

    let text = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<GitHubErrorBody>(&text)
        .map(|b| b.message)
        .unwrap_or(text);

    let error = classify_status(status.as_u16(), rate_limit_exhausted, message);
    warn!(status = status.as_u16(), error = %error, "GitHub content API call failed");
    error
}

/// Map a failed GitHub status onto the remote error taxonomy
///
/// 409 and 422 only carry CAS meaning for a contents write; `put_file`
/// decides those itself and everything else lands here as `Unexpected`.
fn classify_status(status: u16, rate_limit_exhausted: bool, message: String) -> RemoteError {
    match status {
        401 => RemoteError::Unauthorized(status),
        403 if rate_limit_exhausted => RemoteError::RateLimited,
        403 => RemoteError::Unauthorized(status),
        404 => RemoteError::NotFound,
        429 => RemoteError::RateLimited,
        _ => RemoteError::Unexpected {
            status,
            message: message.chars().take(MAX_ERROR_MESSAGE_LEN).collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contents_url_keeps_separators() {
        let client = GitHubContentClient::new("https://api.github.com/", reqwest::Client::new());
        let repo = RepoRef::new("octocat", "tinymind-blog");

        assert_eq!(
            client.contents_url(&repo, "content/thoughts.json"),
            "https://api.github.com/repos/octocat/tinymind-blog/contents/content/thoughts.json"
        );
        assert_eq!(encode_path("/a b/c#d"), "a%20b/c%23d");
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(404, false, String::new()), RemoteError::NotFound);
        assert!(matches!(classify_status(409, false, String::new()), RemoteError::Unexpected { status: 409, .. }));
        assert!(matches!(classify_status(422, false, String::new()), RemoteError::Unexpected { status: 422, .. }));
        assert_eq!(classify_status(401, false, String::new()), RemoteError::Unauthorized(401));
        assert_eq!(classify_status(403, true, String::new()), RemoteError::RateLimited);
        assert_eq!(classify_status(403, false, String::new()), RemoteError::Unauthorized(403));
        assert_eq!(classify_status(429, false, String::new()), RemoteError::RateLimited);
        assert!(matches!(
            classify_status(502, false, "x".repeat(500)),
            RemoteError::Unexpected { status: 502, ref message } if message.len() == MAX_ERROR_MESSAGE_LEN
        ));
    }

    #[test]
    fn test_put_request_omits_sha_on_create() {
        let create = serde_json::to_value(PutContentRequest {
            message: "Create thoughts.json",
            content: "W10=",
            sha: None,
        })
        .unwrap();
        assert!(create.get("sha").is_none());

        let update = serde_json::to_value(PutContentRequest {
            message: "Add new thought",
            content: "W10=",
            sha: Some("abc"),
        })
        .unwrap();
        assert_eq!(update["sha"], "abc");
    }

    #[test]
    fn test_content_response_parses_github_shape() {
        let body: ContentResponse = serde_json::from_str(
            r#"{"type":"file","encoding":"base64","size":2,"name":"thoughts.json",
                "path":"content/thoughts.json","content":"W10=\n","sha":"3d21ec53"}"#,
        )
        .unwrap();
        assert_eq!(body.path, "content/thoughts.json");
        assert_eq!(body.sha, "3d21ec53");
        assert_eq!(body.content.as_deref(), Some("W10=\n"));

        let put: PutContentResponse =
            serde_json::from_str(r#"{"content":{"sha":"95b966ae"},"commit":{"sha":"7638417d"}}"#)
                .unwrap();
        assert_eq!(put.content.sha, "95b966ae");
    }

    use crate::store::{DocumentConfig, DocumentStore};
    use crate::types::{Thought, TinymindError};
    use chrono::Utc;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CONTENTS: &str = "/repos/octocat/tinymind-blog/contents/content/thoughts.json";

    fn repo() -> RepoRef {
        RepoRef::new("octocat", "tinymind-blog")
    }

    fn client(server: &MockServer) -> GitHubContentClient {
        GitHubContentClient::new(&server.uri(), reqwest::Client::new())
    }

    async fn respond(server: &MockServer, verb: &str, status: u16, body: serde_json::Value) {
        Mock::given(method(verb))
            .and(path(CONTENTS))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn put(
        client: &GitHubContentClient,
        condition: WriteCondition,
    ) -> Result<RevisionToken, RemoteError> {
        client
            .put_file("gho_abc", &repo(), "content/thoughts.json", "Add new thought", "W10=", condition)
            .await
    }

    #[tokio::test]
    async fn test_get_file_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(CONTENTS))
            .and(header("authorization", "Bearer gho_abc"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})))
            .mount(&server)
            .await;

        let file = client(&server)
            .get_file("gho_abc", &repo(), "content/thoughts.json")
            .await
            .unwrap();
        assert_eq!(file, None);
    }

    #[tokio::test]
    async fn test_get_file_returns_content_and_sha() {
        let server = MockServer::start().await;
        respond(
            &server,
            "GET",
            200,
            json!({"path": "content/thoughts.json", "sha": "3d21ec53", "encoding": "base64", "content": "W10=\n"}),
        )
        .await;

        let file = client(&server)
            .get_file("gho_abc", &repo(), "content/thoughts.json")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(file.content_base64, "W10=\n");
        assert_eq!(file.revision, RevisionToken::new("3d21ec53"));
    }

    #[tokio::test]
    async fn test_get_file_over_size_limit_is_too_large() {
        let server = MockServer::start().await;
        respond(
            &server,
            "GET",
            200,
            json!({"path": "content/thoughts.json", "sha": "3d21ec53", "encoding": "none", "content": ""}),
        )
        .await;

        let err = client(&server)
            .get_file("gho_abc", &repo(), "content/thoughts.json")
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::TooLarge);
    }

    #[tokio::test]
    async fn test_create_omits_sha_and_replace_sends_it() {
        let server = MockServer::start().await;
        respond(&server, "PUT", 201, json!({"content": {"sha": "95b966ae"}})).await;
        let client = client(&server);

        let created = put(&client, WriteCondition::Create).await.unwrap();
        assert_eq!(created, RevisionToken::new("95b966ae"));
        put(&client, WriteCondition::Replace(RevisionToken::new("3d21ec53")))
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let bodies: Vec<serde_json::Value> = requests
            .iter()
            .map(|r| serde_json::from_slice(&r.body).unwrap())
            .collect();
        assert_eq!(bodies.len(), 2);
        assert!(bodies[0].get("sha").is_none());
        assert_eq!(bodies[0]["content"], "W10=");
        assert_eq!(bodies[1]["sha"], "3d21ec53");
    }

    #[tokio::test]
    async fn test_stale_sha_on_replace_is_conflict() {
        let server = MockServer::start().await;
        respond(&server, "PUT", 409, json!({"message": "is at 95b966ae but expected 3d21ec53"})).await;

        let err = put(&client(&server), WriteCondition::Replace(RevisionToken::new("3d21ec53")))
            .await
            .unwrap_err();
        assert_eq!(err, RemoteError::Conflict);
    }

    #[tokio::test]
    async fn test_existing_file_on_create_is_already_exists() {
        let server = MockServer::start().await;
        respond(&server, "PUT", 422, json!({"message": "Invalid request.\n\n\"sha\" wasn't supplied."})).await;

        let err = put(&client(&server), WriteCondition::Create).await.unwrap_err();
        assert_eq!(err, RemoteError::AlreadyExists);
    }

    #[tokio::test]
    async fn test_validation_failure_on_replace_is_unexpected() {
        let server = MockServer::start().await;
        respond(&server, "PUT", 422, json!({"message": "content is not valid Base64"})).await;

        let err = put(&client(&server), WriteCondition::Replace(RevisionToken::new("3d21ec53")))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::Unexpected { status: 422, ref message } if message.contains("Base64")));
    }

    #[tokio::test]
    async fn test_conflict_status_on_create_is_unexpected() {
        let server = MockServer::start().await;
        respond(&server, "PUT", 409, json!({"message": "Git Repository is empty."})).await;

        let err = put(&client(&server), WriteCondition::Create).await.unwrap_err();
        assert!(matches!(err, RemoteError::Unexpected { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_exhausted_rate_limit_is_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/repos/octocat/tinymind-blog"))
            .respond_with(
                ResponseTemplate::new(403)
                    .insert_header("x-ratelimit-remaining", "0")
                    .set_body_json(json!({"message": "API rate limit exceeded"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).get_repository("gho_abc", &repo()).await.unwrap_err();
        assert_eq!(err, RemoteError::RateLimited);
    }

    #[tokio::test]
    async fn test_rejected_write_is_not_retried_as_concurrent_update() {
        let server = MockServer::start().await;
        respond(
            &server,
            "GET",
            200,
            json!({"path": "content/thoughts.json", "sha": "3d21ec53", "encoding": "base64", "content": "W10="}),
        )
        .await;
        respond(&server, "PUT", 422, json!({"message": "content is too large"})).await;

        let store = DocumentStore::new(
            Arc::new(client(&server)),
            DocumentConfig {
                repo_name: "tinymind-blog".into(),
                path: "content/thoughts.json".into(),
            },
        );
        let err = store
            .append("octocat", "gho_abc", Thought::new("hello", "octocat", Utc::now()))
            .await
            .unwrap_err();

        assert!(matches!(err, TinymindError::RemoteWriteFailed(_)));
        assert!(!err.is_retriable());
    }
}
