//! HTTP server implementation
//!
//! Uses hyper http1 with TokioIo. Each connection gets its own task; the
//! only thing shared between requests is the immutable `AppState`.

use bytes::Bytes;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::auth::{GitHubOAuth, GitHubOAuthConfig, OAuthProvider, SessionManager, USER_AGENT};
use crate::config::Args;
use crate::routes::{self, FullBody};
use crate::services::{LoginService, SubmissionService};
use crate::store::{
    DocumentConfig, DocumentStore, GitHubContentClient, ProvisionerConfig, RemoteStore,
    RepositoryProvisioner,
};
use crate::types::TinymindError;

/// Largest request body accepted
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Shared application state
pub struct AppState {
    pub args: Args,
    /// Cookie session reader/writer
    pub sessions: SessionManager,
    /// OAuth login flow
    pub login: LoginService,
    /// Read path for the home page and API
    pub documents: Arc<DocumentStore>,
    /// Write path for new thoughts
    pub submissions: SubmissionService,
}

impl AppState {
    /// Create AppState talking to GitHub
    pub fn new(args: Args) -> Result<Self, TinymindError> {
        let http_client = reqwest::Client::builder()
            .timeout(args.request_timeout())
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| TinymindError::Config(format!("failed to build HTTP client: {}", e)))?;

        let provider = Arc::new(GitHubOAuth::new(
            GitHubOAuthConfig::from_args(&args),
            http_client.clone(),
        ));
        let remote = Arc::new(GitHubContentClient::new(&args.github_api_url, http_client));

        Self::with_backends(args, provider, remote)
    }

    /// Create AppState over any provider and remote store
    pub fn with_backends(
        args: Args,
        provider: Arc<dyn OAuthProvider>,
        remote: Arc<dyn RemoteStore>,
    ) -> Result<Self, TinymindError> {
        let sessions = SessionManager::new(args.session_secret()?, args.secure_cookies())?;

        let provisioner = Arc::new(RepositoryProvisioner::new(
            Arc::clone(&remote),
            ProvisionerConfig::from_args(&args),
        ));
        let documents = Arc::new(DocumentStore::new(remote, DocumentConfig::from_args(&args)));

        let login = LoginService::new(provider, Arc::clone(&provisioner), sessions.clone());
        let submissions = SubmissionService::new(
            provisioner,
            Arc::clone(&documents),
            args.submit_max_attempts,
        );

        Ok(Self {
            args,
            sessions,
            login,
            documents,
            submissions,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<(), TinymindError> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Tinymind listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - session cookies are not marked Secure");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> Result<Response<FullBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = req.uri().query().map(str::to_string);

    info!("[{}] {} {}", addr, method, path);

    let (parts, body) = req.into_parts();

    let response = match (&method, path.as_str()) {
        (&Method::GET, "/") => routes::handle_home(&state, &parts.headers).await,

        (&Method::GET, "/health") => routes::health_check(),

        (&Method::GET, "/auth/github") => {
            routes::handle_github_auth(&state, query.as_deref()).await
        }

        (&Method::GET, "/auth/logout") => routes::handle_logout(&state),

        (&Method::GET, "/api/thoughts") => {
            routes::handle_list_thoughts(&state, &parts.headers).await
        }

        (&Method::POST, "/submit") | (&Method::POST, "/api/submit-thought") => {
            match read_body(body, MAX_BODY_BYTES).await {
                Ok(bytes) => routes::handle_submit(&state, &parts.headers, &bytes).await,
                Err(response) => response,
            }
        }

        (
            _,
            "/" | "/health" | "/auth/github" | "/auth/logout" | "/api/thoughts"
            | "/submit" | "/api/submit-thought",
        ) => routes::method_not_allowed_response(),

        _ => routes::not_found_response(&path),
    };

    Ok(response)
}

/// Buffer a request body, refusing it as soon as it passes `limit` bytes
async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, Response<FullBody>>
where
    B: Body,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => Err(routes::json_error(
            hyper::StatusCode::PAYLOAD_TOO_LARGE,
            "Request body too large",
        )),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            Err(routes::json_error(
                hyper::StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ))
        }
    }
}
