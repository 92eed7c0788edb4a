//! GET /api/thoughts - the session user's thoughts as JSON

use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::warn;

use super::{json_error, json_response, FullBody};
use crate::server::AppState;
use crate::types::{Thought, TinymindError, ValidationError};

#[derive(Debug, Serialize)]
pub struct ThoughtsResponse {
    pub thoughts: Vec<Thought>,
}

pub async fn handle_list_thoughts(state: &AppState, headers: &HeaderMap) -> Response<FullBody> {
    let Some(session) = state.sessions.read(headers) else {
        let e = TinymindError::ValidationFailed(ValidationError::MissingSession);
        return json_error(e.status_code(), "You must be logged in to read thoughts");
    };

    match state.documents.read(&session.username, &session.access_token).await {
        Ok(thoughts) => json_response(
            StatusCode::OK,
            &ThoughtsResponse {
                thoughts: thoughts.into_vec(),
            },
        ),
        Err(e) => {
            warn!(user = %session.username, error = %e, "Thoughts read failed");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, e.public_message())
        }
    }
}
