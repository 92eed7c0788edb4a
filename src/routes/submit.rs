//! POST /submit
//!
//! Form-encoded body with a `content` field. Requires a session.
//! - 302 home on success
//! - 401 without a session, 400 on empty content (no remote calls made)
//! - 409 when concurrent updates kept winning the race
//! - 500 on any other failure

use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use serde::Deserialize;
use tracing::{debug, error, warn};

use super::{json_error, redirect, FullBody};
use crate::server::AppState;
use crate::types::TinymindError;

#[derive(Debug, Default, Deserialize)]
pub struct SubmitForm {
    #[serde(default)]
    pub content: String,
}

pub async fn handle_submit(state: &AppState, headers: &HeaderMap, body: &[u8]) -> Response<FullBody> {
    let session = state.sessions.read(headers);

    let form: SubmitForm = serde_urlencoded::from_bytes(body).unwrap_or_else(|e| {
        debug!(error = %e, "Unparseable submit form, treating as empty");
        SubmitForm::default()
    });

    match state.submissions.submit(session.as_ref(), &form.content).await {
        Ok(_) => redirect(&state.args.home_url(), &[]),
        Err(e) => {
            match &e {
                TinymindError::ValidationFailed(reason) => debug!(reason = %reason, "Rejected submission"),
                TinymindError::ConcurrentModification { .. } => warn!(error = %e, "Submission lost every retry"),
                _ => error!(error = %e, "Error submitting thought"),
            }
            let status = e.status_code();
            let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
                "Failed to submit thought"
            } else {
                e.public_message()
            };
            json_error(status, message)
        }
    }
}
