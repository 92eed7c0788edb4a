//! HTTP routes for Tinymind
//!
//! Handlers take already-split request parts (headers, query, body bytes)
//! and return complete responses, so they can be driven without a socket.

pub mod api;
pub mod auth_routes;
pub mod health;
pub mod home;
pub mod submit;

use bytes::Bytes;
use http_body_util::Full;
use hyper::http::response::Builder;
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

pub use api::handle_list_thoughts;
pub use auth_routes::{handle_github_auth, handle_logout};
pub use health::health_check;
pub use home::handle_home;
pub use submit::handle_submit;

pub type FullBody = Full<Bytes>;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON response with the given status
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<FullBody> {
    let json = serde_json::to_string(body).unwrap_or_else(|_| "{}".to_string());

    finish(
        Response::builder()
            .status(status)
            .header("Content-Type", "application/json")
            .header("Cache-Control", "no-store"),
        json,
    )
}

/// `{"error": message}` with the given status
pub fn json_error(status: StatusCode, message: &str) -> Response<FullBody> {
    json_response(
        status,
        &ErrorResponse {
            error: message.to_string(),
        },
    )
}

/// 302 to `location`, setting each of `cookies`
pub fn redirect(location: &str, cookies: &[String]) -> Response<FullBody> {
    let mut builder = Response::builder()
        .status(StatusCode::FOUND)
        .header("Location", location)
        .header("Cache-Control", "no-store");
    for cookie in cookies {
        builder = builder.header("Set-Cookie", cookie.as_str());
    }
    finish(builder, Bytes::new())
}

/// HTML page response
pub fn html_response(status: StatusCode, html: String) -> Response<FullBody> {
    finish(
        Response::builder()
            .status(status)
            .header("Content-Type", "text/html; charset=utf-8")
            .header("Cache-Control", "no-store"),
        html,
    )
}

/// Not found response
pub fn not_found_response(path: &str) -> Response<FullBody> {
    json_response(
        StatusCode::NOT_FOUND,
        &serde_json::json!({
            "error": "Not Found",
            "path": path,
        }),
    )
}

/// Method not allowed response
pub fn method_not_allowed_response() -> Response<FullBody> {
    json_error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
}

/// Build the response, falling back to a bare 500 if a header was invalid
fn finish(builder: Builder, body: impl Into<Bytes>) -> Response<FullBody> {
    builder.body(Full::new(body.into())).unwrap_or_else(|e| {
        error!(error = %e, "Failed to build response");
        let mut response = Response::new(Full::new(Bytes::from_static(
            br#"{"error":"Internal error"}"#,
        )));
        *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
        response
    })
}
