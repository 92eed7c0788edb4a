//! Liveness check

use hyper::{Response, StatusCode};
use serde::Serialize;

use super::{json_response, FullBody};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

/// GET /health - 200 while the process is serving
pub fn health_check() -> Response<FullBody> {
    json_response(
        StatusCode::OK,
        &HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}
