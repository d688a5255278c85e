// API response helpers

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;

use super::types::ApiError;
use crate::http::cache::CachePolicy;
use crate::http::build_json_response;
use crate::logger;

/// Serialise `body` as compact JSON
pub fn json_response<T: Serialize>(
    status: StatusCode,
    body: &T,
    cache: Option<CachePolicy>,
) -> Response<Full<Bytes>> {
    match serde_json::to_vec(body) {
        Ok(json) => build_json_response(status, json, cache),
        Err(e) => {
            logger::log_error(&format!("Failed to serialize response: {e}"));
            build_json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                br#"{"error":"internal"}"#.to_vec(),
                None,
            )
        }
    }
}

/// Error response carrying the machine-readable code
pub fn error_response(error: ApiError) -> Response<Full<Bytes>> {
    json_response(error.status(), &error.body(), None)
}
