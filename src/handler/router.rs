//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: matches the API endpoints,
//! sends other GET/HEAD requests to the static responder, and writes the
//! access log line once the response is known.

use crate::api;
use crate::config::AppState;
use crate::handler::static_files;
use crate::http;
use crate::logger::{self, AccessLogEntry};
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderMap, HeaderValue, SERVER};
use hyper::http::request::Parts;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request context for the static file responder
pub struct RequestContext<'a> {
    pub path: &'a str,
    pub query: Option<&'a str>,
    pub is_head: bool,
    pub if_none_match: Option<&'a str>,
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
    remote_addr: Option<SocketAddr>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let started = Instant::now();
    let (parts, body) = req.into_parts();

    let entry = state
        .config
        .logging
        .access_log
        .then(|| AccessLogEntry::from_request(remote_addr, &parts));

    let mut response = route_request(&parts, body, &state).await;
    apply_server_header(response.headers_mut(), &state.config.http.server_name);

    if let Some(mut entry) = entry {
        entry.status = response.status().as_u16();
        entry.body_bytes = response
            .body()
            .size_hint()
            .exact()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }

    Ok(response)
}

/// Route request based on method and path
async fn route_request<B>(parts: &Parts, body: B, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    let path = parts.uri.path();

    match (&parts.method, path) {
        (&Method::GET, api::DATA_PATH) => api::handle_get_data(parts.uri.query(), state).await,
        (&Method::GET | &Method::OPTIONS, api::TWEET_INFO_PATH) => {
            api::handle_tweet_info(&parts.method, parts.uri.query(), state).await
        }
        (&Method::POST, api::UPDATE_PATH) => {
            match read_body(&parts.headers, body, state.config.http.max_body_size).await {
                Ok(bytes) => api::handle_post_update(&bytes, state).await,
                Err(resp) => resp,
            }
        }
        (&Method::GET | &Method::HEAD, _) => {
            let ctx = RequestContext {
                path,
                query: parts.uri.query(),
                is_head: parts.method == Method::HEAD,
                if_none_match: parts
                    .headers
                    .get("if-none-match")
                    .and_then(|v| v.to_str().ok()),
            };
            static_files::serve_static(&ctx, &state.config.http).await
        }
        (&Method::POST, _) => http::build_empty_response(StatusCode::NOT_FOUND),
        (method, _) => {
            logger::log_warning(&format!("Method not implemented: {method} {path}"));
            http::build_empty_response(StatusCode::NOT_IMPLEMENTED)
        }
    }
}

/// Collect the request body, capped at `max_body_size`
///
/// An oversized body yields a 413 response. Any other read failure is
/// treated as an empty body.
async fn read_body<B>(
    headers: &HeaderMap,
    body: B,
    max_body_size: u64,
) -> Result<Bytes, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<BoxError>,
{
    if let Some(resp) = check_body_size(headers, max_body_size) {
        return Err(resp);
    }

    let limit = usize::try_from(max_body_size).unwrap_or(usize::MAX);
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.is::<LengthLimitError>() => {
            logger::log_error(&format!(
                "Request body exceeded {max_body_size} bytes while streaming"
            ));
            Err(http::build_413_response())
        }
        Err(e) => {
            logger::log_warning(&format!("Failed to read request body: {e}"));
            Ok(Bytes::new())
        }
    }
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size(headers: &HeaderMap, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = headers.get("content-length")?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
            Ok(size) if size > max_body_size => {
                logger::log_error(&format!(
                    "Request body too large: {size} bytes (max: {max_body_size})"
                ));
                Some(http::build_413_response())
            }
            Err(_) => {
                logger::log_warning(&format!(
                    "Invalid Content-Length value: '{size_str}', skipping size check"
                ));
                None
            }
            _ => None,
        },
    )
}

fn apply_server_header(headers: &mut HeaderMap, server_name: &str) {
    if server_name.is_empty() {
        return;
    }
    match HeaderValue::from_str(server_name) {
        Ok(value) => {
            headers.insert(SERVER, value);
        }
        Err(_) => logger::log_warning(&format!("Invalid server_name '{server_name}'")),
    }
}
