//! HTTP response building module
//!
//! Builders for the status codes the service emits. A builder failure is
//! logged and degrades to a bare response rather than panicking.

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN,
};
use hyper::{Response, StatusCode};

use super::cache::{CachePolicy, STATIC_FILE_POLICY};

/// Content type for every JSON body the service produces
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Build JSON response from pre-serialised bytes
///
/// `cache` adds a `Cache-Control` header when set.
pub fn build_json_response(
    status: StatusCode,
    body: Vec<u8>,
    cache: Option<CachePolicy>,
) -> Response<Full<Bytes>> {
    let mut builder = Response::builder()
        .status(status)
        .header("Content-Type", JSON_CONTENT_TYPE)
        .header("Content-Length", body.len());

    if let Some(policy) = cache {
        builder = builder.header("Cache-Control", policy.to_header_value());
    }

    builder.body(Full::new(Bytes::from(body))).unwrap_or_else(|e| {
        log_build_error(status.as_str(), &e);
        Response::new(Full::new(Bytes::new()))
    })
}

/// Build a response with a status code and no body
pub fn build_empty_response(status: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Length", 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error(status.as_str(), &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 304 Not Modified response
pub fn build_304_response(etag: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::NOT_MODIFIED)
        .header("ETag", etag)
        .header("Cache-Control", STATIC_FILE_POLICY.to_header_value())
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("304", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build 404 Not Found response for static lookups
pub fn build_404_response(is_head: bool) -> Response<Full<Bytes>> {
    const BODY: &str = "404 Not Found";
    let body = if is_head {
        Bytes::new()
    } else {
        Bytes::from_static(BODY.as_bytes())
    };

    Response::builder()
        .status(StatusCode::NOT_FOUND)
        .header("Content-Type", "text/plain; charset=utf-8")
        .header("Content-Length", BODY.len())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("404", &e);
            Response::new(Full::new(Bytes::from_static(BODY.as_bytes())))
        })
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::PAYLOAD_TOO_LARGE)
        .header("Content-Type", "text/plain; charset=utf-8")
        .body(Full::new(Bytes::from("413 Payload Too Large")))
        .unwrap_or_else(|e| {
            log_build_error("413", &e);
            Response::new(Full::new(Bytes::from("413 Payload Too Large")))
        })
}

/// Build 301 redirect response
pub fn build_redirect_response(target: &str) -> Response<Full<Bytes>> {
    Response::builder()
        .status(StatusCode::MOVED_PERMANENTLY)
        .header("Location", target)
        .header("Content-Length", 0)
        .body(Full::new(Bytes::new()))
        .unwrap_or_else(|e| {
            log_build_error("301", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Build static file response with cache validators
pub fn build_cached_response(
    data: Bytes,
    content_type: &str,
    etag: &str,
    is_head: bool,
) -> Response<Full<Bytes>> {
    let content_length = data.len();
    let body = if is_head { Bytes::new() } else { data };

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", content_type)
        .header("Content-Length", content_length)
        .header("ETag", etag)
        .header("Cache-Control", STATIC_FILE_POLICY.to_header_value())
        .body(Full::new(body))
        .unwrap_or_else(|e| {
            log_build_error("200", &e);
            Response::new(Full::new(Bytes::new()))
        })
}

/// Add permissive CORS headers, as sent by the tweet metadata proxy
pub fn apply_cors_headers(headers: &mut HeaderMap) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET,POST,OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}

/// Log response build error
fn log_build_error(status: &str, error: &hyper::http::Error) {
    crate::logger::log_error(&format!("Failed to build {status} response: {error}"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_bytes(resp: Response<Full<Bytes>>) -> Bytes {
        resp.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_json_response_headers() {
        let resp = build_json_response(
            StatusCode::OK,
            br#"{"ok":true}"#.to_vec(),
            Some(CachePolicy::NoStore),
        );
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["content-type"], JSON_CONTENT_TYPE);
        assert_eq!(resp.headers()["cache-control"], "no-store");
        assert_eq!(resp.headers()["content-length"], "11");
        assert_eq!(body_bytes(resp).await, r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_json_response_without_cache_header() {
        let resp = build_json_response(StatusCode::BAD_REQUEST, b"{}".to_vec(), None);
        assert!(resp.headers().get("cache-control").is_none());
    }

    #[tokio::test]
    async fn test_empty_response() {
        let resp = build_empty_response(StatusCode::NOT_FOUND);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().get("content-type").is_none());
        assert!(body_bytes(resp).await.is_empty());
    }

    #[tokio::test]
    async fn test_404_head_has_no_body() {
        let resp = build_404_response(true);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(body_bytes(resp).await.is_empty());
    }

    #[test]
    fn test_cors_headers() {
        let mut resp = build_empty_response(StatusCode::OK);
        apply_cors_headers(resp.headers_mut());
        assert_eq!(resp.headers()["access-control-allow-origin"], "*");
        assert_eq!(resp.headers()["access-control-allow-methods"], "GET,POST,OPTIONS");
        assert_eq!(resp.headers()["access-control-allow-headers"], "Content-Type");
    }

    #[test]
    fn test_redirect() {
        let resp = build_redirect_response("/docs/");
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.headers()["location"], "/docs/");
    }
}
