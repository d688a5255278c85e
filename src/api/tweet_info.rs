// Tweet metadata proxy
// Forwards `GET /api/tweet_info?id=` to the upstream status API

use std::time::Duration;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Method, Response, StatusCode};
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::Url;
use thiserror::Error;

use super::response::{error_response, json_response};
use super::types::{ApiError, DetailedErrorBody};
use crate::config::{AppState, ProxyConfig};
use crate::http::cache::TWEET_INFO_POLICY;
use crate::http::urlencoded::query_param;
use crate::http::{apply_cors_headers, build_empty_response, build_json_response};
use crate::logger;

/// Upstream lookup failures
#[derive(Debug, Error)]
enum ProxyError {
    #[error("invalid upstream base URL '{0}'")]
    BadUpstream(String),

    #[error("{0}")]
    Request(#[from] reqwest::Error),

    #[error("upstream returned non-JSON content type '{0}'")]
    NonJson(String),

    #[error("upstream returned invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
}

impl ProxyError {
    fn body(&self) -> DetailedErrorBody {
        match self {
            Self::NonJson(_) => DetailedErrorBody {
                error: "upstream_invalid_response",
                details: "Upstream returned non-JSON".to_string(),
            },
            Self::InvalidJson(_) => DetailedErrorBody {
                error: "upstream_invalid_json",
                details: "Upstream returned invalid JSON".to_string(),
            },
            Self::BadUpstream(_) | Self::Request(_) => DetailedErrorBody {
                error: "proxy_error",
                details: self.to_string(),
            },
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::NonJson(_) | Self::InvalidJson(_) => StatusCode::BAD_GATEWAY,
            Self::BadUpstream(_) | Self::Request(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// `GET|OPTIONS /api/tweet_info?id=<status id>`
///
/// Every response carries CORS headers. A JSON upstream reply is forwarded
/// with its status code and cached for an hour.
pub async fn handle_tweet_info(
    method: &Method,
    query: Option<&str>,
    state: &AppState,
) -> Response<Full<Bytes>> {
    let mut response = if *method == Method::OPTIONS {
        build_empty_response(StatusCode::OK)
    } else {
        lookup(query, state).await
    };

    apply_cors_headers(response.headers_mut());
    response
}

async fn lookup(query: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    let Some(id) = query_param(query, "id") else {
        return error_response(ApiError::MissingId);
    };

    match fetch_tweet(&state.http_client, &state.config.proxy, &id).await {
        Ok((status, body)) => build_json_response(status, body.to_vec(), Some(TWEET_INFO_POLICY)),
        Err(e) => {
            logger::log_error(&format!("Tweet lookup for {id} failed: {e}"));
            json_response(e.status(), &e.body(), None)
        }
    }
}

async fn fetch_tweet(
    client: &reqwest::Client,
    config: &ProxyConfig,
    id: &str,
) -> Result<(StatusCode, Bytes), ProxyError> {
    let url = upstream_url(&config.tweet_upstream, id)?;

    let response = client
        .get(url)
        .header(USER_AGENT, &config.user_agent)
        .timeout(Duration::from_secs(config.timeout))
        .send()
        .await?;

    let status = response.status();
    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());
    let body = response.bytes().await?;

    if let Some(content_type) = content_type {
        if !content_type.contains("application/json") {
            return Err(ProxyError::NonJson(content_type));
        }
    }

    serde_json::from_slice::<serde::de::IgnoredAny>(&body).map_err(ProxyError::InvalidJson)?;
    Ok((status, body))
}

/// Append `id` to `base` as one percent-encoded path segment
fn upstream_url(base: &str, id: &str) -> Result<Url, ProxyError> {
    let mut url = Url::parse(base).map_err(|_| ProxyError::BadUpstream(base.to_string()))?;
    url.path_segments_mut()
        .map_err(|()| ProxyError::BadUpstream(base.to_string()))?
        .pop_if_empty()
        .push(id);
    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::storage::{MemoryStore, UrlStore};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve one canned HTTP reply and hand back the request head
    async fn spawn_upstream(
        status_line: &'static str,
        content_type: Option<&'static str>,
        body: &'static str,
    ) -> (SocketAddr, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = stream.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                head.extend_from_slice(&buf[..n]);
            }
            let _ = tx.send(String::from_utf8_lossy(&head).into_owned());

            let mut reply = format!("HTTP/1.1 {status_line}\r\n");
            if let Some(content_type) = content_type {
                reply.push_str(&format!("Content-Type: {content_type}\r\n"));
            }
            reply.push_str(&format!(
                "Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            ));
            stream.write_all(reply.as_bytes()).await.unwrap();
            stream.shutdown().await.unwrap();
        });

        (addr, rx)
    }

    fn state_for(upstream: SocketAddr) -> AppState {
        let mut config = Config::default();
        config.proxy.tweet_upstream = format!("http://{upstream}/Twitter/status");
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        let mut state = AppState::new(config, store);
        // Loopback upstreams must not be routed through an environment proxy
        state.http_client = reqwest::Client::builder().no_proxy().build().unwrap();
        state
    }

    async fn split(resp: Response<Full<Bytes>>) -> (StatusCode, hyper::HeaderMap, Bytes) {
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        (status, headers, body)
    }

    fn as_json(bytes: &Bytes) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    #[tokio::test]
    async fn test_options_is_empty_with_cors() {
        let state = AppState::new(Config::default(), Arc::new(MemoryStore::new()));
        let resp = handle_tweet_info(&Method::OPTIONS, None, &state).await;
        let (status, headers, body) = split(resp).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_missing_id() {
        let state = AppState::new(Config::default(), Arc::new(MemoryStore::new()));
        for query in [None, Some("id="), Some("other=1")] {
            let resp = handle_tweet_info(&Method::GET, query, &state).await;
            let (status, headers, body) = split(resp).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{query:?}");
            assert_eq!(headers["access-control-allow-methods"], "GET,POST,OPTIONS");
            assert_eq!(as_json(&body), json!({"error": "missing_id"}));
        }
    }

    #[tokio::test]
    async fn test_forwards_json_reply() {
        let (addr, request) =
            spawn_upstream("200 OK", Some("application/json"), r#"{"text":"hello"}"#).await;
        let state = state_for(addr);

        let resp = handle_tweet_info(&Method::GET, Some("id=12345"), &state).await;
        let (status, headers, body) = split(resp).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers["cache-control"], "public, max-age=3600");
        assert_eq!(headers["access-control-allow-origin"], "*");
        assert_eq!(body, r#"{"text":"hello"}"#);

        let head = request.await.unwrap();
        assert!(head.starts_with("GET /Twitter/status/12345 HTTP/1.1"), "{head}");
        assert!(head.to_ascii_lowercase().contains("user-agent: mozilla/5.0"), "{head}");
    }

    #[tokio::test]
    async fn test_upstream_status_is_kept() {
        let (addr, _) = spawn_upstream(
            "404 Not Found",
            Some("application/json; charset=utf-8"),
            r#"{"error":"not found"}"#,
        )
        .await;
        let state = state_for(addr);

        let resp = handle_tweet_info(&Method::GET, Some("id=1"), &state).await;
        let (status, _, body) = split(resp).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(as_json(&body), json!({"error": "not found"}));
    }

    #[tokio::test]
    async fn test_non_json_content_type() {
        let (addr, _) = spawn_upstream("200 OK", Some("text/html"), "<html></html>").await;
        let state = state_for(addr);

        let resp = handle_tweet_info(&Method::GET, Some("id=1"), &state).await;
        let (status, headers, body) = split(resp).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(headers.get("cache-control").is_none());
        assert_eq!(
            as_json(&body),
            json!({"error": "upstream_invalid_response", "details": "Upstream returned non-JSON"})
        );
    }

    #[tokio::test]
    async fn test_invalid_json_body() {
        let (addr, _) = spawn_upstream("200 OK", Some("application/json"), "{oops").await;
        let state = state_for(addr);

        let resp = handle_tweet_info(&Method::GET, Some("id=1"), &state).await;
        let (status, _, body) = split(resp).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(as_json(&body)["error"], "upstream_invalid_json");
    }

    #[tokio::test]
    async fn test_missing_content_type_still_parsed() {
        let (addr, _) = spawn_upstream("200 OK", None, "[1,2]").await;
        let state = state_for(addr);

        let resp = handle_tweet_info(&Method::GET, Some("id=1"), &state).await;
        let (status, _, body) = split(resp).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "[1,2]");
    }

    #[tokio::test]
    async fn test_unreachable_upstream() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let state = state_for(addr);

        let resp = handle_tweet_info(&Method::GET, Some("id=1"), &state).await;
        let (status, headers, body) = split(resp).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(headers["access-control-allow-origin"], "*");
        let body = as_json(&body);
        assert_eq!(body["error"], "proxy_error");
        assert!(body["details"].as_str().is_some_and(|d| !d.is_empty()));
    }

    #[test]
    fn test_upstream_url_encodes_id() {
        let url = upstream_url("https://api.example.com/Twitter/status", "1/2?x#y").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/Twitter/status/1%2F2%3Fx%23y");

        let url = upstream_url("https://api.example.com/status/", "42").unwrap();
        assert_eq!(url.as_str(), "https://api.example.com/status/42");

        assert!(upstream_url("not a url", "1").is_err());
    }
}
