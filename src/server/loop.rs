// Server loop module
// Accepts connections until a shutdown notification arrives

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use super::connection::accept_connection;
use crate::config::AppState;
use crate::logger;

/// Run the accept loop
///
/// Accept errors are logged and the loop keeps going. Once `shutdown` is
/// notified the listener is dropped; connections already handed to tasks
/// run to completion.
#[allow(clippy::ignored_unit_patterns)]
pub async fn start_server_loop(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: Arc<Notify>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(stream, peer_addr, &state, &active_connections);
                    }
                    Err(e) => {
                        logger::log_error(&format!("Failed to accept connection: {e}"));
                    }
                }
            }

            _ = shutdown.notified() => {
                break;
            }
        }
    }

    drop(listener);
    logger::log_server_stop();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::server::create_listener;
    use crate::storage::{MemoryStore, UrlStore};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn exchange(addr: std::net::SocketAddr, request: &str) -> String {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn test_serves_api_over_tcp() {
        let mut config = Config::default();
        config.logging.access_log = false;
        let store: Arc<dyn UrlStore> = Arc::new(MemoryStore::new());
        let state = Arc::new(AppState::new(config, store));

        let listener = create_listener("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let server = tokio::spawn(start_server_loop(
            listener,
            Arc::clone(&state),
            Arc::clone(&shutdown),
        ));

        let body = r#"{"date":"2024-05-01","urls":["https://a"]}"#;
        let update = exchange(
            addr,
            &format!(
                "POST /api/update HTTP/1.1\r\nHost: test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            ),
        )
        .await;
        assert!(update.starts_with("HTTP/1.1 200 OK"), "{update}");
        assert!(update.ends_with(r#"{"ok":true}"#), "{update}");

        let read = exchange(
            addr,
            "GET /api/data?date=2024-05-01 HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(read.starts_with("HTTP/1.1 200 OK"), "{read}");
        assert!(read.to_ascii_lowercase().contains("cache-control: no-store"), "{read}");
        assert!(
            read.ends_with(r#"{"date":"2024-05-01","urls":["https://a"]}"#),
            "{read}"
        );

        shutdown.notify_one();
        server.await.unwrap().unwrap();
    }
}
