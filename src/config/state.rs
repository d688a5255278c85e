// Application state module
// Holds the loaded configuration and the injected URL store

use std::sync::Arc;
use tokio::sync::Mutex;

use super::types::Config;
use crate::storage::UrlStore;

/// Application state shared by every connection
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn UrlStore>,
    /// Serialises read-modify-write cycles on the store so concurrent
    /// updates for different dates cannot overwrite each other
    pub write_lock: Mutex<()>,
    /// Pooled client for upstream proxy calls
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config, store: Arc<dyn UrlStore>) -> Self {
        Self {
            config,
            store,
            write_lock: Mutex::new(()),
            http_client: reqwest::Client::new(),
        }
    }
}
