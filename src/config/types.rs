// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5500;
pub const DEFAULT_DATA_FILE: &str = "data.json";
pub const DEFAULT_TWEET_UPSTREAM: &str = "https://api.vxtwitter.com/Twitter/status";

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub performance: PerformanceConfig,
    pub http: HttpConfig,
    pub proxy: ProxyConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            workers: None,
        }
    }
}

/// Persistence configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON document holding every date's URL list
    pub data_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_file: DEFAULT_DATA_FILE.to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    pub access_log_format: String,
    /// Access log file path (optional, stdout if not set)
    pub access_log_file: Option<String>,
    /// Error log file path (optional, stderr if not set)
    pub error_log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            access_log_format: "combined".to_string(),
            access_log_file: None,
            error_log_file: None,
        }
    }
}

/// Performance configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PerformanceConfig {
    pub keep_alive: bool,
    /// Upper bound on a connection's lifetime, in seconds
    pub connection_timeout: u64,
    pub max_connections: Option<u64>,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            keep_alive: true,
            connection_timeout: 30,
            max_connections: None,
        }
    }
}

/// HTTP configuration
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    /// Root directory for GET requests outside `/api`
    pub static_dir: String,
    pub index_files: Vec<String>,
    pub max_body_size: u64,
    pub server_name: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            static_dir: ".".to_string(),
            index_files: vec!["index.html".to_string(), "index.htm".to_string()],
            max_body_size: 1_048_576, // 1MB
            server_name: format!("daily-urls/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Upstream settings for the tweet metadata proxy
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL the tweet id is appended to as a path segment
    pub tweet_upstream: String,
    pub user_agent: String,
    /// Whole-request timeout for the upstream call, in seconds
    pub timeout: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            tweet_upstream: DEFAULT_TWEET_UPSTREAM.to_string(),
            user_agent: "Mozilla/5.0".to_string(),
            timeout: 10,
        }
    }
}
