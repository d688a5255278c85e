// Configuration module entry point
// Loads layered configuration and holds the shared runtime state

mod state;
mod types;

use std::net::SocketAddr;

pub use state::AppState;
pub use types::{Config, HttpConfig, ProxyConfig};

/// Config file looked up when no path is given on the command line
pub const DEFAULT_CONFIG_PATH: &str = "config";

/// Environment variable that overrides the listening port
pub const PORT_ENV: &str = "PORT";

impl Config {
    /// Load configuration from specified file path (without extension)
    ///
    /// Sources, lowest precedence first: built-in defaults, the optional
    /// config file, then `DAILY_*` environment variables
    /// (e.g. `DAILY_STORAGE__DATA_FILE=/var/lib/daily/data.json`).
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("DAILY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Apply the bare `PORT` variable; unset or unparsable values keep the configured port
    pub fn apply_port_override(&mut self, raw: Option<&str>) {
        if let Some(port) = raw.and_then(|value| value.trim().parse::<u16>().ok()) {
            self.server.port = port;
        }
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}
