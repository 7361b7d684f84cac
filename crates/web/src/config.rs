use std::str::FromStr;

use albatross_http::connection::DEFAULT_READ_CHUNK;
use serde::Deserialize;
use tracing::Level;

/// Settings a [`Server`](crate::Server) is built with.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use albatross_web::ServerConfig;
///
/// let config = ServerConfig::from_json(r#"{"port": 9000, "spoof_options": false}"#).unwrap();
/// assert_eq!(config.address(), "0.0.0.0:9000");
/// assert!(!config.spoof_options);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound of a single read from a connection.
    pub max_read_chunk: usize,
    /// Answer `OPTIONS` on routes without an `OPTIONS` handler with an `Allow` header
    /// instead of `405 Method Not Allowed`.
    pub spoof_options: bool,
    /// `trace`, `debug`, `info`, `warn` or `error`.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            max_read_chunk: DEFAULT_READ_CHUNK,
            spoof_options: true,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured log level, `None` if it is not a level name.
    pub fn max_level(&self) -> Option<Level> {
        Level::from_str(self.log_level.trim()).ok()
    }
}
