//! Configuration module for the directory backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key the upstream gateway must present (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Allowed browser origin; any origin when unset
    pub cors_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("BIZDIR_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("BIZDIR_DB_PATH")
            .unwrap_or_else(|_| "./data/bizdir.sqlite".to_string())
            .into();

        let bind_addr = env::var("BIZDIR_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:5001".to_string())
            .parse()?;

        let log_level = env::var("BIZDIR_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let cors_origin = env::var("BIZDIR_CORS_ORIGIN").ok().filter(|o| !o.is_empty());

        Ok(Self {
            api_psk,
            db_path,
            bind_addr,
            log_level,
            cors_origin,
        })
    }
}
