use serde::Deserialize;
use std::path::PathBuf;

/// On-disk layout of the TOML configuration file. Every key is optional;
/// anything left out falls back to the built-in default.
///
/// ```toml
/// log_level = "debug"
///
/// [database]
/// path = "~/.local/share/omnis/traffic.db"
///
/// [server]
/// bind_address = "127.0.0.1"
/// port = 29687
/// query_timeout_ms = 5000
/// allowed_origins = ["http://localhost:3000"]
/// ```
#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct FileConfig {
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub server: ServerSection,
    pub log_level: Option<String>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct DatabaseSection {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Default, PartialEq, Deserialize)]
pub struct ServerSection {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub query_timeout_ms: Option<u64>,
    pub allowed_origins: Option<Vec<String>>,
}
