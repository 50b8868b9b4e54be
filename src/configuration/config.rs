use super::types::FileConfig;
use crate::error_handling::types::ConfigError;
use clap::Parser;
use log::{debug, info};
use regex::Regex;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 29687;
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";
pub const DEFAULT_QUERY_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/omnis/config.toml";

/// `scheme://host[:port]`, the only form CORS accepts as an origin.
const ORIGIN_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9+.-]*://(\[[0-9A-Fa-f:.]+\]|[^/?#\s:@\[\]]+)(:[0-9]{1,5})?$";

fn origin_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(ORIGIN_PATTERN).expect("origin pattern is a valid regex"))
}

/// Command line of the `omnis` binary.
///
/// Flags and their environment variables override whatever the
/// configuration file says.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "omnis")]
#[command(version)]
#[command(about = "Network traffic dashboard backend")]
pub struct Args {
    /// Path of the TOML configuration file
    #[arg(long, env = "OMNIS_CONFIG")]
    pub config: Option<PathBuf>,

    /// SQLite database written by the collector
    #[arg(long, env = "DATABASE_PATH")]
    pub database_path: Option<PathBuf>,

    /// Port the HTTP API listens on
    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Address the HTTP API binds to
    #[arg(long)]
    pub bind_address: Option<String>,
}

/// Runtime configuration of the dashboard backend.
///
/// Built from, in increasing priority: defaults, the TOML file, then the
/// command line and environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// SQLite database file. A leading `~/` is expanded against `$HOME`.
    pub database_path: PathBuf,
    pub bind_address: String,
    pub port: u16,
    /// Upper bound on every storage call made while serving a request.
    pub query_timeout_ms: u64,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
    /// `env_logger` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::new(),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            query_timeout_ms: DEFAULT_QUERY_TIMEOUT_MS,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            log_level: "info".to_string(),
        }
    }
}

/// Replaces a leading `~/` with `$HOME`. Other paths come back unchanged.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), std::env::var_os("HOME")) {
        (Ok(rest), Some(home)) => PathBuf::from(home).join(rest),
        _ => path.to_path_buf(),
    }
}

impl Config {
    /// Reads and parses a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        info!("Configuration read from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(text).map_err(|e| ConfigError::TomlError(e.to_string()))?;
        let mut config = Config::default();
        config.apply_file(file);
        Ok(config)
    }

    /// Parses the process command line and resolves the final configuration.
    pub fn from_args() -> Result<Self, ConfigError> {
        Self::resolve(Args::parse())
    }

    pub fn try_from_args<I, T>(iter: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args = Args::try_parse_from(iter).map_err(|e| ConfigError::MissingValue(e.to_string()))?;
        Self::resolve(args)
    }

    /// Loads the file named by `args` (or the default location), then lays
    /// the command line over it. A missing file is tolerated only when the
    /// database path came from the command line or environment.
    pub fn resolve(args: Args) -> Result<Self, ConfigError> {
        let path = expand_home(
            args.config
                .as_deref()
                .unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH)),
        );

        let mut config = match Self::from_file(&path) {
            Ok(config) => config,
            Err(ConfigError::IoError(e)) if e.kind() == ErrorKind::NotFound && args.database_path.is_some() => {
                debug!("No configuration file at {}, using defaults", path.display());
                Config::default()
            }
            Err(e) => return Err(e),
        };

        config.apply_args(&args);
        config.database_path = expand_home(&config.database_path);
        config.validate()?;
        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) {
        if let Some(path) = file.database.path {
            self.database_path = path;
        }
        if let Some(addr) = file.server.bind_address {
            self.bind_address = addr;
        }
        if let Some(port) = file.server.port {
            self.port = port;
        }
        if let Some(ms) = file.server.query_timeout_ms {
            self.query_timeout_ms = ms;
        }
        if let Some(origins) = file.server.allowed_origins {
            self.allowed_origins = origins;
        }
        if let Some(level) = file.log_level {
            self.log_level = level;
        }
    }

    fn apply_args(&mut self, args: &Args) {
        if let Some(path) = &args.database_path {
            self.database_path = path.clone();
        }
        if let Some(port) = args.port {
            self.port = port;
        }
        if let Some(addr) = &args.bind_address {
            self.bind_address = addr.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::MissingValue("database path".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::NotInRange("port must be between 1 and 65535".to_string()));
        }
        if self.query_timeout_ms == 0 {
            return Err(ConfigError::NotInRange("query_timeout_ms must be greater than 0".to_string()));
        }
        if self.bind_address.parse::<IpAddr>().is_err() {
            return Err(ConfigError::NotInRange(format!(
                "bind_address {:?} is not an IP address",
                self.bind_address
            )));
        }
        if let Some(origin) = self.allowed_origins.iter().find(|o| !origin_pattern().is_match(o)) {
            return Err(ConfigError::NotInRange(format!(
                "allowed origin {:?} is not scheme://host[:port]",
                origin
            )));
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self
            .bind_address
            .parse()
            .map_err(|_| ConfigError::NotInRange(format!("bind_address {:?}", self.bind_address)))?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}
