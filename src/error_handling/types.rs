use std::fmt;
use std::time::Duration;

#[derive(Debug)]
pub enum ConfigError {
    IoError(std::io::Error),
    TomlError(String),
    MissingValue(String),
    NotInRange(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {}", e),
            ConfigError::TomlError(e) => write!(f, "TOML parsing error: {}", e),
            ConfigError::MissingValue(e) => write!(f, "Missing configuration value: {}", e),
            ConfigError::NotInRange(e) => write!(f, "Value out of range: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError(err)
    }
}

/// Category of a storage failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageErrorKind {
    ConnectionFailed,
    ReadFailed,
    WriteFailed,
    /// A batch insert was rolled back; `failed` holds the offending element indices.
    BatchRejected { failed: Vec<usize> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    pub kind: StorageErrorKind,
    pub message: String,
    /// Text of the underlying engine error, kept for logging.
    pub cause: Option<String>,
}

impl StorageError {
    pub fn new(kind: StorageErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(mut self, cause: impl fmt::Display) -> Self {
        self.cause = Some(cause.to_string());
        self
    }

    pub fn connection(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(StorageErrorKind::ConnectionFailed, message).with_cause(cause)
    }

    pub fn read(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(StorageErrorKind::ReadFailed, message).with_cause(cause)
    }

    pub fn write(message: impl Into<String>, cause: impl fmt::Display) -> Self {
        Self::new(StorageErrorKind::WriteFailed, message).with_cause(cause)
    }

    pub fn batch_rejected(what: &str, failed: Vec<usize>, cause: Option<String>) -> Self {
        let message = format!(
            "{} batch rejected, failed indices: {:?}",
            what, failed
        );
        Self {
            kind: StorageErrorKind::BatchRejected { failed },
            message,
            cause,
        }
    }

    /// Indices of rejected batch elements, empty for other kinds.
    pub fn failed_indices(&self) -> &[usize] {
        match &self.kind {
            StorageErrorKind::BatchRejected { failed } => failed,
            _ => &[],
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.kind {
            StorageErrorKind::ConnectionFailed => "Storage connection failed",
            StorageErrorKind::ReadFailed => "Storage read failed",
            StorageErrorKind::WriteFailed => "Storage write failed",
            StorageErrorKind::BatchRejected { .. } => "Storage batch rejected",
        };
        write!(f, "{}: {}", prefix, self.message)?;
        if let Some(cause) = &self.cause {
            write!(f, " ({})", cause)?;
        }
        Ok(())
    }
}

impl std::error::Error for StorageError {}

/// Errors surfaced by the query service to its callers.
#[derive(Debug)]
pub enum QueryError {
    /// Malformed or missing request input, names the offending field.
    Validation { field: String, message: String },
    NotFound(String),
    Storage(StorageError),
    Timeout(Duration),
}

impl QueryError {
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        QueryError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryError::Validation { field, message } => {
                write!(f, "Invalid `{}`: {}", field, message)
            }
            QueryError::NotFound(e) => write!(f, "Not found: {}", e),
            QueryError::Storage(e) => write!(f, "{}", e),
            QueryError::Timeout(d) => {
                write!(f, "Query exceeded its time budget of {} ms", d.as_millis())
            }
        }
    }
}

impl std::error::Error for QueryError {}

impl From<StorageError> for QueryError {
    fn from(err: StorageError) -> Self {
        QueryError::Storage(err)
    }
}

#[derive(Debug)]
pub enum WebError {
    BindFailed(String),
}

impl fmt::Display for WebError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WebError::BindFailed(e) => write!(f, "Web server bind failed: {}", e),
        }
    }
}

impl std::error::Error for WebError {}

#[derive(Debug)]
pub enum ControllerError {
    ConfigurationError(ConfigError),
    StorageError(StorageError),
    WebError(WebError),
}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerError::ConfigurationError(e) => write!(f, "Configuration error: {}", e),
            ControllerError::StorageError(e) => write!(f, "Storage error: {}", e),
            ControllerError::WebError(e) => write!(f, "Web error: {}", e),
        }
    }
}

impl std::error::Error for ControllerError {}

impl From<ConfigError> for ControllerError {
    fn from(err: ConfigError) -> Self {
        ControllerError::ConfigurationError(err)
    }
}

impl From<StorageError> for ControllerError {
    fn from(err: StorageError) -> Self {
        ControllerError::StorageError(err)
    }
}

impl From<WebError> for ControllerError {
    fn from(err: WebError) -> Self {
        ControllerError::WebError(err)
    }
}
