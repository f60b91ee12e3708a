use legisync_storage::{StorageError, WatchedKind};
use std::str::FromStr;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Search index error: {0}")]
    Index(#[from] IndexError),

    #[error("Projection error: {0}")]
    Projection(#[from] ProjectionError),

    #[error("Propagation error: {0}")]
    Propagation(#[from] PropagationError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    Parse(String),
}

impl SyncError {
    pub fn invalid_input<E: std::fmt::Display>(e: E) -> Self {
        Self::InvalidInput(e.to_string())
    }

    pub fn config<E: std::fmt::Display>(e: E) -> Self {
        Self::Config(e.to_string())
    }

    pub fn parse<E: std::fmt::Display>(e: E) -> Self {
        Self::Parse(e.to_string())
    }
}

impl From<InterceptError<StorageError>> for SyncError {
    fn from(err: InterceptError<StorageError>) -> Self {
        match err {
            InterceptError::Write(e) => SyncError::Storage(e),
            InterceptError::Propagation(e) => SyncError::Propagation(e),
        }
    }
}

/// Failures talking to the search service
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Unauthorized ({status}): {message}")]
    Unauthorized { status: u16, message: String },

    /// Schema mismatch, unknown collection, malformed document
    #[error("Rejected by search service ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Search service error ({status}): {message}")]
    Service { status: u16, message: String },

    #[error("Document for collection '{collection}' has no usable `id`")]
    MissingIdentifier { collection: String },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl IndexError {
    /// Map a non-success HTTP status to an error
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => IndexError::Unauthorized { status, message },
            400 | 404 | 409 | 422 => IndexError::Rejected { status, message },
            _ => IndexError::Service { status, message },
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            IndexError::Transport(_) | IndexError::Timeout(_) | IndexError::Service { .. } => {
                ErrorCategory::Transient
            }
            // The index disagrees with the document (schema drift, missing
            // collection); the entry must survive until the index is fixed
            IndexError::Unauthorized { .. } | IndexError::Rejected { .. } => {
                ErrorCategory::Infrastructure
            }
            IndexError::MissingIdentifier { .. } | IndexError::Serialization(_) => {
                ErrorCategory::Permanent
            }
        }
    }
}

impl From<reqwest::Error> for IndexError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            IndexError::Timeout(err.to_string())
        } else if err.is_decode() {
            IndexError::Serialization(err.to_string())
        } else {
            IndexError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(err: serde_json::Error) -> Self {
        IndexError::Serialization(err.to_string())
    }
}

/// A payload that cannot be turned into an index document
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProjectionError {
    #[error("{kind} payload must be a JSON object")]
    NotAnObject { kind: WatchedKind },

    #[error("{kind}.{field}: {message}")]
    InvalidField {
        kind: WatchedKind,
        field: &'static str,
        message: String,
    },
}

/// Failure after the primary write committed
#[derive(Error, Debug)]
pub enum PropagationError {
    /// The durable log was not written; nothing can replay this mutation
    #[error("Queue write failed: {0}")]
    QueueWrite(#[source] StorageError),

    #[error("Projection failed: {0}")]
    Projection(#[source] ProjectionError),

    #[error("Index upsert failed: {0}")]
    IndexUpsert(#[source] IndexError),
}

impl PropagationError {
    /// True when a queue entry exists and replay can recover the index
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PropagationError::QueueWrite(_))
    }
}

/// Error returned by the mutation interceptor
#[derive(Error, Debug)]
pub enum InterceptError<E> {
    /// The underlying write failed; surfaced unchanged, nothing was propagated
    #[error(transparent)]
    Write(E),

    /// Only produced when the propagation policy requires a durable log
    #[error("Propagation failed: {0}")]
    Propagation(#[source] PropagationError),
}

impl<E> InterceptError<E> {
    pub fn write_error(&self) -> Option<&E> {
        match self {
            InterceptError::Write(e) => Some(e),
            InterceptError::Propagation(_) => None,
        }
    }
}

/// How replay treats an index failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    /// Retried with backoff: refused connection, timeout, 5xx
    Transient,
    /// The payload itself cannot be indexed (no usable id); the entry is skipped
    Permanent,
    /// Bad API key, or an index whose schema rejects the document; the entry stays pending
    Infrastructure,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::Transient => "transient",
            ErrorCategory::Permanent => "permanent",
            ErrorCategory::Infrastructure => "infrastructure",
        }
    }
}

impl FromStr for ErrorCategory {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "transient" => Ok(ErrorCategory::Transient),
            "permanent" => Ok(ErrorCategory::Permanent),
            "infrastructure" => Ok(ErrorCategory::Infrastructure),
            _ => Err(SyncError::parse(format!("Invalid error category: {}", s))),
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
