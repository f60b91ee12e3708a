//! Storage errors
//!
//! A single struct error carries an `ErrorKind` for matching, a message for
//! humans and the underlying cause, if any.

use std::fmt;
use thiserror::Error;

/// What went wrong, independent of the adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Backend failure (SQLite I/O, lock contention, corrupt file)
    Database,
    /// Stored or supplied JSON could not be (de)serialized
    Serialization,
    RecordNotFound,
    /// Write arguments do not match the action's shape, or violate a constraint
    InvalidArguments,
    /// A stored model / action / kind name is not part of the closed enums
    UnknownName,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Database => "database",
            ErrorKind::Serialization => "serialization",
            ErrorKind::RecordNotFound => "record_not_found",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::UnknownName => "unknown_name",
        }
    }

    /// Caused by the request rather than the store
    pub fn is_caller_error(&self) -> bool {
        matches!(self, ErrorKind::RecordNotFound | ErrorKind::InvalidArguments)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Cause = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
#[error("[{kind}] {message}")]
pub struct StorageError {
    pub kind: ErrorKind,
    pub message: String,
    #[source]
    pub source: Option<Cause>,
}

impl StorageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Serialization, message)
    }

    /// `Record not found: Legislator#<id>`
    pub fn record_not_found(model: impl fmt::Display, id: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::RecordNotFound,
            format!("Record not found: {}#{}", model, id),
        )
    }

    pub fn invalid_arguments(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArguments, message)
    }

    /// `Unknown <what>: <name>`, e.g. a queue row written by a newer build
    pub fn unknown_name(what: &str, name: impl fmt::Display) -> Self {
        Self::new(ErrorKind::UnknownName, format!("Unknown {}: {}", what, name))
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::RecordNotFound
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        let message = match err.sqlite_error_code() {
            Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked) => {
                format!("SQLite database is locked: {}", err)
            }
            _ => format!("SQLite error: {}", err),
        };
        StorageError::database(message).with_source(err)
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::serialization(format!("JSON error: {}", err)).with_source(err)
    }
}

pub type Result<T> = std::result::Result<T, StorageError>;
