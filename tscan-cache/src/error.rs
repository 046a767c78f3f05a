//! Error types for the tscan cache layer

use std::path::PathBuf;

use thiserror::Error;

/// The main error type for cache operations
#[derive(Error, Debug)]
pub enum Error {
    /// A clause method or `build()` was called before a verb bound a table
    #[error("The query ({query}) does not specify the table name.")]
    MissingTable { query: String },

    /// A value of the wrong shape was handed to the builder
    #[error("{message}")]
    ValueType { message: String },

    /// Operator name that is not part of the registry
    #[error("The operator '{name}' is not supported.")]
    UnknownOperator { name: String },

    /// Connection or cursor accessed outside of an open scope
    #[error("{resource} is not established.")]
    ConnectionNotEstablished { resource: &'static str },

    /// `open()` called on a manager whose scope is still open
    #[error("Connection to '{}' is already open.", path.display())]
    AlreadyOpen { path: PathBuf },

    /// Engine error, surfaced unmodified
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Row decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration field failed validation
    #[error("{field}: {message}")]
    Validation { field: String, message: String },

    /// Cache directory does not exist and creation was not requested
    #[error("Cache directory \"{}\" does not exist.", path.display())]
    CacheDirNotFound { path: PathBuf },

    /// Cache directory could not be created or resolved
    #[error("Failed to create cache directory \"{}\": {source}", path.display())]
    CacheDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience Result type for cache operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new missing table error from the offending builder's state
    pub fn missing_table(query: impl std::fmt::Debug) -> Self {
        Self::MissingTable {
            query: format!("{:?}", query),
        }
    }

    /// Create a new value type error
    pub fn value_type(message: impl Into<String>) -> Self {
        Self::ValueType {
            message: message.into(),
        }
    }

    /// Create a new unknown operator error
    pub fn unknown_operator(name: impl Into<String>) -> Self {
        Self::UnknownOperator { name: name.into() }
    }

    /// Create a new connection-not-established error
    pub fn not_established(resource: &'static str) -> Self {
        Self::ConnectionNotEstablished { resource }
    }

    /// Create a new validation error
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Short name of the error variant, used by the preview renderer
    pub fn kind(&self) -> &'static str {
        match self {
            Error::MissingTable { .. } => "MissingTable",
            Error::ValueType { .. } => "ValueType",
            Error::UnknownOperator { .. } => "UnknownOperator",
            Error::ConnectionNotEstablished { .. } => "ConnectionNotEstablished",
            Error::AlreadyOpen { .. } => "AlreadyOpen",
            Error::Database(_) => "Database",
            Error::Serialization(_) => "Serialization",
            Error::Validation { .. } => "Validation",
            Error::CacheDirNotFound { .. } => "CacheDirNotFound",
            Error::CacheDir { .. } => "CacheDir",
        }
    }
}
