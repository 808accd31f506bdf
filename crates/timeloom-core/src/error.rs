//! Error types for timeloom operations.
//!
//! Provides a structured error hierarchy with error codes and
//! constructor helpers for the common failure paths.

use thiserror::Error;

/// Result type alias for timeloom operations.
pub type TimeloomResult<T> = Result<T, TimeloomError>;

/// Main error type for all timeloom operations.
#[derive(Error, Debug)]
pub enum TimeloomError {
    /// Input validation failed (unknown table, unknown column, bad parameter).
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: ErrorCode,
        suggestion: Option<String>,
    },

    /// Table is not enrolled for history tracking.
    #[error("Table '{table}' is not tracked")]
    NotTracked { table: String, code: ErrorCode },

    /// Table is already enrolled for history tracking.
    #[error("Table '{table}' is already tracked")]
    AlreadyTracked { table: String, code: ErrorCode },

    /// Query construction failed (malformed version or as-of argument).
    #[error("Query error: {message}")]
    QueryBind { message: String, code: ErrorCode },

    /// SQL parsing failed.
    #[error("Parse error: {message}")]
    Parse { message: String, code: ErrorCode },

    /// Database operation failed.
    #[error("Database error: {message}")]
    Database {
        message: String,
        code: ErrorCode,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Validation (VAL_xxx)
    ValTableNotFound,
    ValColumnNotFound,
    ValInvalidInput,

    // Tracking (TRK_xxx)
    TrkNotTracked,
    TrkAlreadyTracked,

    // Query (QRY_xxx)
    QryMissingVersion,
    QryNoVersionAtTime,

    // Parse (PARSE_xxx)
    ParseInvalidSql,

    // Database (DB_xxx)
    DbOperationFailed,

    // Internal
    Internal,
}

impl ErrorCode {
    /// Get the string representation of the error code.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValTableNotFound => "VAL_001",
            ErrorCode::ValColumnNotFound => "VAL_002",
            ErrorCode::ValInvalidInput => "VAL_003",
            ErrorCode::TrkNotTracked => "TRK_001",
            ErrorCode::TrkAlreadyTracked => "TRK_002",
            ErrorCode::QryMissingVersion => "QRY_001",
            ErrorCode::QryNoVersionAtTime => "QRY_002",
            ErrorCode::ParseInvalidSql => "PARSE_001",
            ErrorCode::DbOperationFailed => "DB_001",
            ErrorCode::Internal => "INT_001",
        }
    }
}

impl TimeloomError {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            code: ErrorCode::ValInvalidInput,
            suggestion: None,
        }
    }

    /// Create a validation error for a missing table.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::Validation {
            message: format!("table '{}' does not exist", table.into()),
            code: ErrorCode::ValTableNotFound,
            suggestion: Some("Check the table name against the database schema".to_string()),
        }
    }

    /// Create a validation error for a missing column.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::Validation {
            message: format!(
                "column '{}' does not exist in table '{}'",
                column.into(),
                table.into()
            ),
            code: ErrorCode::ValColumnNotFound,
            suggestion: Some("The primary key column must be a column of the tracked table".to_string()),
        }
    }

    /// Create a not-tracked error.
    pub fn not_tracked(table: impl Into<String>) -> Self {
        Self::NotTracked {
            table: table.into(),
            code: ErrorCode::TrkNotTracked,
        }
    }

    /// Create an already-tracked error.
    pub fn already_tracked(table: impl Into<String>) -> Self {
        Self::AlreadyTracked {
            table: table.into(),
            code: ErrorCode::TrkAlreadyTracked,
        }
    }

    /// Create a query-bind error.
    pub fn query_bind(message: impl Into<String>) -> Self {
        Self::QueryBind {
            message: message.into(),
            code: ErrorCode::QryMissingVersion,
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
            code: ErrorCode::ParseInvalidSql,
        }
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
            code: ErrorCode::DbOperationFailed,
            source: None,
        }
    }

    /// Get the error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation { code, .. } => *code,
            Self::NotTracked { code, .. } => *code,
            Self::AlreadyTracked { code, .. } => *code,
            Self::QueryBind { code, .. } => *code,
            Self::Parse { code, .. } => *code,
            Self::Database { code, .. } => *code,
            _ => ErrorCode::Internal,
        }
    }

    /// Get a user-friendly suggestion for resolving this error.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Validation { suggestion, .. } => suggestion.as_deref(),
            Self::NotTracked { .. } => Some("Enable tracking for the table first"),
            Self::AlreadyTracked { .. } => {
                Some("Disable tracking before enabling it with a different key column")
            }
            Self::QueryBind { .. } => Some("Supply exactly one of 'version' or 'as_of'"),
            _ => None,
        }
    }
}

impl From<rusqlite::Error> for TimeloomError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Database {
            message: err.to_string(),
            code: ErrorCode::DbOperationFailed,
            source: Some(Box::new(err)),
        }
    }
}

impl From<sqlparser::parser::ParserError> for TimeloomError {
    fn from(err: sqlparser::parser::ParserError) -> Self {
        Self::Parse {
            message: err.to_string(),
            code: ErrorCode::ParseInvalidSql,
        }
    }
}
