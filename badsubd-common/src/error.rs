use std::io;

use thiserror::Error;

pub type EngineResult<T> = Result<T, EngineError>;

/// Every failure mode the storage and SQL layers can raise.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("malformed statement: {0}")]
    BadStatement(String),

    #[error("unsupported statement: {0}")]
    UnsupportedStatement(String),

    #[error("unknown table '{0}'")]
    UnknownTable(String),

    #[error("unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },

    #[error("table '{0}' already exists")]
    AlreadyExists(String),

    #[error("type mismatch for column '{column}': {reason}")]
    TypeMismatch { column: String, reason: String },

    #[error("value out of range for column '{column}': {reason}")]
    OutOfRange { column: String, reason: String },

    #[error("corrupt row in table '{table}' at offset {offset}: {reason}")]
    CorruptRow {
        table: String,
        offset: u64,
        reason: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Schema(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}
