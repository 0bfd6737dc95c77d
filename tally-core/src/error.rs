use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid rule '{name}': {}", .errors.join("; "))]
    InvalidRule { name: String, errors: Vec<String> },

    #[error("Invalid {table} row {row}: {details}")]
    InvalidRow {
        table: &'static str,
        row: usize,
        details: String,
    },

    #[error("Storage session is not signed in")]
    SignedOut,

    #[error("Storage session expired at {0}")]
    SessionExpired(chrono::DateTime<chrono::Utc>),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CoreError>;
