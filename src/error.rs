use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while discovering, parsing or loading a single input file.
#[derive(Debug, Error)]
pub enum EtlError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {path} at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("{path} contains no records")]
    EmptyFile { path: PathBuf },

    #[error("{path} line {line}: missing required field '{field}'")]
    MissingField {
        path: PathBuf,
        line: usize,
        field: &'static str,
    },

    #[error("timestamp {ts} is out of range")]
    InvalidTimestamp { ts: i64 },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("failed to walk {root}: {source}")]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

pub type EtlResult<T> = Result<T, EtlError>;
