use std::path::PathBuf;
use thiserror::Error;

/// A structural or numeric fault in an instance file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MalformedInstance {
    #[error("file ends before {field}")]
    Missing { field: String },
    #[error("line {line}: {field} is not a valid integer: `{text}`")]
    NotANumber {
        line: usize,
        field: String,
        text: String,
    },
    #[error("line {line}: expected `weight value reference`, found {found} field(s)")]
    FieldCount { line: usize, found: usize },
}

#[derive(Debug, Error)]
pub enum AllocError {
    #[error("instance not found: {}", path.display())]
    InstanceNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed instance {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: MalformedInstance,
    },
    #[error("solver `{0}` is not available")]
    SolverUnavailable(String),
    #[error("invalid configuration {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
