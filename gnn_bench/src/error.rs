use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while resolving a benchmark run before any tensor work starts.
#[derive(Error, Debug)]
pub enum BenchError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The npz bundle has no array with this name.
    #[error("array `{0}` missing from npz bundle")]
    MissingArray(String),

    #[error("array `{name}` has unsupported dtype `{dtype}`")]
    UnsupportedDtype { name: String, dtype: String },

    #[error("malformed edge list at line {line}: {reason}")]
    EdgeList { line: usize, reason: String },

    #[error("graph cache error: {0}")]
    Cache(#[from] bincode::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("unknown dataset format `{0}`")]
    UnknownFormat(String),

    /// A precondition on the loaded data does not hold.
    #[error("shape mismatch: {0}")]
    Shape(String),
}

impl BenchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BenchError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        BenchError::Shape(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;
