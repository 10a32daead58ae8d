use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RandError {
    /// Scripted construction failed (bad arity or malformed argument).
    #[error("{class}: {msg}")]
    Parse { msg: String, class: &'static str },

    #[error("unknown distribution {0:?}")]
    UnknownDistribution(String),

    #[error("unable to open rand file: {0}")]
    Io(#[from] std::io::Error),

    #[error("rand file {0:?} holds no values")]
    ShortFile(PathBuf),

    #[error("malformed value {token:?} in rand file {path:?}")]
    MalformedPdf { path: PathBuf, token: String },

    /// The requested bound does not exist for this distribution.
    #[error("{class}: bound cannot be computed for this variable type")]
    Unbounded { class: &'static str },
}

/// Shorthand result type for `des-random`.
pub type RandResult<T> = Result<T, RandError>;
