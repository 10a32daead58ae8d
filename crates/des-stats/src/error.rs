use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatsError {
    #[error("trace I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("trace CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Shorthand result type for `des-stats`.
pub type StatsResult<T> = Result<T, StatsError>;
