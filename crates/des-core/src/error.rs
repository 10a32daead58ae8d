//! Framework base error type.
//!
//! Sub-crates define their own error enums and either convert `CoreError`
//! in via `#[from]` or keep them separate; both patterns appear downstream.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid tick literal {0:?}")]
    TickLiteral(String),
}

/// Shorthand result type for `des-core`.
pub type CoreResult<T> = Result<T, CoreError>;
