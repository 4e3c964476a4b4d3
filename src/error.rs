// src/error.rs

use thiserror::Error;

/// A projection asked for columns the source does not have.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("missing required column(s) {missing:?}; source has {available:?}")]
pub struct MissingColumnError {
    pub missing: Vec<String>,
    pub available: Vec<String>,
}
