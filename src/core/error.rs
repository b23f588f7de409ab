//! Crate-wide error taxonomy.
//!
//! Per-record failures (`TokenNotFound`, `CardTimeout`, `Extraction`) are
//! caught at the orchestrator boundary and mapped to an ERROR status for that
//! record only. `SurfaceSetup` aborts the current batch. `Config` and
//! `SessionInvalid` are fatal preconditions surfaced before any batch starts.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session invalid: {0}")]
    SessionInvalid(String),

    #[error("Initialization failed: {0}")]
    Initialization(String),

    #[error("WebDriver command failed: {0}")]
    Driver(#[from] fantoccini::error::CmdError),

    #[error("WebDriver session could not be established: {0}")]
    NewSession(#[from] fantoccini::error::NewSessionError),

    #[error("Recipient token not found for '{0}'")]
    TokenNotFound(String),

    #[error("Contact card did not become visible for '{0}'")]
    CardTimeout(String),

    #[error("Batch surface setup/teardown failed: {0}")]
    SurfaceSetup(String),

    #[error("Contact extraction failed: {0}")]
    Extraction(String),

    #[error("Spreadsheet store error: {0}")]
    Store(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl AppError {
    /// True for failures scoped to a single address; the orchestrator maps
    /// these to an ERROR status and moves on to the next record.
    pub fn is_record_scoped(&self) -> bool {
        matches!(
            self,
            AppError::TokenNotFound(_) | AppError::CardTimeout(_) | AppError::Extraction(_)
        )
    }
}
