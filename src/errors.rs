//! Typed error hierarchy for taskboard.
//!
//! Two top-level enums cover the two client-side subsystems:
//! - `BoardError`: local board mutations (moves, creates, edits and deletes)
//! - `ClientError`: calls to the persistence collaborator over HTTP
//!
//! Server handlers and storage use `anyhow` internally and surface failures
//! through `server::api::ApiError`.

use thiserror::Error;

use crate::models::{ColumnId, FieldError, TaskId};

/// Errors from mutating the in-memory board.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BoardError {
    #[error("Index {index} is out of range for column '{column}' (length {len})")]
    OutOfRange {
        column: ColumnId,
        index: usize,
        len: usize,
    },

    #[error("Task {id} not found on board")]
    TaskNotFound { id: TaskId },

    #[error("Task {id} is still waiting for its server id")]
    PendingCreate { id: TaskId },

    #[error("Invalid task data: {0}")]
    Validation(String),
}

/// Errors from the board persistence collaborator.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
    },

    #[error("Server returned {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
