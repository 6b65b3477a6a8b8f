//! Error taxonomy for match operations.
//!
//! Every operation on [`crate::Match`] returns `Result<_, MatchError>`. Errors are
//! never fatal: the match is left exactly as it was before the call.

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum MatchError {
    /// Malformed or out-of-range request field.
    #[error("{0}")]
    InvalidInput(String),

    /// Uniqueness violation on join (code or identity already in use).
    #[error("{0}")]
    Conflict(String),

    /// Referenced player does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Operation is not legal in the current state (capture without holding, self-attack).
    #[error("{0}")]
    InvalidTransition(String),

    /// Internal reference is inconsistent (e.g. a player's team has no record).
    #[error("{0}")]
    BadState(String),
}

impl MatchError {
    pub fn status(&self) -> StatusCode {
        match self {
            MatchError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MatchError::Conflict(_) => StatusCode::CONFLICT,
            MatchError::NotFound(_) => StatusCode::NOT_FOUND,
            MatchError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            MatchError::BadState(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Short machine-readable kind, used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            MatchError::InvalidInput(_) => "invalid_input",
            MatchError::Conflict(_) => "conflict",
            MatchError::NotFound(_) => "not_found",
            MatchError::InvalidTransition(_) => "invalid_transition",
            MatchError::BadState(_) => "bad_state",
        }
    }

    pub(crate) fn player_not_found(id: &crate::PlayerId) -> Self {
        MatchError::NotFound(format!("Player {} not found", id))
    }
}
