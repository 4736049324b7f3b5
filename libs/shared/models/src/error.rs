use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

const GENERIC_CONSTRAINT_MESSAGE: &str =
    "The request conflicts with existing data or violates a data constraint";
const GENERIC_INTERNAL_MESSAGE: &str = "An unexpected error occurred. Please try again later.";

/// Human-readable messages for storage-layer constraint violations, keyed by
/// constraint name.
const CONSTRAINT_MESSAGES: &[(&str, &str)] = &[
    ("games_bgg_id_key", "A game with this BoardGameGeek ID already exists"),
    ("games_title_key", "A game with this title already exists"),
    ("valid_year", "Year published must be between 1900 and the current year"),
    ("valid_players", "Minimum players cannot exceed maximum players"),
    ("valid_playtime", "Minimum playtime cannot exceed maximum playtime"),
    ("valid_min_age", "Minimum age must be between 0 and 21"),
    ("valid_rating", "Rating must be between 0 and 10"),
    ("valid_weight", "Complexity weight must be between 1 and 5"),
    ("buy_list_games_game_id_key", "This game is already on the buy list"),
    ("buy_list_games_game_id_fkey", "The referenced game does not exist"),
    ("price_snapshots_game_id_fkey", "The referenced game does not exist"),
];

/// Looks up the curated message for a named constraint.
pub fn constraint_message(constraint: &str) -> Option<&'static str> {
    CONSTRAINT_MESSAGES
        .iter()
        .find(|(name, _)| *name == constraint)
        .map(|(_, message)| *message)
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Integrity constraint violated: {constraint}")]
    IntegrityConstraint { constraint: String },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn integrity(constraint: impl Into<String>) -> Self {
        AppError::IntegrityConstraint {
            constraint: constraint.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::IntegrityConstraint { .. } => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The message shown to the caller. Never contains internal detail for
    /// constraint and unexpected failures.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg) | AppError::Validation(msg) | AppError::Unauthorized(msg) => {
                msg.clone()
            }
            AppError::IntegrityConstraint { constraint } => constraint_message(constraint)
                .unwrap_or(GENERIC_CONSTRAINT_MESSAGE)
                .to_string(),
            AppError::Unexpected(_) => GENERIC_INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Unexpected(format!("{:#}", err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        match &self {
            AppError::Unexpected(detail) => {
                tracing::error!(error = ?self, "Unhandled error: {}", detail);
            }
            AppError::IntegrityConstraint { constraint } => {
                tracing::warn!("Constraint violation on {}", constraint);
            }
            _ => {
                tracing::debug!("Request failed: {}: {}", status, self);
            }
        }

        let body = Json(json!({
            "error": self.public_message()
        }));

        (status, body).into_response()
    }
}
