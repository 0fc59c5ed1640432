//! Error types for the province API.
//!
//! [`ApiError`] unifies all failure modes into a single enum that can be
//! converted into an Axum HTTP response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. The
//! engine's errors map onto it by kind: unknown provinces become 404,
//! exhausted retries 409, malformed input 422, and an unreachable store
//! 503.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use realm_core::{AccrualError, ActionError, ResetError, StoreError};
use realm_economy::FormulaError;

/// Errors that can occur in the API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request lost a concurrency race too many times, or would
    /// create a duplicate.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The request was well-formed JSON but not a valid command.
    #[error("unprocessable: {0}")]
    Unprocessable(String),

    /// A UUID could not be parsed from the request path.
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),

    /// The backing store could not be reached.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            Self::InvalidUuid(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %message, "Request failed");
        }

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::NotFound(_) => Self::NotFound(message),
            StoreError::Conflict { .. } | StoreError::AlreadyExists(_) => Self::Conflict(message),
            StoreError::Unavailable(_) => Self::Unavailable(message),
            StoreError::Serialization(_) => Self::Internal(message),
        }
    }
}

impl From<FormulaError> for ApiError {
    fn from(err: FormulaError) -> Self {
        let message = err.to_string();
        match err {
            FormulaError::Overflow { .. } => Self::Internal(message),
            FormulaError::InvalidQuantity { .. }
            | FormulaError::InvalidPercent { .. }
            | FormulaError::UnknownBuilding(_)
            | FormulaError::UnknownUnit(_)
            | FormulaError::UnknownSpell(_) => Self::Unprocessable(message),
        }
    }
}

impl From<ActionError> for ApiError {
    fn from(err: ActionError) -> Self {
        match err {
            ActionError::Store(e) => e.into(),
            ActionError::Formula(e) => e.into(),
            ActionError::Conflict { .. } => Self::Conflict(err.to_string()),
            ActionError::Delta(_) | ActionError::Invariant(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<AccrualError> for ApiError {
    fn from(err: AccrualError) -> Self {
        match err {
            AccrualError::Store(e) => e.into(),
            AccrualError::Formula(e) => e.into(),
            AccrualError::Invariant(_)
            | AccrualError::InvalidInterval
            | AccrualError::TimeOverflow(_) => Self::Internal(err.to_string()),
        }
    }
}

impl From<ResetError> for ApiError {
    fn from(err: ResetError) -> Self {
        match err {
            ResetError::Store(e) => e.into(),
            ResetError::Conflict { .. } => Self::Conflict(err.to_string()),
            ResetError::Formula(_) | ResetError::Invariant(_) | ResetError::TimeOverflow => {
                Self::Internal(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use realm_types::ProvinceId;

    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn store_errors_map_to_statuses() {
        let id = ProvinceId::new();
        assert_eq!(status_of(StoreError::NotFound(id).into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(StoreError::Unavailable(String::from("down")).into()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_of(StoreError::AlreadyExists(id).into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn exhausted_retries_are_conflicts() {
        let err = ActionError::Conflict {
            province_id: ProvinceId::new(),
            attempts: 3,
        };
        assert_eq!(status_of(err.into()), StatusCode::CONFLICT);
    }

    #[test]
    fn bad_input_is_unprocessable() {
        let err = ActionError::Formula(FormulaError::InvalidQuantity { quantity: 0 });
        assert_eq!(status_of(err.into()), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
