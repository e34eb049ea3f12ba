use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::error;

use confess_db::StoreError;

/// Wraps the store taxonomy so every handler maps errors to HTTP in
/// one place: 400 bad input, 403 forbidden, 404 missing, 409 conflict,
/// 500 for an unreachable store.
pub struct ApiError(pub StoreError);

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            StoreError::Unauthorized => StatusCode::FORBIDDEN,
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::AlreadySubmittedToday | StoreError::DuplicateVote(_) => {
                StatusCode::CONFLICT
            }
            StoreError::Unavailable(msg) => {
                error!("store unavailable: {}", msg);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confess_types::models::VoteKind;

    fn status_of(e: StoreError) -> StatusCode {
        ApiError(e).into_response().status()
    }

    #[test]
    fn taxonomy_maps_to_expected_statuses() {
        assert_eq!(
            status_of(StoreError::InvalidInput("bad".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(StoreError::Unauthorized), StatusCode::FORBIDDEN);
        assert_eq!(status_of(StoreError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(StoreError::AlreadySubmittedToday),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::DuplicateVote(VoteKind::Like)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::Unavailable("down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
