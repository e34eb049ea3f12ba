use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::info;

use confess_types::api::{CanSubmitResponse, SubmitRequest, SubmitResponse};

use crate::error::ApiError;
use crate::{AppState, blocking};

/// POST /confessions — run the daily submission gate and insert.
pub async fn submit(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let privileged = state.policy.is_privileged(req.author_id);
    let require_author = state.policy.require_author;

    let db = state.clone();
    let confession = blocking(move || {
        db.db
            .submit(&req.text, req.author_id, require_author, privileged)
    })
    .await?;

    info!(
        id = confession.id,
        author = ?confession.author_id,
        "confession submitted"
    );
    Ok((StatusCode::CREATED, Json(SubmitResponse { confession })))
}

#[derive(Debug, Deserialize)]
pub struct EligibilityQuery {
    pub user_id: i64,
}

/// GET /confessions/eligibility — lets clients grey out the submit
/// button before attempting a post that would 409.
pub async fn eligibility(
    State(state): State<AppState>,
    Query(query): Query<EligibilityQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let privileged = state.policy.is_privileged(Some(query.user_id));

    let db = state.clone();
    let can_submit = blocking(move || db.db.can_submit_today(query.user_id, privileged)).await?;

    Ok(Json(CanSubmitResponse { can_submit }))
}
