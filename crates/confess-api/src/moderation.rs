use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tracing::info;

use confess_types::api::{ModerateAction, ModerateRequest, ModerateResponse};

use crate::error::ApiError;
use crate::{AppState, blocking};

/// POST /confessions/{id}/moderation — hide or unhide. Admin only;
/// anyone else gets a 403 without touching the row.
pub async fn moderate(
    State(state): State<AppState>,
    Path(confession_id): Path<i64>,
    Json(req): Json<ModerateRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let privileged = state.policy.is_privileged(Some(req.acting_user_id));

    let db = state.clone();
    let outcome = blocking(move || {
        db.db
            .moderate(confession_id, req.acting_user_id, req.hide, privileged)
    })
    .await?;

    info!(
        confession = confession_id,
        actor = req.acting_user_id,
        hidden = outcome.hidden,
        "confession moderated"
    );

    Ok(Json(ModerateResponse {
        action: if outcome.hidden {
            ModerateAction::Hidden
        } else {
            ModerateAction::Unhidden
        },
    }))
}
