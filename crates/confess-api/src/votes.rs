use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use tracing::info;

use confess_types::api::{VoteAction, VoteRequest, VoteResponse};

use crate::error::ApiError;
use crate::{AppState, blocking};

/// POST /confessions/{id}/votes — cast, switch, or (for the admin)
/// stack a vote. Same-kind repeats come back as 409.
pub async fn cast(
    State(state): State<AppState>,
    Path(confession_id): Path<i64>,
    Json(req): Json<VoteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let privileged = state.policy.is_privileged(Some(req.voter_id));

    let db = state.clone();
    let outcome =
        blocking(move || db.db.cast_vote(confession_id, req.voter_id, req.vote, privileged))
            .await?;

    info!(
        confession = confession_id,
        voter = req.voter_id,
        vote = outcome.new_vote.as_str(),
        created = outcome.created,
        "vote recorded"
    );

    Ok(Json(VoteResponse {
        action: if outcome.created {
            VoteAction::Created
        } else {
            VoteAction::Updated
        },
        previous_vote: outcome.previous,
        new_vote: outcome.new_vote,
        is_admin: outcome.is_admin,
        likes: outcome.likes,
        dislikes: outcome.dislikes,
    }))
}
