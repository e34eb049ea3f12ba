use axum::Json;
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use serde::Deserialize;

use confess_types::api::{ListResponse, TopResponse, TopWindow};

use crate::error::ApiError;
use crate::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// When present, each confession is annotated with this user's
    /// own vote; the admin identity additionally sees hidden rows.
    pub requester_id: Option<i64>,
}

/// GET /confessions — newest first.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let privileged = state.policy.is_privileged(query.requester_id);

    let db = state.clone();
    let confessions = blocking(move || db.db.list(query.requester_id, privileged)).await?;

    Ok(Json(ListResponse { confessions }))
}

const MAX_TOP_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct TopQuery {
    #[serde(default = "default_window")]
    pub window: TopWindow,
    pub limit: Option<u32>,
}

fn default_window() -> TopWindow {
    TopWindow::Daily
}

/// GET /top — the publishing job's read contract: highest-liked
/// non-hidden confessions in a rolling daily or weekly window. An
/// empty window is an empty list, not an error; the caller decides.
pub async fn top(
    State(state): State<AppState>,
    Query(query): Query<TopQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let window = query.window;
    let limit = query
        .limit
        .unwrap_or_else(|| window.default_limit())
        .min(MAX_TOP_LIMIT);

    let db = state.clone();
    let confessions = blocking(move || db.db.top_submissions(window, limit)).await?;

    Ok(Json(TopResponse {
        window,
        confessions,
    }))
}
