use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use crate::api::error::ApiError;
use crate::api::state::AppState;
use crate::engine::scheduler;
use crate::engine::session::SessionRunResult;

#[derive(Serialize)]
pub struct SessionRunResponse {
    pub session_run_id: String,
    pub date_key: String,
    pub session_index: i32,
    pub new_pairs: u32,
    pub already_processed: bool,
}

impl From<SessionRunResult> for SessionRunResponse {
    fn from(r: SessionRunResult) -> Self {
        SessionRunResponse {
            session_run_id: r.session_run_id,
            date_key: r.date_key,
            session_index: r.session_index,
            new_pairs: r.new_pairs,
            already_processed: r.already_processed,
        }
    }
}

/// `POST /api/session/trigger/{index}` (CLI: `trigger-session <index>`,
/// §6 `triggerSessionNow`).
pub async fn trigger(
    State(state): State<AppState>,
    Path(session_index): Path<i32>,
) -> Result<Json<SessionRunResponse>, ApiError> {
    let inner = state.inner.read().await;
    let now_utc = chrono::Utc::now();

    let result = scheduler::trigger_session_now(&inner.db, &inner.bus, &inner.config, session_index, now_utc)
        .await?;

    Ok(Json(result.into()))
}
