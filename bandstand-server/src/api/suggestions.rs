//! Suggestion and quota endpoints

use axum::{extract::State, http::StatusCode, Extension, Json};
use bandstand_common::models::{Song, SongDraft};
use bandstand_common::time::{self, QuotaPeriod};
use serde::Serialize;

use super::{ApiError, AppJson, CurrentMember};
use crate::quota::{self, QuotaUsage, SUGGESTIONS_PER_PERIOD};
use crate::{suggestions, AppState};

#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    pub period: QuotaPeriod,
    pub limit: i64,
    pub used: i64,
    pub remaining: i64,
}

/// POST /api/suggestions
pub async fn submit_suggestion(
    State(state): State<AppState>,
    Extension(CurrentMember(member_id)): Extension<CurrentMember>,
    AppJson(draft): AppJson<SongDraft>,
) -> Result<(StatusCode, Json<Song>), ApiError> {
    let song = suggestions::submit_suggestion(&state.db, member_id, &draft, time::now()).await?;
    Ok((StatusCode::CREATED, Json(song)))
}

/// GET /api/quota
pub async fn get_quota(
    State(state): State<AppState>,
    Extension(CurrentMember(member_id)): Extension<CurrentMember>,
) -> Result<Json<QuotaResponse>, ApiError> {
    let now = time::now();
    let remaining = suggestions::get_remaining_quota(&state.db, member_id, now).await?;

    Ok(Json(QuotaResponse {
        period: QuotaPeriod::containing(now),
        limit: SUGGESTIONS_PER_PERIOD,
        used: SUGGESTIONS_PER_PERIOD - remaining,
        remaining,
    }))
}

/// GET /api/quota/history
pub async fn get_quota_history(
    State(state): State<AppState>,
    Extension(CurrentMember(member_id)): Extension<CurrentMember>,
) -> Result<Json<Vec<QuotaUsage>>, ApiError> {
    Ok(Json(quota::usage_history(&state.db, member_id).await?))
}
