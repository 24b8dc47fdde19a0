//! Member roster endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use bandstand_common::models::Member;
use bandstand_common::time;
use bandstand_common::uuid_utils::parse_id;
use serde::{Deserialize, Serialize};

use super::{ApiError, AppJson};
use crate::{members, votes, AppState};

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub display_name: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub member: Member,
    /// Votes opened on songs suggested before the member joined
    pub pending_votes: u64,
}

#[derive(Debug, Deserialize)]
pub struct ActiveRequest {
    pub active: bool,
}

/// POST /api/members
///
/// Called by the identity proxy when someone joins; the new member is
/// enrolled into voting on every existing song.
pub async fn register_member(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let now = time::now();
    let member = members::register_member(&state.db, &request.display_name, now).await?;
    let pending_votes = votes::enroll_member(&state.db, member.id, now).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            member,
            pending_votes,
        }),
    ))
}

/// GET /api/members
pub async fn list_members(State(state): State<AppState>) -> Result<Json<Vec<Member>>, ApiError> {
    Ok(Json(members::list_active_members(&state.db).await?))
}

/// PUT /api/members/:member_id/active
///
/// Reactivating a member also backfills votes on songs added meanwhile.
pub async fn set_active(
    State(state): State<AppState>,
    Path(member_id): Path<String>,
    AppJson(request): AppJson<ActiveRequest>,
) -> Result<Json<Member>, ApiError> {
    let member_id = parse_id("member_id", &member_id)?;
    let member = members::set_active(&state.db, member_id, request.active).await?;
    if member.active {
        votes::enroll_member(&state.db, member.id, time::now()).await?;
    }
    Ok(Json(member))
}
