//! Voting endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use bandstand_common::models::{Song, VoteRecord, VoteTally, VoteType};
use bandstand_common::time;
use bandstand_common::uuid_utils::parse_id;
use bandstand_common::Error;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ApiError, AppJson, CurrentMember};
use crate::{songs, votes, AppState};

/// The member's next vote, if any, with the song it is about
#[derive(Debug, Serialize)]
pub struct NextVoteResponse {
    /// Pending votes including this one
    pub pending: i64,
    pub vote: Option<VoteRecord>,
    pub song: Option<Song>,
}

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    /// `up`, `down` or `skip` (`yes`/`no` are accepted too)
    pub vote_type: String,
}

/// GET /api/votes/next
pub async fn next_vote(
    State(state): State<AppState>,
    Extension(CurrentMember(member_id)): Extension<CurrentMember>,
) -> Result<Json<NextVoteResponse>, ApiError> {
    let pending = votes::pending_count(&state.db, member_id).await?;
    let vote = votes::next_pending(&state.db, member_id).await?;
    let song = match &vote {
        Some(vote) => Some(songs::get_song(&state.db, vote.song_id).await?),
        None => None,
    };

    Ok(Json(NextVoteResponse {
        pending,
        vote,
        song,
    }))
}

/// POST /api/votes/:vote_id
///
/// Members may only cast their own votes; someone else's vote id answers
/// 404 like an unknown one.
pub async fn cast_vote(
    State(state): State<AppState>,
    Extension(CurrentMember(member_id)): Extension<CurrentMember>,
    Path(vote_id): Path<String>,
    AppJson(request): AppJson<CastVoteRequest>,
) -> Result<Json<VoteRecord>, ApiError> {
    let vote_id = parse_id("vote_id", &vote_id)?;
    let vote_type: VoteType = request.vote_type.parse()?;

    let existing = votes::get_vote(&state.db, vote_id).await?;
    if existing.member_id != member_id {
        warn!(vote_id = %vote_id, member_id = %member_id, "Attempt to cast another member's vote");
        return Err(Error::NotFound(format!("vote {}", vote_id)).into());
    }

    let record = votes::cast_vote(&state.db, vote_id, vote_type, time::now()).await?;
    Ok(Json(record))
}

/// POST /api/songs/:song_id/votes
///
/// Opens a pending vote for the current member on a song they were not
/// fanned out. 409 when they already have one.
pub async fn open_vote(
    State(state): State<AppState>,
    Extension(CurrentMember(member_id)): Extension<CurrentMember>,
    Path(song_id): Path<String>,
) -> Result<(StatusCode, Json<VoteRecord>), ApiError> {
    let song_id = parse_id("song_id", &song_id)?;
    let record = votes::open_vote(&state.db, member_id, song_id, time::now()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

/// GET /api/songs/:song_id/tally
pub async fn song_tally(
    State(state): State<AppState>,
    Path(song_id): Path<String>,
) -> Result<Json<VoteTally>, ApiError> {
    let song_id = parse_id("song_id", &song_id)?;
    songs::get_song(&state.db, song_id).await?;
    Ok(Json(votes::tally(&state.db, song_id).await?))
}
