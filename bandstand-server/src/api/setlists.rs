//! Setlist endpoints
//!
//! Every read returns a [`SetlistSummary`], so clients always see the
//! derived phase and duration status next to the stored fields.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use bandstand_common::models::{Setlist, SetlistItem, SetlistMeta};
use bandstand_common::time;
use bandstand_common::uuid_utils::parse_id;
use serde::Deserialize;

use super::{ApiError, AppJson};
use crate::lifecycle::{self, PhaseFilter, SetlistSummary};
use crate::ranking::RankedSong;
use crate::{setlist, AppState};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// `upcoming`, `recent`, `archived` or `all` (default)
    #[serde(default)]
    pub phase: String,
}

#[derive(Debug, Deserialize)]
pub struct AddSongRequest {
    pub song_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ReorderRequest {
    /// 0-based target index; out-of-range values are clamped
    pub new_index: i64,
    /// Version the client last saw; omit for last-write-wins
    #[serde(default)]
    pub expected_version: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ArchiveRequest {
    pub archived: bool,
}

fn summary(setlist: Setlist) -> Json<SetlistSummary> {
    Json(SetlistSummary::new(setlist, time::now()))
}

/// GET /api/setlists?phase=...
pub async fn list_setlists(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SetlistSummary>>, ApiError> {
    let filter: PhaseFilter = query.phase.parse()?;
    Ok(Json(lifecycle::list_setlists(&state.db, filter, time::now()).await?))
}

/// POST /api/setlists
pub async fn create_setlist(
    State(state): State<AppState>,
    AppJson(meta): AppJson<SetlistMeta>,
) -> Result<(StatusCode, Json<SetlistSummary>), ApiError> {
    let created = setlist::create_setlist(&state.db, &meta, time::now()).await?;
    Ok((StatusCode::CREATED, summary(created)))
}

/// GET /api/setlists/:setlist_id
pub async fn get_setlist(
    State(state): State<AppState>,
    Path(setlist_id): Path<String>,
) -> Result<Json<SetlistSummary>, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    Ok(summary(setlist::get_setlist(&state.db, setlist_id).await?))
}

/// PUT /api/setlists/:setlist_id
pub async fn update_setlist(
    State(state): State<AppState>,
    Path(setlist_id): Path<String>,
    AppJson(meta): AppJson<SetlistMeta>,
) -> Result<Json<SetlistSummary>, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    Ok(summary(
        setlist::update_setlist_meta(&state.db, setlist_id, &meta).await?,
    ))
}

/// DELETE /api/setlists/:setlist_id
pub async fn delete_setlist(
    State(state): State<AppState>,
    Path(setlist_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    setlist::delete_setlist(&state.db, setlist_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/setlists/:setlist_id/archive
pub async fn set_archived(
    State(state): State<AppState>,
    Path(setlist_id): Path<String>,
    AppJson(request): AppJson<ArchiveRequest>,
) -> Result<Json<SetlistSummary>, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    Ok(summary(
        setlist::set_archived(&state.db, setlist_id, request.archived).await?,
    ))
}

/// POST /api/setlists/:setlist_id/items
pub async fn add_song(
    State(state): State<AppState>,
    Path(setlist_id): Path<String>,
    AppJson(request): AppJson<AddSongRequest>,
) -> Result<(StatusCode, Json<SetlistItem>), ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    let song_id = parse_id("song_id", &request.song_id)?;
    let item = setlist::add_song(&state.db, setlist_id, song_id).await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /api/setlists/:setlist_id/items/:item_id
pub async fn remove_song(
    State(state): State<AppState>,
    Path((setlist_id, item_id)): Path<(String, String)>,
) -> Result<Json<SetlistSummary>, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    let item_id = parse_id("item_id", &item_id)?;
    Ok(summary(
        setlist::remove_song(&state.db, setlist_id, item_id).await?,
    ))
}

/// PUT /api/setlists/:setlist_id/items/:item_id/position
pub async fn reorder_song(
    State(state): State<AppState>,
    Path((setlist_id, item_id)): Path<(String, String)>,
    AppJson(request): AppJson<ReorderRequest>,
) -> Result<Json<SetlistSummary>, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    let item_id = parse_id("item_id", &item_id)?;
    let updated = setlist::reorder_song(
        &state.db,
        setlist_id,
        item_id,
        request.new_index,
        request.expected_version,
    )
    .await?;
    Ok(summary(updated))
}

/// GET /api/setlists/:setlist_id/candidates
pub async fn candidate_songs(
    State(state): State<AppState>,
    Path(setlist_id): Path<String>,
) -> Result<Json<Vec<RankedSong>>, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    Ok(Json(setlist::candidate_songs(&state.db, setlist_id).await?))
}

/// GET /api/setlists/:setlist_id/document
pub async fn render_document(
    State(state): State<AppState>,
    Path(setlist_id): Path<String>,
) -> Result<Response, ApiError> {
    let setlist_id = parse_id("setlist_id", &setlist_id)?;
    let setlist = setlist::get_setlist(&state.db, setlist_id).await?;
    let body = state.renderer.render(&setlist)?;

    let disposition = format!(
        "attachment; filename=\"setlist-{}.{}\"",
        setlist.event_date,
        state.renderer.extension()
    );

    Ok((
        [
            (header::CONTENT_TYPE, state.renderer.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    )
        .into_response())
}
