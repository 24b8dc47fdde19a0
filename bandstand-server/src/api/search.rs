//! Media search endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use bandstand_common::Error;
use serde::Deserialize;

use super::ApiError;
use crate::search::MediaHit;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /api/search?q=...
pub async fn search_media(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<MediaHit>>, ApiError> {
    let provider = state
        .media_search
        .as_ref()
        .ok_or_else(|| Error::ServiceUnavailable("media search is not configured".to_string()))?;

    Ok(Json(provider.search(&query.q).await?))
}
