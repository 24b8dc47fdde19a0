//! Ranking endpoint

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::pagination::Pagination;
use crate::ranking::{self, RankedSong, RankingOrder};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RankingsQuery {
    /// `rank` (default), `total` or `views`
    #[serde(default)]
    pub sort: String,

    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize {
    1
}

#[derive(Debug, Serialize)]
pub struct RankingsResponse {
    #[serde(flatten)]
    pub pagination: Pagination,
    pub songs: Vec<RankedSong>,
}

/// GET /api/rankings?sort=rank|total|views&page=N
pub async fn get_rankings(
    State(state): State<AppState>,
    Query(query): Query<RankingsQuery>,
) -> Result<Json<RankingsResponse>, ApiError> {
    let order: RankingOrder = query.sort.parse()?;
    let ranked = ranking::get_rankings(&state.db, order).await?;

    let pagination = Pagination::new(ranked.len(), query.page);
    Ok(Json(RankingsResponse {
        songs: pagination.window(ranked),
        pagination,
    }))
}
