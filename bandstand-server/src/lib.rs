//! bandstand-server library
//!
//! Song suggestions, voting, rankings and setlists for a band, served as a
//! JSON API over SQLite.

use std::sync::Arc;

use axum::Router;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod lifecycle;
pub mod members;
pub mod pagination;
pub mod quota;
pub mod ranking;
pub mod render;
pub mod search;
pub mod setlist;
pub mod songs;
pub mod suggestions;
pub mod votes;

use render::{PlainTextRenderer, SetlistRenderer};
use search::MediaSearch;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Absent when no provider is configured
    pub media_search: Option<Arc<dyn MediaSearch>>,
    pub renderer: Arc<dyn SetlistRenderer>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        Self {
            db,
            media_search: None,
            renderer: Arc::new(PlainTextRenderer),
        }
    }

    pub fn with_media_search(mut self, provider: Arc<dyn MediaSearch>) -> Self {
        self.media_search = Some(provider);
        self
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn SetlistRenderer>) -> Self {
        self.renderer = renderer;
        self
    }
}

/// Build application router
///
/// `/health` and the member roster are public; everything else needs the
/// `X-Member-Id` header.
pub fn build_router(state: AppState) -> Router {
    use axum::middleware;
    use axum::routing::{delete, get, post, put};

    let protected = Router::new()
        .route("/api/suggestions", post(api::suggestions::submit_suggestion))
        .route("/api/quota", get(api::suggestions::get_quota))
        .route("/api/quota/history", get(api::suggestions::get_quota_history))
        .route("/api/votes/next", get(api::votes::next_vote))
        .route("/api/votes/:vote_id", post(api::votes::cast_vote))
        .route("/api/songs/:song_id/votes", post(api::votes::open_vote))
        .route("/api/songs/:song_id/tally", get(api::votes::song_tally))
        .route("/api/rankings", get(api::rankings::get_rankings))
        .route(
            "/api/setlists",
            get(api::setlists::list_setlists).post(api::setlists::create_setlist),
        )
        .route(
            "/api/setlists/:setlist_id",
            get(api::setlists::get_setlist)
                .put(api::setlists::update_setlist)
                .delete(api::setlists::delete_setlist),
        )
        .route("/api/setlists/:setlist_id/archive", put(api::setlists::set_archived))
        .route("/api/setlists/:setlist_id/items", post(api::setlists::add_song))
        .route(
            "/api/setlists/:setlist_id/items/:item_id",
            delete(api::setlists::remove_song),
        )
        .route(
            "/api/setlists/:setlist_id/items/:item_id/position",
            put(api::setlists::reorder_song),
        )
        .route(
            "/api/setlists/:setlist_id/candidates",
            get(api::setlists::candidate_songs),
        )
        .route(
            "/api/setlists/:setlist_id/document",
            get(api::setlists::render_document),
        )
        .route("/api/search", get(api::search::search_media))
        .route("/api/members/:member_id/active", put(api::members::set_active))
        .layer(middleware::from_fn(api::require_member));

    let public = Router::new()
        .route(
            "/api/members",
            get(api::members::list_members).post(api::members::register_member),
        )
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
