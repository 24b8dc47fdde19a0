//! Song ranking
//!
//! Ranking is a pure function of the song list: order by up-votes
//! descending, break ties by title (case-insensitive), and hand out
//! standard competition ranks ("1, 2, 2, 4"). Nothing here is stored; the
//! ranking is recomputed whenever it is read.

use std::cmp::Ordering;
use std::str::FromStr;

use bandstand_common::models::Song;
use bandstand_common::{Error, Result};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::songs;

/// A song with its computed rank (1-based)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedSong {
    pub rank: usize,
    #[serde(flatten)]
    pub song: Song,
}

/// Display orderings for an already ranked list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankingOrder {
    #[default]
    Rank,
    TotalVotes,
    ViewCount,
}

impl FromStr for RankingOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "rank" => Ok(RankingOrder::Rank),
            "total" | "total_votes" => Ok(RankingOrder::TotalVotes),
            "views" | "view_count" => Ok(RankingOrder::ViewCount),
            other => Err(Error::Validation(format!("unknown sort order: {}", other))),
        }
    }
}

/// Rank songs by up-votes
///
/// Songs with equal up-votes share a rank and the next distinct count
/// skips ahead by the size of the tie. Equal up-votes are listed by
/// title, case-insensitively, then by id so the output is deterministic.
pub fn compute_rankings(mut songs: Vec<Song>) -> Vec<RankedSong> {
    songs.sort_by(|a, b| {
        b.yes_votes
            .cmp(&a.yes_votes)
            .then_with(|| compare_titles(a, b))
    });

    let mut ranked = Vec::with_capacity(songs.len());
    let mut rank = 0;
    let mut previous_votes = None;

    for (index, song) in songs.into_iter().enumerate() {
        if previous_votes != Some(song.yes_votes) {
            rank = index + 1;
            previous_votes = Some(song.yes_votes);
        }
        ranked.push(RankedSong { rank, song });
    }

    ranked
}

/// Re-order by counted votes (up + down), keeping computed ranks
pub fn sort_by_total_votes(ranked: &mut [RankedSong]) {
    // Stable: ties keep their rank order
    ranked.sort_by(|a, b| b.song.total_votes().cmp(&a.song.total_votes()));
}

/// Re-order by provider view count; songs without one go last
pub fn sort_by_view_count(ranked: &mut [RankedSong]) {
    ranked.sort_by(|a, b| match (a.song.view_count, b.song.view_count) {
        (Some(x), Some(y)) => y.cmp(&x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

pub fn apply_order(ranked: &mut [RankedSong], order: RankingOrder) {
    match order {
        RankingOrder::Rank => {}
        RankingOrder::TotalVotes => sort_by_total_votes(ranked),
        RankingOrder::ViewCount => sort_by_view_count(ranked),
    }
}

/// Current ranking of every song, in the requested display order
pub async fn get_rankings(db: &SqlitePool, order: RankingOrder) -> Result<Vec<RankedSong>> {
    let mut ranked = compute_rankings(songs::list_songs(db).await?);
    apply_order(&mut ranked, order);
    Ok(ranked)
}

fn compare_titles(a: &Song, b: &Song) -> Ordering {
    a.title
        .to_lowercase()
        .cmp(&b.title.to_lowercase())
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id))
}
