//! Song catalog storage

use bandstand_common::db::{SongRow, SONG_COLUMNS};
use bandstand_common::models::{Song, SongDraft};
use bandstand_common::uuid_utils;
use bandstand_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

/// Insert a validated draft; vote counters start at zero
pub async fn insert_song(
    conn: &mut SqliteConnection,
    suggested_by: Uuid,
    draft: &SongDraft,
    now: DateTime<Utc>,
) -> Result<Song> {
    let song = Song {
        id: uuid_utils::generate(),
        title: draft.title.trim().to_string(),
        artist: draft.artist.trim().to_string(),
        genre: trimmed(&draft.genre),
        duration_minutes: draft.duration_minutes,
        media_ref: trimmed(&draft.media_ref),
        view_count: draft.view_count,
        suggested_by,
        yes_votes: 0,
        no_votes: 0,
        created_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO songs (guid, title, artist, genre, duration_minutes, media_ref,
                           view_count, suggested_by, yes_votes, no_votes, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, 0, ?)
        "#,
    )
    .bind(song.id.to_string())
    .bind(&song.title)
    .bind(&song.artist)
    .bind(&song.genre)
    .bind(song.duration_minutes)
    .bind(&song.media_ref)
    .bind(song.view_count)
    .bind(song.suggested_by.to_string())
    .bind(song.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(song)
}

pub async fn get_song(db: &SqlitePool, song_id: Uuid) -> Result<Song> {
    let mut conn = db.acquire().await?;
    fetch_song(&mut conn, song_id).await
}

pub async fn fetch_song(conn: &mut SqliteConnection, song_id: Uuid) -> Result<Song> {
    let row: Option<SongRow> =
        sqlx::query_as(&format!("SELECT {} FROM songs WHERE guid = ?", SONG_COLUMNS))
            .bind(song_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

    row.ok_or_else(|| Error::NotFound(format!("song {}", song_id)))?
        .try_into()
}

/// Every song, in suggestion order
pub async fn list_songs(db: &SqlitePool) -> Result<Vec<Song>> {
    let rows: Vec<SongRow> = sqlx::query_as(&format!(
        "SELECT {} FROM songs ORDER BY created_at, rowid",
        SONG_COLUMNS
    ))
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Song::try_from).collect()
}

/// Empty optional text is stored as NULL
fn trimmed(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
