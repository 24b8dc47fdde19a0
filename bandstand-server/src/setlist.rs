//! Setlist building
//!
//! A setlist is an ordered list of distinct songs for one event. Item
//! positions are dense and 1-based (`1..=N`) after every operation; the
//! table's UNIQUE(setlist_id, position) constraint is kept satisfied by
//! renumbering in two passes. Each item edit bumps the setlist `version`,
//! which callers may pass back to reject edits made against a stale view.

use bandstand_common::db::{SetlistItemRow, SetlistRow, SETLIST_COLUMNS};
use bandstand_common::error::is_unique_violation;
use bandstand_common::models::{DurationStatus, Setlist, SetlistItem, SetlistMeta};
use bandstand_common::uuid_utils::{self, parse_stored};
use bandstand_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::ranking::{compute_rankings, RankedSong};
use crate::songs;

/// Share of the target at which a setlist counts as "near" it
pub const NEAR_TARGET_RATIO: f64 = 0.9;

pub async fn create_setlist(
    db: &SqlitePool,
    meta: &SetlistMeta,
    now: DateTime<Utc>,
) -> Result<Setlist> {
    meta.validate()?;

    let id = uuid_utils::generate();
    sqlx::query(
        r#"
        INSERT INTO setlists (guid, name, event_date, event_time, location,
                              target_duration_minutes, is_archived, version, created_at)
        VALUES (?, ?, ?, ?, ?, ?, 0, 0, ?)
        "#,
    )
    .bind(id.to_string())
    .bind(meta.name.trim())
    .bind(meta.event_date)
    .bind(meta.event_time)
    .bind(meta.location.as_deref().map(str::trim))
    .bind(meta.target_duration_minutes)
    .bind(now)
    .execute(db)
    .await?;

    info!(setlist_id = %id, "Created setlist {}", meta.name.trim());
    get_setlist(db, id).await
}

/// Setlist with its items in position order
pub async fn get_setlist(db: &SqlitePool, setlist_id: Uuid) -> Result<Setlist> {
    let mut conn = db.acquire().await?;
    load_setlist(&mut conn, setlist_id).await
}

/// Every setlist with items, in creation order
pub async fn list_all(db: &SqlitePool) -> Result<Vec<Setlist>> {
    let ids: Vec<String> = sqlx::query_scalar("SELECT guid FROM setlists ORDER BY created_at, rowid")
        .fetch_all(db)
        .await?;

    let mut conn = db.acquire().await?;
    let mut setlists = Vec::with_capacity(ids.len());
    for id in &ids {
        setlists.push(load_setlist(&mut conn, parse_stored(id)?).await?);
    }
    Ok(setlists)
}

pub async fn update_setlist_meta(
    db: &SqlitePool,
    setlist_id: Uuid,
    meta: &SetlistMeta,
) -> Result<Setlist> {
    meta.validate()?;

    let result = sqlx::query(
        r#"
        UPDATE setlists
        SET name = ?, event_date = ?, event_time = ?, location = ?, target_duration_minutes = ?
        WHERE guid = ?
        "#,
    )
    .bind(meta.name.trim())
    .bind(meta.event_date)
    .bind(meta.event_time)
    .bind(meta.location.as_deref().map(str::trim))
    .bind(meta.target_duration_minutes)
    .bind(setlist_id.to_string())
    .execute(db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("setlist {}", setlist_id)));
    }

    info!(setlist_id = %setlist_id, "Updated setlist details");
    get_setlist(db, setlist_id).await
}

/// Set or clear the manual archive flag
pub async fn set_archived(db: &SqlitePool, setlist_id: Uuid, archived: bool) -> Result<Setlist> {
    let result = sqlx::query("UPDATE setlists SET is_archived = ? WHERE guid = ?")
        .bind(archived)
        .bind(setlist_id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("setlist {}", setlist_id)));
    }

    info!(setlist_id = %setlist_id, archived, "Setlist archive flag changed");
    get_setlist(db, setlist_id).await
}

/// Delete a setlist and its items; songs are untouched
pub async fn delete_setlist(db: &SqlitePool, setlist_id: Uuid) -> Result<()> {
    let result = sqlx::query("DELETE FROM setlists WHERE guid = ?")
        .bind(setlist_id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("setlist {}", setlist_id)));
    }

    info!(setlist_id = %setlist_id, "Deleted setlist");
    Ok(())
}

/// Append a song at position N+1
pub async fn add_song(db: &SqlitePool, setlist_id: Uuid, song_id: Uuid) -> Result<SetlistItem> {
    let mut tx = db.begin().await?;
    claim_version(&mut tx, setlist_id).await?;
    songs::fetch_song(&mut tx, song_id).await?;

    let already_present: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM setlist_items WHERE setlist_id = ? AND song_id = ?)",
    )
    .bind(setlist_id.to_string())
    .bind(song_id.to_string())
    .fetch_one(&mut *tx)
    .await?;

    if already_present {
        warn!(setlist_id = %setlist_id, song_id = %song_id, "Song already in setlist");
        return Err(Error::DuplicateSong {
            setlist_id,
            song_id,
        });
    }

    let item_id = uuid_utils::generate();
    let inserted = sqlx::query(
        r#"
        INSERT INTO setlist_items (guid, setlist_id, song_id, position)
        VALUES (?, ?, ?, (SELECT COALESCE(MAX(position), 0) + 1 FROM setlist_items WHERE setlist_id = ?))
        "#,
    )
    .bind(item_id.to_string())
    .bind(setlist_id.to_string())
    .bind(song_id.to_string())
    .bind(setlist_id.to_string())
    .execute(&mut *tx)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            return Err(Error::DuplicateSong {
                setlist_id,
                song_id,
            });
        }
        Err(e) => return Err(e.into()),
    }

    let item = fetch_item(&mut tx, setlist_id, item_id).await?;
    tx.commit().await?;

    info!(
        setlist_id = %setlist_id,
        song_id = %song_id,
        position = item.position,
        "Added song to setlist"
    );
    Ok(item)
}

/// Remove an item and close the gap it leaves
pub async fn remove_song(db: &SqlitePool, setlist_id: Uuid, item_id: Uuid) -> Result<Setlist> {
    let mut tx = db.begin().await?;
    claim_version(&mut tx, setlist_id).await?;

    let result = sqlx::query("DELETE FROM setlist_items WHERE guid = ? AND setlist_id = ?")
        .bind(item_id.to_string())
        .bind(setlist_id.to_string())
        .execute(&mut *tx)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "item {} in setlist {}",
            item_id, setlist_id
        )));
    }

    let order = item_order(&mut tx, setlist_id).await?;
    renumber(&mut tx, setlist_id, &order).await?;
    let setlist = load_setlist(&mut tx, setlist_id).await?;
    tx.commit().await?;

    info!(setlist_id = %setlist_id, item_id = %item_id, "Removed song from setlist");
    Ok(setlist)
}

/// Move an item to `new_index` (0-based, clamped to the list)
///
/// With `expected_version` the move only applies if nobody else edited
/// the setlist since that version was read.
pub async fn reorder_song(
    db: &SqlitePool,
    setlist_id: Uuid,
    item_id: Uuid,
    new_index: i64,
    expected_version: Option<i64>,
) -> Result<Setlist> {
    let mut tx = db.begin().await?;
    let version = claim_version(&mut tx, setlist_id).await?;

    if let Some(expected) = expected_version {
        if expected != version {
            warn!(
                setlist_id = %setlist_id,
                expected,
                actual = version,
                "Rejected reorder against stale setlist"
            );
            return Err(Error::VersionConflict {
                setlist_id,
                expected,
                actual: version,
            });
        }
    }

    let mut order = item_order(&mut tx, setlist_id).await?;
    let from = order
        .iter()
        .position(|id| *id == item_id)
        .ok_or_else(|| Error::NotFound(format!("item {} in setlist {}", item_id, setlist_id)))?;

    let to = splice(&mut order, from, new_index);
    renumber(&mut tx, setlist_id, &order).await?;
    let setlist = load_setlist(&mut tx, setlist_id).await?;
    tx.commit().await?;

    info!(
        setlist_id = %setlist_id,
        item_id = %item_id,
        from = from + 1,
        to = to + 1,
        "Reordered setlist"
    );
    Ok(setlist)
}

/// Total length in minutes; songs without a duration count as zero
pub async fn compute_total_duration(db: &SqlitePool, setlist_id: Uuid) -> Result<f64> {
    let mut conn = db.acquire().await?;
    current_version(&mut conn, setlist_id).await?;

    let total: f64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(SUM(s.duration_minutes), 0.0)
        FROM setlist_items i
        JOIN songs s ON s.guid = i.song_id
        WHERE i.setlist_id = ?
        "#,
    )
    .bind(setlist_id.to_string())
    .fetch_one(&mut *conn)
    .await?;

    Ok(total)
}

/// Compare a total length against an optional target
pub fn duration_status(total_minutes: f64, target_minutes: Option<f64>) -> DurationStatus {
    match target_minutes {
        None => DurationStatus::NoTarget,
        Some(target) if total_minutes > target => DurationStatus::OverTarget,
        Some(target) if total_minutes >= target * NEAR_TARGET_RATIO => DurationStatus::NearTarget,
        Some(_) => DurationStatus::UnderTarget,
    }
}

/// Ranked songs not yet in the setlist, for the "add song" picker
pub async fn candidate_songs(db: &SqlitePool, setlist_id: Uuid) -> Result<Vec<RankedSong>> {
    let setlist = get_setlist(db, setlist_id).await?;
    let ranked = compute_rankings(songs::list_songs(db).await?);

    Ok(ranked
        .into_iter()
        .filter(|r| !setlist.items.iter().any(|item| item.song_id == r.song.id))
        .collect())
}

/// Move `order[from]` to `new_index` clamped to `[0, len - 1]`
///
/// Returns the index the element ended up at. `from` must be in bounds.
pub fn splice<T>(order: &mut Vec<T>, from: usize, new_index: i64) -> usize {
    let last = order.len().saturating_sub(1);
    let to = usize::try_from(new_index.max(0)).unwrap_or(usize::MAX).min(last);
    let item = order.remove(from);
    order.insert(to, item);
    to
}

async fn load_setlist(conn: &mut SqliteConnection, setlist_id: Uuid) -> Result<Setlist> {
    let row: Option<SetlistRow> = sqlx::query_as(&format!(
        "SELECT {} FROM setlists WHERE guid = ?",
        SETLIST_COLUMNS
    ))
    .bind(setlist_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    let row = row.ok_or_else(|| Error::NotFound(format!("setlist {}", setlist_id)))?;

    let items: Vec<SetlistItemRow> = sqlx::query_as(
        r#"
        SELECT i.guid, i.setlist_id, i.song_id, i.position, s.title, s.artist, s.duration_minutes
        FROM setlist_items i
        JOIN songs s ON s.guid = i.song_id
        WHERE i.setlist_id = ?
        ORDER BY i.position
        "#,
    )
    .bind(setlist_id.to_string())
    .fetch_all(&mut *conn)
    .await?;

    let items = items
        .into_iter()
        .map(SetlistItem::try_from)
        .collect::<Result<Vec<_>>>()?;

    row.into_setlist(items)
}

async fn fetch_item(
    conn: &mut SqliteConnection,
    setlist_id: Uuid,
    item_id: Uuid,
) -> Result<SetlistItem> {
    let row: Option<SetlistItemRow> = sqlx::query_as(
        r#"
        SELECT i.guid, i.setlist_id, i.song_id, i.position, s.title, s.artist, s.duration_minutes
        FROM setlist_items i
        JOIN songs s ON s.guid = i.song_id
        WHERE i.guid = ? AND i.setlist_id = ?
        "#,
    )
    .bind(item_id.to_string())
    .bind(setlist_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or_else(|| Error::NotFound(format!("item {}", item_id)))?
        .try_into()
}

/// Version of an existing setlist; `NotFound` otherwise
async fn current_version(conn: &mut SqliteConnection, setlist_id: Uuid) -> Result<i64> {
    let version: Option<i64> = sqlx::query_scalar("SELECT version FROM setlists WHERE guid = ?")
        .bind(setlist_id.to_string())
        .fetch_optional(&mut *conn)
        .await?;

    version.ok_or_else(|| Error::NotFound(format!("setlist {}", setlist_id)))
}

/// Bump the version of an existing setlist and return the one it replaced
///
/// Item edits call this first so the transaction takes the write lock
/// before reading anything; a failed edit rolls the bump back.
async fn claim_version(conn: &mut SqliteConnection, setlist_id: Uuid) -> Result<i64> {
    let version: Option<i64> = sqlx::query_scalar(
        "UPDATE setlists SET version = version + 1 WHERE guid = ? RETURNING version",
    )
    .bind(setlist_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    version
        .map(|bumped| bumped - 1)
        .ok_or_else(|| Error::NotFound(format!("setlist {}", setlist_id)))
}

async fn item_order(conn: &mut SqliteConnection, setlist_id: Uuid) -> Result<Vec<Uuid>> {
    let ids: Vec<String> =
        sqlx::query_scalar("SELECT guid FROM setlist_items WHERE setlist_id = ? ORDER BY position")
            .bind(setlist_id.to_string())
            .fetch_all(&mut *conn)
            .await?;

    ids.iter().map(|id| parse_stored(id)).collect()
}

/// Write positions 1..=N in the given order
async fn renumber(conn: &mut SqliteConnection, setlist_id: Uuid, order: &[Uuid]) -> Result<()> {
    // Move everything out of the 1..=N range first so no UPDATE collides
    sqlx::query("UPDATE setlist_items SET position = -position WHERE setlist_id = ?")
        .bind(setlist_id.to_string())
        .execute(&mut *conn)
        .await?;

    for (index, item_id) in order.iter().enumerate() {
        sqlx::query("UPDATE setlist_items SET position = ? WHERE guid = ?")
            .bind(index as i64 + 1)
            .bind(item_id.to_string())
            .execute(&mut *conn)
            .await?;
    }

    debug!(setlist_id = %setlist_id, items = order.len(), "Renumbered setlist");
    Ok(())
}
