//! Vote records and the pending-vote queue
//!
//! Every new song fans out one pending vote record to each other active
//! member. Members work through their pending records oldest first. Casting
//! a vote completes the record and bumps the song's counter in the same
//! transaction, so `songs.yes_votes`/`no_votes` always equal the number of
//! completed up/down records. Skips complete the record without touching
//! either counter.

use bandstand_common::db::{VoteRecordRow, VOTE_COLUMNS};
use bandstand_common::error::is_unique_violation;
use bandstand_common::models::{VoteRecord, VoteTally, VoteType};
use bandstand_common::uuid_utils::{self, parse_stored};
use bandstand_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{members, songs};

/// Create a pending record for each eligible member
///
/// Members that already have a record for the song are left alone, so
/// replaying a fan-out is harmless. Returns how many records were created.
pub async fn fan_out_pending_votes(
    conn: &mut SqliteConnection,
    song_id: Uuid,
    eligible: &[Uuid],
    now: DateTime<Utc>,
) -> Result<u64> {
    let mut created = 0;

    for member_id in eligible {
        let result = sqlx::query(
            r#"
            INSERT INTO vote_records (guid, member_id, song_id, status, created_at)
            VALUES (?, ?, ?, 'pending', ?)
            ON CONFLICT (member_id, song_id) DO NOTHING
            "#,
        )
        .bind(uuid_utils::generate().to_string())
        .bind(member_id.to_string())
        .bind(song_id.to_string())
        .bind(now)
        .execute(&mut *conn)
        .await?;

        created += result.rows_affected();
    }

    debug!(song_id = %song_id, created, "Fanned out pending votes");
    Ok(created)
}

/// Oldest pending record for the member, if any
pub async fn next_pending(db: &SqlitePool, member_id: Uuid) -> Result<Option<VoteRecord>> {
    let row: Option<VoteRecordRow> = sqlx::query_as(&format!(
        "SELECT {} FROM vote_records
         WHERE member_id = ? AND status = 'pending'
         ORDER BY created_at, rowid
         LIMIT 1",
        VOTE_COLUMNS
    ))
    .bind(member_id.to_string())
    .fetch_optional(db)
    .await?;

    row.map(VoteRecord::try_from).transpose()
}

pub async fn pending_count(db: &SqlitePool, member_id: Uuid) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM vote_records WHERE member_id = ? AND status = 'pending'",
    )
    .bind(member_id.to_string())
    .fetch_one(db)
    .await?;

    Ok(count)
}

pub async fn get_vote(db: &SqlitePool, vote_id: Uuid) -> Result<VoteRecord> {
    let mut conn = db.acquire().await?;
    fetch_vote(&mut conn, vote_id).await
}

async fn fetch_vote(conn: &mut SqliteConnection, vote_id: Uuid) -> Result<VoteRecord> {
    let row: Option<VoteRecordRow> = sqlx::query_as(&format!(
        "SELECT {} FROM vote_records WHERE guid = ?",
        VOTE_COLUMNS
    ))
    .bind(vote_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or_else(|| Error::NotFound(format!("vote {}", vote_id)))?
        .try_into()
}

/// Complete a pending record and apply it to the song's counters
///
/// Completed records are final: casting again fails with
/// `InvalidStateTransition` and changes nothing.
pub async fn cast_vote(
    db: &SqlitePool,
    vote_id: Uuid,
    vote_type: VoteType,
    now: DateTime<Utc>,
) -> Result<VoteRecord> {
    let mut tx = db.begin().await?;

    let song_id: Option<String> = sqlx::query_scalar(
        r#"
        UPDATE vote_records
        SET status = 'completed', vote_type = ?, completed_at = ?
        WHERE guid = ? AND status = 'pending'
        RETURNING song_id
        "#,
    )
    .bind(vote_type.as_str())
    .bind(now)
    .bind(vote_id.to_string())
    .fetch_optional(&mut *tx)
    .await?;

    let song_id = match song_id {
        Some(song_id) => song_id,
        None => {
            let existing = fetch_vote(&mut tx, vote_id).await?;
            return Err(Error::InvalidStateTransition(format!(
                "vote {} is already {}",
                existing.id, existing.status
            )));
        }
    };

    let counter = match vote_type {
        VoteType::Up => Some("yes_votes"),
        VoteType::Down => Some("no_votes"),
        VoteType::Skip => None,
    };

    if let Some(column) = counter {
        let result = sqlx::query(&format!(
            "UPDATE songs SET {column} = {column} + 1 WHERE guid = ?"
        ))
        .bind(&song_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() != 1 {
            return Err(Error::NotFound(format!("song {}", song_id)));
        }
    }

    let record = fetch_vote(&mut tx, vote_id).await?;
    tx.commit().await?;

    info!(
        vote_id = %vote_id,
        song_id = %record.song_id,
        vote_type = %vote_type,
        "Vote cast"
    );
    Ok(record)
}

/// Open a pending record for one (member, song) pair outside of fan-out
///
/// Lets a member ask for a vote they were not fanned out, e.g. on a song
/// suggested while they were inactive. Only active members may open a vote,
/// never on their own suggestion. Fails with `DuplicateVote` when the pair
/// already has a record.
pub async fn open_vote(
    db: &SqlitePool,
    member_id: Uuid,
    song_id: Uuid,
    now: DateTime<Utc>,
) -> Result<VoteRecord> {
    let member = members::get_member(db, member_id).await?;
    if !member.active {
        return Err(Error::Validation(format!("member {} is not active", member_id)));
    }
    let song = songs::get_song(db, song_id).await?;
    if song.suggested_by == member_id {
        return Err(Error::Validation(
            "members do not vote on their own suggestions".to_string(),
        ));
    }

    let vote_id = uuid_utils::generate();
    let inserted = sqlx::query(
        "INSERT INTO vote_records (guid, member_id, song_id, status, created_at)
         VALUES (?, ?, ?, 'pending', ?)",
    )
    .bind(vote_id.to_string())
    .bind(member_id.to_string())
    .bind(song_id.to_string())
    .bind(now)
    .execute(db)
    .await;

    match inserted {
        Ok(_) => {}
        Err(e) if is_unique_violation(&e) => {
            warn!(member_id = %member_id, song_id = %song_id, "Vote already open");
            return Err(Error::DuplicateVote { member_id, song_id });
        }
        Err(e) => return Err(e.into()),
    }

    info!(vote_id = %vote_id, member_id = %member_id, song_id = %song_id, "Opened vote");
    get_vote(db, vote_id).await
}

/// Give a member a pending record for every song they did not suggest
///
/// Used when someone joins after songs already exist. Returns how many
/// records were created.
pub async fn enroll_member(db: &SqlitePool, member_id: Uuid, now: DateTime<Utc>) -> Result<u64> {
    let mut tx = db.begin().await?;
    members::fetch_member(&mut tx, member_id).await?;

    let song_ids: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT s.guid FROM songs s
        WHERE s.suggested_by != ?
          AND NOT EXISTS (
              SELECT 1 FROM vote_records v WHERE v.song_id = s.guid AND v.member_id = ?
          )
        ORDER BY s.created_at, s.rowid
        "#,
    )
    .bind(member_id.to_string())
    .bind(member_id.to_string())
    .fetch_all(&mut *tx)
    .await?;

    let mut created = 0;
    for song_id in &song_ids {
        let song_id = parse_stored(song_id)?;
        created += fan_out_pending_votes(&mut tx, song_id, &[member_id], now).await?;
    }

    tx.commit().await?;
    info!(member_id = %member_id, created, "Enrolled member into voting");
    Ok(created)
}

/// Counts derived from the song's vote records
pub async fn tally(db: &SqlitePool, song_id: Uuid) -> Result<VoteTally> {
    let (up, down, skip, pending): (i64, i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN status = 'completed' AND vote_type = 'up' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'completed' AND vote_type = 'down' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'completed' AND vote_type = 'skip' THEN 1 ELSE 0 END), 0),
            COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0)
        FROM vote_records
        WHERE song_id = ?
        "#,
    )
    .bind(song_id.to_string())
    .fetch_one(db)
    .await?;

    Ok(VoteTally {
        up,
        down,
        skip,
        pending,
    })
}
