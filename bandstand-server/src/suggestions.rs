//! Suggestion intake
//!
//! Ties the quota ledger, the song catalog and the vote fan-out together.
//! A suggestion is all-or-nothing: the quota slot, the song and every
//! pending vote are written in one transaction.

use bandstand_common::models::{Song, SongDraft};
use bandstand_common::time::QuotaPeriod;
use bandstand_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::{members, quota, songs, votes};

/// Submit a song on behalf of `member_id`
///
/// Counts against the quota of the month containing `now`. Every other
/// active member gets a pending vote on the new song.
pub async fn submit_suggestion(
    db: &SqlitePool,
    member_id: Uuid,
    draft: &SongDraft,
    now: DateTime<Utc>,
) -> Result<Song> {
    draft.validate()?;

    let member = members::get_member(db, member_id).await?;
    if !member.active {
        return Err(Error::Validation(format!(
            "member {} is not active",
            member_id
        )));
    }

    // The quota claim is the first statement, so the transaction holds the
    // write lock from the start and concurrent submissions queue on it
    let mut tx = db.begin().await?;
    let period = QuotaPeriod::containing(now);
    let used = quota::try_record_suggestion(&mut tx, member_id, period, now).await?;
    let song = songs::insert_song(&mut tx, member_id, draft, now).await?;
    let voters = members::active_member_ids_except(&mut tx, member_id).await?;
    let pending = votes::fan_out_pending_votes(&mut tx, song.id, &voters, now).await?;

    tx.commit().await?;

    info!(
        member_id = %member_id,
        song_id = %song.id,
        period = %period,
        used,
        pending,
        "Suggestion accepted: {} by {}",
        song.title,
        song.artist
    );
    Ok(song)
}

/// Slots the member has left this month
pub async fn get_remaining_quota(
    db: &SqlitePool,
    member_id: Uuid,
    now: DateTime<Utc>,
) -> Result<i64> {
    quota::get_remaining(db, member_id, QuotaPeriod::containing(now)).await
}
