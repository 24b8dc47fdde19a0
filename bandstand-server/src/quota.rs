//! Suggestion quota ledger
//!
//! Each member may suggest at most [`SUGGESTIONS_PER_PERIOD`] songs per
//! calendar month (UTC). The counter lives in `suggestion_quotas`, one row
//! per (member, period), and is only ever changed by a single conditional
//! upsert: concurrent submissions serialize on the row and at most
//! `SUGGESTIONS_PER_PERIOD` of them can succeed. A new period starts with
//! no row, which reads as a full allowance.

use bandstand_common::time::QuotaPeriod;
use bandstand_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

/// Suggestions allowed per member per period
pub const SUGGESTIONS_PER_PERIOD: i64 = 3;

/// Usage of one period, for history views
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub period: QuotaPeriod,
    pub used: i64,
    pub remaining: i64,
}

/// Slots left for the member in the period, in `0..=SUGGESTIONS_PER_PERIOD`
pub async fn get_remaining(db: &SqlitePool, member_id: Uuid, period: QuotaPeriod) -> Result<i64> {
    let used: Option<i64> =
        sqlx::query_scalar("SELECT count FROM suggestion_quotas WHERE member_id = ? AND period = ?")
            .bind(member_id.to_string())
            .bind(period.key())
            .fetch_optional(db)
            .await?;

    Ok(remaining_after(used.unwrap_or(0)))
}

/// Consume one slot, or fail with `QuotaExceeded` leaving the counter untouched
///
/// Runs on the caller's connection so that it commits or rolls back with
/// the rest of the suggestion. Returns the new usage count.
pub async fn try_record_suggestion(
    conn: &mut SqliteConnection,
    member_id: Uuid,
    period: QuotaPeriod,
    now: DateTime<Utc>,
) -> Result<i64> {
    // No row is returned when the WHERE guard rejects the update
    let used: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO suggestion_quotas (member_id, period, count, updated_at)
        VALUES (?, ?, 1, ?)
        ON CONFLICT (member_id, period) DO UPDATE
            SET count = suggestion_quotas.count + 1,
                updated_at = excluded.updated_at
            WHERE suggestion_quotas.count < ?
        RETURNING count
        "#,
    )
    .bind(member_id.to_string())
    .bind(period.key())
    .bind(now)
    .bind(SUGGESTIONS_PER_PERIOD)
    .fetch_optional(&mut *conn)
    .await?;

    match used {
        Some(used) => {
            debug!(member_id = %member_id, period = %period, used, "Suggestion slot consumed");
            Ok(used)
        }
        None => {
            warn!(member_id = %member_id, period = %period, "Suggestion quota exhausted");
            Err(Error::QuotaExceeded {
                member_id,
                period: period.key(),
            })
        }
    }
}

/// Every period the member has used, newest first
pub async fn usage_history(db: &SqlitePool, member_id: Uuid) -> Result<Vec<QuotaUsage>> {
    let rows: Vec<(String, i64)> = sqlx::query_as(
        "SELECT period, count FROM suggestion_quotas WHERE member_id = ? ORDER BY period DESC",
    )
    .bind(member_id.to_string())
    .fetch_all(db)
    .await?;

    rows.into_iter()
        .map(|(period, used)| {
            Ok(QuotaUsage {
                period: period.parse()?,
                used,
                remaining: remaining_after(used),
            })
        })
        .collect()
}

fn remaining_after(used: i64) -> i64 {
    (SUGGESTIONS_PER_PERIOD - used).clamp(0, SUGGESTIONS_PER_PERIOD)
}
