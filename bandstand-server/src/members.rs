//! Member roster
//!
//! Members are created by the identity layer in front of the API; this
//! module only stores them and answers "who is active". A new member is
//! enrolled into voting on every existing song (see [`crate::votes::enroll_member`]).

use bandstand_common::db::MemberRow;
use bandstand_common::models::{Member, MAX_TEXT_LEN};
use bandstand_common::uuid_utils::{self, parse_stored};
use bandstand_common::{Error, Result};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;
use uuid::Uuid;

/// Register a new active member
pub async fn register_member(
    db: &SqlitePool,
    display_name: &str,
    now: DateTime<Utc>,
) -> Result<Member> {
    let display_name = display_name.trim();
    if display_name.is_empty() {
        return Err(Error::Validation("display_name is required".to_string()));
    }
    if display_name.chars().count() > MAX_TEXT_LEN {
        return Err(Error::Validation(format!(
            "display_name exceeds {} characters",
            MAX_TEXT_LEN
        )));
    }

    let member = Member {
        id: uuid_utils::generate(),
        display_name: display_name.to_string(),
        active: true,
        created_at: now,
    };

    sqlx::query("INSERT INTO members (guid, display_name, active, created_at) VALUES (?, ?, 1, ?)")
        .bind(member.id.to_string())
        .bind(&member.display_name)
        .bind(member.created_at)
        .execute(db)
        .await?;

    info!(member_id = %member.id, "Registered member {}", member.display_name);
    Ok(member)
}

pub async fn get_member(db: &SqlitePool, member_id: Uuid) -> Result<Member> {
    let mut conn = db.acquire().await?;
    fetch_member(&mut conn, member_id).await
}

/// Load a member inside an open transaction
pub async fn fetch_member(conn: &mut SqliteConnection, member_id: Uuid) -> Result<Member> {
    let row: Option<MemberRow> = sqlx::query_as(
        "SELECT guid, display_name, active, created_at FROM members WHERE guid = ?",
    )
    .bind(member_id.to_string())
    .fetch_optional(&mut *conn)
    .await?;

    row.ok_or_else(|| Error::NotFound(format!("member {}", member_id)))?
        .try_into()
}

/// Active members, oldest first
pub async fn list_active_members(db: &SqlitePool) -> Result<Vec<Member>> {
    let rows: Vec<MemberRow> = sqlx::query_as(
        "SELECT guid, display_name, active, created_at FROM members
         WHERE active = 1 ORDER BY created_at, rowid",
    )
    .fetch_all(db)
    .await?;

    rows.into_iter().map(Member::try_from).collect()
}

/// Deactivated members keep their history but stop receiving new votes
pub async fn set_active(db: &SqlitePool, member_id: Uuid, active: bool) -> Result<Member> {
    let result = sqlx::query("UPDATE members SET active = ? WHERE guid = ?")
        .bind(active)
        .bind(member_id.to_string())
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("member {}", member_id)));
    }

    info!(member_id = %member_id, active, "Member activity changed");
    get_member(db, member_id).await
}

/// Ids of active members other than `exclude`, read inside the caller's transaction
pub async fn active_member_ids_except(
    conn: &mut SqliteConnection,
    exclude: Uuid,
) -> Result<Vec<Uuid>> {
    let ids: Vec<String> = sqlx::query_scalar(
        "SELECT guid FROM members WHERE active = 1 AND guid != ? ORDER BY created_at, rowid",
    )
    .bind(exclude.to_string())
    .fetch_all(&mut *conn)
    .await?;

    ids.iter().map(|id| parse_stored(id)).collect()
}
