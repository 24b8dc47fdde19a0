//! Database row types
//!
//! Rows mirror the table layout (ids as TEXT, enums as TEXT) and convert
//! into the domain types in [`crate::models`].

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

use crate::models::{Member, Setlist, SetlistItem, Song, VoteRecord, VoteType};
use crate::uuid_utils::parse_stored;
use crate::Result;

#[derive(Debug, Clone, FromRow)]
pub struct MemberRow {
    pub guid: String,
    pub display_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<MemberRow> for Member {
    type Error = crate::Error;

    fn try_from(row: MemberRow) -> Result<Self> {
        Ok(Member {
            id: parse_stored(&row.guid)?,
            display_name: row.display_name,
            active: row.active,
            created_at: row.created_at,
        })
    }
}

/// Column list matching [`SongRow`]
pub const SONG_COLUMNS: &str = "guid, title, artist, genre, duration_minutes, media_ref, \
     view_count, suggested_by, yes_votes, no_votes, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct SongRow {
    pub guid: String,
    pub title: String,
    pub artist: String,
    pub genre: Option<String>,
    pub duration_minutes: Option<f64>,
    pub media_ref: Option<String>,
    pub view_count: Option<i64>,
    pub suggested_by: String,
    pub yes_votes: i64,
    pub no_votes: i64,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SongRow> for Song {
    type Error = crate::Error;

    fn try_from(row: SongRow) -> Result<Self> {
        Ok(Song {
            id: parse_stored(&row.guid)?,
            title: row.title,
            artist: row.artist,
            genre: row.genre,
            duration_minutes: row.duration_minutes,
            media_ref: row.media_ref,
            view_count: row.view_count,
            suggested_by: parse_stored(&row.suggested_by)?,
            yes_votes: row.yes_votes,
            no_votes: row.no_votes,
            created_at: row.created_at,
        })
    }
}

/// Column list matching [`VoteRecordRow`]
pub const VOTE_COLUMNS: &str =
    "guid, member_id, song_id, status, vote_type, created_at, completed_at";

#[derive(Debug, Clone, FromRow)]
pub struct VoteRecordRow {
    pub guid: String,
    pub member_id: String,
    pub song_id: String,
    pub status: String,
    pub vote_type: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<VoteRecordRow> for VoteRecord {
    type Error = crate::Error;

    fn try_from(row: VoteRecordRow) -> Result<Self> {
        let vote_type = row
            .vote_type
            .as_deref()
            .map(str::parse::<VoteType>)
            .transpose()?;

        Ok(VoteRecord {
            id: parse_stored(&row.guid)?,
            member_id: parse_stored(&row.member_id)?,
            song_id: parse_stored(&row.song_id)?,
            status: row.status.parse()?,
            vote_type,
            created_at: row.created_at,
            completed_at: row.completed_at,
        })
    }
}

/// Column list matching [`SetlistRow`]
pub const SETLIST_COLUMNS: &str = "guid, name, event_date, event_time, location, \
     target_duration_minutes, is_archived, version, created_at";

#[derive(Debug, Clone, FromRow)]
pub struct SetlistRow {
    pub guid: String,
    pub name: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub target_duration_minutes: Option<f64>,
    pub is_archived: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl SetlistRow {
    /// Attach the (already ordered) items
    pub fn into_setlist(self, items: Vec<SetlistItem>) -> Result<Setlist> {
        Ok(Setlist {
            id: parse_stored(&self.guid)?,
            name: self.name,
            event_date: self.event_date,
            event_time: self.event_time,
            location: self.location,
            target_duration_minutes: self.target_duration_minutes,
            is_archived: self.is_archived,
            version: self.version,
            created_at: self.created_at,
            items,
        })
    }
}

/// Item joined with its song for display
#[derive(Debug, Clone, FromRow)]
pub struct SetlistItemRow {
    pub guid: String,
    pub setlist_id: String,
    pub song_id: String,
    pub position: i64,
    pub title: String,
    pub artist: String,
    pub duration_minutes: Option<f64>,
}

impl TryFrom<SetlistItemRow> for SetlistItem {
    type Error = crate::Error;

    fn try_from(row: SetlistItemRow) -> Result<Self> {
        Ok(SetlistItem {
            id: parse_stored(&row.guid)?,
            song_id: parse_stored(&row.song_id)?,
            position: row.position,
            title: row.title,
            artist: row.artist,
            duration_minutes: row.duration_minutes,
        })
    }
}
