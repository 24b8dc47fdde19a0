//! Domain types shared by the Bandstand crates
//!
//! These are the shapes callers see. Database row types live in
//! [`crate::db::models`] and convert into these.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

/// Longest accepted title/artist/name, in characters
pub const MAX_TEXT_LEN: usize = 200;

/// A band member allowed to suggest and vote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: Uuid,
    pub display_name: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// A candidate song and its vote aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: Uuid,
    pub title: String,
    pub artist: String,
    pub genre: Option<String>,
    /// Length in minutes (fractional allowed)
    pub duration_minutes: Option<f64>,
    /// External media reference, e.g. a video id
    pub media_ref: Option<String>,
    /// View count reported by the media provider when the song was suggested
    pub view_count: Option<i64>,
    pub suggested_by: Uuid,
    pub yes_votes: i64,
    pub no_votes: i64,
    pub created_at: DateTime<Utc>,
}

impl Song {
    /// Counted (up + down) votes; skips are not included
    pub fn total_votes(&self) -> i64 {
        self.yes_votes + self.no_votes
    }
}

/// Caller-supplied fields for a new suggestion
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SongDraft {
    pub title: String,
    pub artist: String,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<f64>,
    #[serde(default)]
    pub media_ref: Option<String>,
    #[serde(default)]
    pub view_count: Option<i64>,
}

impl SongDraft {
    /// Reject drafts before anything is written
    pub fn validate(&self) -> Result<()> {
        require_text("title", &self.title)?;
        require_text("artist", &self.artist)?;
        if let Some(minutes) = self.duration_minutes {
            if !minutes.is_finite() || minutes < 0.0 {
                return Err(Error::Validation(format!(
                    "duration_minutes must be a non-negative number, got {}",
                    minutes
                )));
            }
        }
        if let Some(views) = self.view_count {
            if views < 0 {
                return Err(Error::Validation("view_count must not be negative".to_string()));
            }
        }
        Ok(())
    }
}

/// Lifecycle of a vote record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteStatus {
    Pending,
    Completed,
}

impl VoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteStatus::Pending => "pending",
            VoteStatus::Completed => "completed",
        }
    }
}

impl FromStr for VoteStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(VoteStatus::Pending),
            "completed" => Ok(VoteStatus::Completed),
            other => Err(Error::Validation(format!("unknown vote status: {}", other))),
        }
    }
}

impl fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A member's decision on a song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteType {
    Up,
    Down,
    Skip,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Up => "up",
            VoteType::Down => "down",
            VoteType::Skip => "skip",
        }
    }
}

impl FromStr for VoteType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" | "yes" => Ok(VoteType::Up),
            "down" | "no" => Ok(VoteType::Down),
            "skip" => Ok(VoteType::Skip),
            other => Err(Error::Validation(format!("unknown vote type: {}", other))),
        }
    }
}

impl fmt::Display for VoteType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One member's vote on one song
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub id: Uuid,
    pub member_id: Uuid,
    pub song_id: Uuid,
    pub status: VoteStatus,
    /// Set only once the record is completed
    pub vote_type: Option<VoteType>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Counts derived from the vote records of one song
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    pub up: i64,
    pub down: i64,
    pub skip: i64,
    pub pending: i64,
}

/// Editable setlist header fields
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetlistMeta {
    pub name: String,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub event_time: Option<NaiveTime>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub target_duration_minutes: Option<f64>,
}

impl SetlistMeta {
    pub fn validate(&self) -> Result<()> {
        require_text("name", &self.name)?;
        if let Some(target) = self.target_duration_minutes {
            if !target.is_finite() || target <= 0.0 {
                return Err(Error::Validation(format!(
                    "target_duration_minutes must be positive, got {}",
                    target
                )));
            }
        }
        Ok(())
    }
}

/// A song placed in a setlist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetlistItem {
    pub id: Uuid,
    pub song_id: Uuid,
    /// 1-based, dense within the setlist
    pub position: i64,
    pub title: String,
    pub artist: String,
    pub duration_minutes: Option<f64>,
}

/// A performance running order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Setlist {
    pub id: Uuid,
    pub name: String,
    pub event_date: NaiveDate,
    pub event_time: Option<NaiveTime>,
    pub location: Option<String>,
    pub target_duration_minutes: Option<f64>,
    pub is_archived: bool,
    /// Bumped on every item edit
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub items: Vec<SetlistItem>,
}

impl Setlist {
    /// Sum of item durations; songs without a duration count as zero
    pub fn total_duration_minutes(&self) -> f64 {
        self.items.iter().filter_map(|item| item.duration_minutes).sum()
    }

    /// Moment the event starts; midnight UTC when no time is set
    pub fn event_start(&self) -> DateTime<Utc> {
        self.event_date
            .and_time(self.event_time.unwrap_or_default())
            .and_utc()
    }
}

/// How a setlist's length compares to its target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationStatus {
    NoTarget,
    UnderTarget,
    NearTarget,
    OverTarget,
}

impl DurationStatus {
    /// Human-readable form, e.g. "near target"
    pub fn label(&self) -> &'static str {
        match self {
            DurationStatus::NoTarget => "no target",
            DurationStatus::UnderTarget => "under target",
            DurationStatus::NearTarget => "near target",
            DurationStatus::OverTarget => "over target",
        }
    }
}

/// Derived lifecycle classification of a setlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetlistPhase {
    Upcoming,
    Recent,
    Archived,
}

impl SetlistPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            SetlistPhase::Upcoming => "upcoming",
            SetlistPhase::Recent => "recent",
            SetlistPhase::Archived => "archived",
        }
    }
}

impl fmt::Display for SetlistPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} is required", field)));
    }
    if trimmed.chars().count() > MAX_TEXT_LEN {
        return Err(Error::Validation(format!(
            "{} exceeds {} characters",
            field, MAX_TEXT_LEN
        )));
    }
    Ok(())
}
