//! Setlist lifecycle
//!
//! The phase of a setlist is derived from its event instant and archive
//! flag every time it is asked for; it is never stored.
//!
//! - `archived`: flagged by hand, or the event is at least
//!   [`RECENT_WINDOW_DAYS`] in the past
//! - `upcoming`: the event is still ahead
//! - `recent`: everything in between

use std::str::FromStr;

use bandstand_common::models::{DurationStatus, Setlist, SetlistPhase};
use bandstand_common::time::{recent_window_start, RECENT_WINDOW_DAYS};
use bandstand_common::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::debug;

use crate::setlist::{self, duration_status};

/// Which setlists a listing should include
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PhaseFilter {
    #[default]
    All,
    Only(SetlistPhase),
}

impl FromStr for PhaseFilter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(PhaseFilter::All),
            "upcoming" => Ok(PhaseFilter::Only(SetlistPhase::Upcoming)),
            "recent" => Ok(PhaseFilter::Only(SetlistPhase::Recent)),
            "archived" => Ok(PhaseFilter::Only(SetlistPhase::Archived)),
            other => Err(Error::Validation(format!("unknown phase: {}", other))),
        }
    }
}

/// A setlist with everything derived from it
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SetlistSummary {
    #[serde(flatten)]
    pub setlist: Setlist,
    pub phase: SetlistPhase,
    pub total_duration_minutes: f64,
    pub duration_status: DurationStatus,
}

impl SetlistSummary {
    pub fn new(setlist: Setlist, now: DateTime<Utc>) -> Self {
        let total = setlist.total_duration_minutes();
        Self {
            phase: classify(&setlist, now),
            total_duration_minutes: total,
            duration_status: duration_status(total, setlist.target_duration_minutes),
            setlist,
        }
    }
}

/// Phase of a setlist at `now`
pub fn classify(setlist: &Setlist, now: DateTime<Utc>) -> SetlistPhase {
    let event = setlist.event_start();

    if setlist.is_archived || event <= recent_window_start(now) {
        SetlistPhase::Archived
    } else if event > now {
        SetlistPhase::Upcoming
    } else {
        SetlistPhase::Recent
    }
}

/// Setlists matching `filter`, sorted for display
///
/// Upcoming setlists come soonest first, recent and archived ones most
/// recent first. `All` lists every setlist by event, newest first.
pub fn select(setlists: Vec<Setlist>, filter: PhaseFilter, now: DateTime<Utc>) -> Vec<SetlistSummary> {
    let mut selected: Vec<SetlistSummary> = setlists
        .into_iter()
        .map(|setlist| SetlistSummary::new(setlist, now))
        .filter(|summary| match filter {
            PhaseFilter::All => true,
            PhaseFilter::Only(phase) => summary.phase == phase,
        })
        .collect();

    match filter {
        PhaseFilter::Only(SetlistPhase::Upcoming) => {
            selected.sort_by_key(|s| s.setlist.event_start());
        }
        _ => {
            selected.sort_by_key(|s| std::cmp::Reverse(s.setlist.event_start()));
        }
    }

    selected
}

pub async fn list_setlists(
    db: &SqlitePool,
    filter: PhaseFilter,
    now: DateTime<Utc>,
) -> Result<Vec<SetlistSummary>> {
    let setlists = setlist::list_all(db).await?;
    debug!(
        total = setlists.len(),
        window_days = RECENT_WINDOW_DAYS,
        "Classifying setlists"
    );
    Ok(select(setlists, filter, now))
}
