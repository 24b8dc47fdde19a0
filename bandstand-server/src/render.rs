//! Setlist documents
//!
//! Turns a setlist into a printable running order for the stage.

use std::fmt::Write as _;

use bandstand_common::models::Setlist;
use bandstand_common::Result;

use crate::setlist::duration_status;

pub trait SetlistRenderer: Send + Sync {
    /// MIME type of the rendered bytes
    fn content_type(&self) -> &'static str;

    /// File extension used for downloads
    fn extension(&self) -> &'static str;

    fn render(&self, setlist: &Setlist) -> Result<Vec<u8>>;
}

/// Plain UTF-8 running order
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextRenderer;

impl SetlistRenderer for PlainTextRenderer {
    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }

    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, setlist: &Setlist) -> Result<Vec<u8>> {
        Ok(render_text(setlist).into_bytes())
    }
}

fn render_text(setlist: &Setlist) -> String {
    let mut out = String::new();

    // Writing to a String cannot fail
    let _ = writeln!(out, "{}", setlist.name);
    let when = match setlist.event_time {
        Some(time) => format!("{} {}", setlist.event_date, time.format("%H:%M")),
        None => setlist.event_date.to_string(),
    };
    let _ = writeln!(out, "{}", when);
    if let Some(location) = &setlist.location {
        let _ = writeln!(out, "{}", location);
    }
    out.push('\n');

    if setlist.items.is_empty() {
        out.push_str("(no songs yet)\n");
    }
    for item in &setlist.items {
        let length = item
            .duration_minutes
            .map(format_minutes)
            .unwrap_or_else(|| "--:--".to_string());
        let _ = writeln!(
            out,
            "{:>2}. {} - {} ({})",
            item.position, item.title, item.artist, length
        );
    }

    let total = setlist.total_duration_minutes();
    out.push('\n');
    match setlist.target_duration_minutes {
        Some(target) => {
            let status = duration_status(total, Some(target)).label();
            let _ = writeln!(
                out,
                "Total {} of {} target ({})",
                format_minutes(total),
                format_minutes(target),
                status
            );
        }
        None => {
            let _ = writeln!(out, "Total {}", format_minutes(total));
        }
    }

    out
}

/// `m:ss` below an hour, `h:mm:ss` from an hour up
pub fn format_minutes(minutes: f64) -> String {
    let total_seconds = (minutes.max(0.0) * 60.0).round() as u64;
    let hours = total_seconds / 3600;
    let mins = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, mins, secs)
    } else {
        format!("{}:{:02}", mins, secs)
    }
}
