//! Status log grouping
//!
//! Turns the flat status-change log into day buckets, newest day first and
//! newest entry first within a day. Each entry is annotated with how long
//! the user stayed in that status: the gap to the entry shown directly above
//! it (the next newer change on the same day).

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use shared::models::StatusLogEntry;

use crate::time_format::{TimeFormatter, format_duration_strict};

/// Label of the globally newest entry
pub const CURRENTLY_ACTIVE: &str = "Currently active";

/// Duration annotation of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDuration {
    /// Newest entry overall; still running
    CurrentlyActive,
    /// Time until the next newer change on the same day
    Lasted(TimeDelta),
    /// Newest entry of an older day; nothing above it to measure against
    NotShown,
}

impl EntryDuration {
    pub fn label(&self) -> String {
        match self {
            EntryDuration::CurrentlyActive => CURRENTLY_ACTIVE.to_string(),
            EntryDuration::Lasted(delta) => format_duration_strict(*delta),
            EntryDuration::NotShown => String::new(),
        }
    }
}

/// One log entry in display position
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedEntry {
    pub entry: StatusLogEntry,
    pub created_at: DateTime<Utc>,
    pub duration: EntryDuration,
}

/// Entries sharing a calendar date
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayGroup {
    pub date: NaiveDate,
    /// Newest first
    pub entries: Vec<GroupedEntry>,
}

impl DayGroup {
    /// `YYYY-MM-DD`
    pub fn key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// `January 5, 2025 (3 status changes)`
    pub fn label(&self) -> String {
        let count = self.entries.len();
        format!(
            "{} ({} status change{})",
            self.date.format("%B %-d, %Y"),
            count,
            if count == 1 { "" } else { "s" }
        )
    }
}

/// Group a status log by calendar day in the formatter's zone
///
/// Pure: the output depends only on the entries and the zone. Entries whose
/// `created_at` cannot be read are left out.
pub fn group_status_log(entries: &[StatusLogEntry], formatter: &TimeFormatter) -> Vec<DayGroup> {
    let mut dated: Vec<(DateTime<Utc>, &StatusLogEntry)> = entries
        .iter()
        .filter_map(|entry| match formatter.parse(&entry.created_at) {
            Some(instant) => Some((instant, entry)),
            None => {
                tracing::warn!(id = entry.id, created_at = %entry.created_at, "Skipping log entry with unreadable created_at");
                None
            }
        })
        .collect();

    // Newest first; stable so equal instants keep their input order
    dated.sort_by(|a, b| b.0.cmp(&a.0));

    let mut groups: Vec<DayGroup> = Vec::new();
    for (instant, entry) in dated {
        let date = formatter.local_date(instant);
        let is_first_overall = groups.is_empty();

        match groups.last_mut() {
            Some(group) if group.date == date => {
                let newer = group
                    .entries
                    .last()
                    .map(|e| e.created_at)
                    .unwrap_or(instant);
                group.entries.push(GroupedEntry {
                    entry: entry.clone(),
                    created_at: instant,
                    duration: EntryDuration::Lasted(newer - instant),
                });
            }
            _ => groups.push(DayGroup {
                date,
                entries: vec![GroupedEntry {
                    entry: entry.clone(),
                    created_at: instant,
                    duration: if is_first_overall {
                        EntryDuration::CurrentlyActive
                    } else {
                        EntryDuration::NotShown
                    },
                }],
            }),
        }
    }

    groups
}
