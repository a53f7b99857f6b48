//! Time formatting
//!
//! Backend timestamps are wall-clock strings without a zone
//! (`2025-05-30 12:39:12`), interpreted in the configured business time
//! zone. Full RFC 3339 strings with an offset are accepted too.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::session::Clock;

/// Shown when a timestamp is missing or unreadable
pub const NOT_AVAILABLE: &str = "N/A";

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;
const MONTH: i64 = 30 * DAY;
const YEAR: i64 = 365 * DAY;

/// Absolute and relative rendering of one timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedTime {
    /// `May 30, 2025, 12:39:12 PM`
    pub absolute: String,
    /// `5 minutes ago`
    pub relative: String,
}

impl FormattedTime {
    pub fn not_available() -> Self {
        Self {
            absolute: NOT_AVAILABLE.to_string(),
            relative: NOT_AVAILABLE.to_string(),
        }
    }
}

/// Formatter bound to the business time zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeFormatter {
    tz: Tz,
}

impl TimeFormatter {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse a backend timestamp into an instant
    pub fn parse(&self, raw: &str) -> Option<DateTime<Utc>> {
        let normalized = shared::util::normalize_timestamp(raw);
        if normalized.is_empty() {
            return None;
        }
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
            return Some(dt.with_timezone(&Utc));
        }
        let naive = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f")
            .or_else(|_| NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M"))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })?;
        // DST gap: fall back to reading the wall clock as UTC
        Some(
            naive
                .and_local_timezone(self.tz)
                .latest()
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|| naive.and_utc()),
        )
    }

    /// `May 30, 2025, 12:39:12 PM` in the business zone
    pub fn absolute(&self, instant: DateTime<Utc>) -> String {
        instant
            .with_timezone(&self.tz)
            .format("%b %-d, %Y, %-I:%M:%S %p")
            .to_string()
    }

    /// Calendar date of an instant in the business zone
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Both renderings; missing or unreadable input gives `N/A` for both
    pub fn format(&self, raw: Option<&str>, now: DateTime<Utc>) -> FormattedTime {
        let Some(instant) = raw.and_then(|r| self.parse(r)) else {
            if let Some(r) = raw
                && !r.trim().is_empty()
            {
                tracing::debug!(raw = %r, "Unparseable timestamp");
            }
            return FormattedTime::not_available();
        };
        FormattedTime {
            absolute: self.absolute(instant),
            relative: relative_time(instant, now),
        }
    }
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("{count} {unit}")
    } else {
        format!("{count} {unit}s")
    }
}

/// `just now`, `45 seconds ago`, `1 minute ago`, ... `2 years ago`
///
/// Instants in the future count as `just now`.
pub fn relative_time(instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - instant).num_seconds();
    let (count, unit) = match seconds {
        s if s < 10 => return "just now".to_string(),
        s if s < MINUTE => (s, "second"),
        s if s < HOUR => (s / MINUTE, "minute"),
        s if s < DAY => (s / HOUR, "hour"),
        s if s < MONTH => (s / DAY, "day"),
        s if s < YEAR => (s / MONTH, "month"),
        s => (s / YEAR, "year"),
    };
    format!("{} ago", plural(count, unit))
}

/// Strict distance between two instants in a single unit, rounded to the
/// nearest whole unit: `45 seconds`, `1 hour`, `3 days`, `2 months`.
pub fn format_duration_strict(delta: TimeDelta) -> String {
    let millis = delta.num_milliseconds().unsigned_abs() as f64;
    let seconds = millis / 1000.0;
    let minutes = seconds / 60.0;

    let round = |v: f64| v.round() as i64;
    if minutes < 1.0 {
        plural(round(seconds), "second")
    } else if minutes < 60.0 {
        plural(round(minutes), "minute")
    } else if minutes < 1440.0 {
        plural(round(minutes / 60.0), "hour")
    } else if minutes < 43_200.0 {
        plural(round(minutes / 1440.0), "day")
    } else if minutes < 525_600.0 {
        match round(minutes / 43_200.0) {
            12 => plural(1, "year"),
            months => plural(months, "month"),
        }
    } else {
        plural(round(minutes / 525_600.0), "year")
    }
}

// ============================================================================
// Live display
// ============================================================================

/// Re-renders one timestamp every second without refetching
///
/// The task stops on [`LiveTime::stop`] or drop.
pub struct LiveTime {
    raw: watch::Sender<Option<String>>,
    output: watch::Receiver<FormattedTime>,
    cancel: CancellationToken,
}

impl LiveTime {
    pub const REFRESH: Duration = Duration::from_secs(1);

    /// Start ticking. Must run inside a tokio runtime.
    pub fn start(formatter: TimeFormatter, clock: Arc<dyn Clock>, raw: Option<String>) -> Self {
        let now = || DateTime::from_timestamp_millis(clock.now_millis()).unwrap_or_default();
        let initial = formatter.format(raw.as_deref(), now());
        let (out_tx, output) = watch::channel(initial);
        let (raw, mut raw_rx) = watch::channel(raw);
        let cancel = CancellationToken::new();

        let token = cancel.clone();
        let clock = clock.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Self::REFRESH);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = raw_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = token.cancelled() => return,
                }
                let now = DateTime::from_timestamp_millis(clock.now_millis()).unwrap_or_default();
                let formatted = formatter.format(raw_rx.borrow_and_update().as_deref(), now);
                out_tx.send_if_modified(|current| {
                    if *current == formatted {
                        false
                    } else {
                        *current = formatted;
                        true
                    }
                });
            }
        });

        Self { raw, output, cancel }
    }

    /// Point the display at a new timestamp
    pub fn set_timestamp(&self, raw: Option<String>) {
        self.raw.send_replace(raw);
    }

    pub fn current(&self) -> FormattedTime {
        self.output.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FormattedTime> {
        self.output.clone()
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LiveTime {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
