//! Pure quiet-hours evaluation.
//!
//! Nothing here blocks delivery: the dispatcher always forwards events, and
//! consumers ask this module whether to play a sound, pop a toast, or stay
//! quiet for the moment.

use chrono::{DateTime, FixedOffset, NaiveTime, Utc};

use crate::db::models::QuietHours;

/// Whether `at` falls inside the user's quiet-hours window.
///
/// The window is `[start, end)` on the configured offset's wall clock and
/// wraps midnight when `start > end`. Unparseable times or timezones fail
/// open (never suppressed) so a corrupt preference cannot mute a user
/// silently.
pub fn is_suppressed(quiet: &QuietHours, at: DateTime<Utc>) -> bool {
    if !quiet.enabled {
        return false;
    }

    let Some(offset) = parse_offset(&quiet.timezone) else {
        tracing::warn!(timezone = %quiet.timezone, "Unparseable quiet-hours timezone, not suppressing");
        return false;
    };
    let (Some(start), Some(end)) = (parse_hhmm(&quiet.start), parse_hhmm(&quiet.end)) else {
        tracing::warn!(start = %quiet.start, end = %quiet.end, "Unparseable quiet-hours window, not suppressing");
        return false;
    };

    let local = at.with_timezone(&offset).time();
    in_window(local, start, end)
}

fn in_window(t: NaiveTime, start: NaiveTime, end: NaiveTime) -> bool {
    use std::cmp::Ordering;
    match start.cmp(&end) {
        // start == end is an empty window, not a 24h one.
        Ordering::Equal => false,
        Ordering::Less => t >= start && t < end,
        // Wraps midnight: 22:00-08:00 spans two calendar days.
        Ordering::Greater => t >= start || t < end,
    }
}

fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Accepts "UTC", "Z" and fixed offsets like "+05:30" or "-08:00".
fn parse_offset(s: &str) -> Option<FixedOffset> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("utc") || s.eq_ignore_ascii_case("z") {
        return FixedOffset::east_opt(0);
    }

    let (sign, rest) = match s.as_bytes().first()? {
        b'+' => (1, &s[1..]),
        b'-' => (-1, &s[1..]),
        _ => return None,
    };
    let (hours, minutes) = rest.split_once(':')?;
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
