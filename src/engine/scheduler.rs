//! §4.I Session scheduler: maps wall-clock time (in the configured
//! timezone) to the current (dateKey, sessionIndex), and drives
//! `session::run_session` at most once per window. The unique-key insert
//! inside `session::run_session` is what actually guarantees at-most-once
//! execution (§5) — this module only decides *when* to call it.

use chrono::{DateTime, Duration, FixedOffset, Timelike, Utc};

use crate::config::Config;
use crate::engine::session::{self, SessionRunResult};
use crate::events::EventBus;
use crate::model::session::SESSION_WINDOWS_MINUTES;
use crate::store::Db;

/// Resolves a UTC instant to (dateKey, sessionIndex) in the configured
/// timezone (§3 Session run: `dateKey` is YYYY-MM-DD in configured tz).
/// `None` between 00:00 and the first window's start (§6: the 8 windows
/// span 06:00-24:00, leaving the small hours with no active session).
pub fn current_session(config: &Config, now_utc: DateTime<Utc>) -> Option<(String, i32)> {
    let offset = FixedOffset::east_opt(config.timezone_offset_minutes() * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let local = now_utc.with_timezone(&offset);
    let minute_of_day = local.hour() as u32 * 60 + local.minute();

    let session_index = SESSION_WINDOWS_MINUTES
        .iter()
        .find(|(_, start, end)| minute_of_day >= *start && minute_of_day < *end)
        .map(|(idx, _, _)| *idx)?;

    Some((local.format("%Y-%m-%d").to_string(), session_index))
}

/// Called every minute by the process's own timer loop (§4.I). Attempts the
/// SessionRun insert for the current window; `run_session` itself handles
/// the "already processed" no-op if another worker already won the race.
/// Returns `None` if called outside any session window.
pub async fn tick(
    db: &Db,
    bus: &EventBus,
    config: &Config,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<Option<SessionRunResult>> {
    let Some((date_key, session_index)) = current_session(config, now_utc) else {
        return Ok(None);
    };
    let now = now_utc.timestamp();
    let result = session::run_session(db, bus, &date_key, session_index, now).await?;
    Ok(Some(result))
}

/// Admin entry point (§4.I, §6 `triggerSessionNow`): forces a specific
/// session index for *today*, rather than waiting for the scheduler's own
/// minute tick to reach that window.
pub async fn trigger_session_now(
    db: &Db,
    bus: &EventBus,
    config: &Config,
    session_index: i32,
    now_utc: DateTime<Utc>,
) -> anyhow::Result<SessionRunResult> {
    let offset = FixedOffset::east_opt(config.timezone_offset_minutes() * 60)
        .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
    let local = now_utc.with_timezone(&offset);
    let date_key = local.format("%Y-%m-%d").to_string();
    let now = now_utc.timestamp();
    let result = session::run_session(db, bus, &date_key, session_index, now).await?;
    Ok(result)
}

/// Sleeps until the start of the next minute boundary, for the scheduler's
/// own timer loop in `main`.
pub fn duration_until_next_minute(now_utc: DateTime<Utc>) -> std::time::Duration {
    let seconds_into_minute = now_utc.second();
    let remaining = Duration::seconds(60 - seconds_into_minute as i64);
    remaining.to_std().unwrap_or(std::time::Duration::from_secs(1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn resolves_utc_instant_into_kolkata_session_index() {
        let config = Config::default();
        // 06:30 UTC = 12:00 IST, inside window 3 (10:30-12:45).
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 6, 30, 0).unwrap();
        let (date_key, idx) = current_session(&config, now).unwrap();
        assert_eq!(date_key, "2026-01-15");
        assert_eq!(idx, 3);
    }

    #[test]
    fn no_active_session_in_the_small_hours() {
        let config = Config::default();
        // 23:00 UTC = 04:30 IST next day, before window 1 opens at 06:00.
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 23, 0, 0).unwrap();
        assert!(current_session(&config, now).is_none());
    }

    #[test]
    fn last_window_covers_up_to_midnight() {
        let config = Config::default();
        // 18:00 UTC = 23:30 IST, inside window 8 (21:45-24:00).
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 18, 0, 0).unwrap();
        let (date_key, idx) = current_session(&config, now).unwrap();
        assert_eq!(date_key, "2026-01-15");
        assert_eq!(idx, 8);
    }
}
