//! Schedule-time normalization. Inputs that arrive without an explicit
//! offset are interpreted in a single fixed regional offset and converted
//! to an absolute UTC instant before any comparison.

use chrono::{DateTime, FixedOffset, LocalResult, NaiveDateTime, TimeZone, Utc};

use crate::config::TimeConfig;
use crate::error::{WaveError, WaveResult};

/// Build the fixed regional offset from config.
pub fn regional_offset(config: &TimeConfig) -> WaveResult<FixedOffset> {
    FixedOffset::east_opt(config.utc_offset_hours * 3600)
        .ok_or_else(|| WaveError::Config(format!("invalid utc offset: {}", config.utc_offset_hours)))
}

/// Interpret a naive local timestamp in the given regional offset and
/// return the equivalent UTC instant.
pub fn normalize_naive(naive: NaiveDateTime, offset: FixedOffset) -> WaveResult<DateTime<Utc>> {
    match offset.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Ok(dt.with_timezone(&Utc)),
        // Fixed offsets have no DST gaps or folds.
        _ => Err(WaveError::Config(format!("unrepresentable local time: {naive}"))),
    }
}

/// Parse a schedule timestamp string. Accepts RFC 3339 with an explicit
/// offset, or a naive `YYYY-MM-DDTHH:MM:SS` interpreted regionally.
pub fn parse_schedule(input: &str, offset: FixedOffset) -> WaveResult<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S"))
        .map_err(|e| WaveError::Config(format!("unparseable schedule time '{input}': {e}")))?;
    normalize_naive(naive, offset)
}
