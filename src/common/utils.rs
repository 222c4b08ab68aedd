use chrono::{DateTime, TimeZone, Utc};

/// Human-readable rendering of a duration in seconds, as used in log lines.
pub fn pretty_duration(seconds: i64) -> String {
    if seconds < 2 {
        format!("{} second", seconds)
    } else if seconds < 120 {
        format!("{} seconds", seconds)
    } else if seconds < 7200 {
        format!("{} minutes", seconds / 60)
    } else if seconds < 48 * 3600 {
        format!("{} hours", seconds / 3600)
    } else {
        format!("{} days", seconds / (24 * 3600))
    }
}

/// Time until the `x-rate-limit-reset` epoch, `??` when the header is
/// missing and `?!?` when it can't be parsed.
pub fn rate_limit_reset(reset_header: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(header) = reset_header else {
        return "??".into();
    };

    let reset_time = header
        .trim()
        .parse::<i64>()
        .ok()
        .and_then(|epoch| Utc.timestamp_opt(epoch, 0).single());

    match reset_time {
        Some(reset_time) => pretty_duration((reset_time - now).num_seconds()),
        None => "?!?".into(),
    }
}
