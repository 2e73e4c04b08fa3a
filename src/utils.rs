use chrono::{DateTime, Utc};

use crate::constants::STROOPS_PER_UNIT;

/// Current wall-clock time as unix seconds
pub fn current_timestamp() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Current wall-clock time as unix milliseconds
pub fn current_timestamp_ms() -> u64 {
    Utc::now().timestamp_millis().max(0) as u64
}

/// Render a unix-seconds timestamp as an ISO-8601 string
pub fn format_instant(epoch_secs: u64) -> String {
    DateTime::<Utc>::from_timestamp(epoch_secs as i64, 0)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| format!("@{}", epoch_secs))
}

/// Human-readable duration: "2d 3h 15m 42s"
pub fn format_duration(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    let secs = seconds % 60;

    let mut parts = Vec::new();
    if days > 0 {
        parts.push(format!("{}d", days));
    }
    if hours > 0 {
        parts.push(format!("{}h", hours));
    }
    if minutes > 0 {
        parts.push(format!("{}m", minutes));
    }
    if secs > 0 || parts.is_empty() {
        parts.push(format!("{}s", secs));
    }

    parts.join(" ")
}

/// Render a stroop amount as a whole-unit decimal string
pub fn stroops_to_units(stroops: u64) -> String {
    let whole = stroops / STROOPS_PER_UNIT;
    let frac = stroops % STROOPS_PER_UNIT;
    if frac == 0 {
        format!("{}", whole)
    } else {
        let s = format!("{}.{:07}", whole, frac);
        s.trim_end_matches('0').to_string()
    }
}
