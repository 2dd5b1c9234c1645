//! Display formatting helpers.

use std::time::Duration;

/// `MM:SS`, rounding partial seconds up so "00:00" only shows at the end.
pub fn format_clock(remaining: Duration) -> String {
    let mut total_secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        total_secs += 1;
    }
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}

/// Milliseconds to whole minutes, rounded to nearest.
pub fn to_minutes(ms: u64) -> u64 {
    ms.saturating_add(30_000) / 60_000
}
