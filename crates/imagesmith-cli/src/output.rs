//! Formatting helpers for command summaries.

use std::time::Duration;

/// Formats an elapsed time for summary lines (e.g. "850ms", "2.4s").
#[must_use]
pub fn format_elapsed(elapsed: Duration) -> String {
    if elapsed < Duration::from_secs(1) {
        format!("{}ms", elapsed.as_millis())
    } else {
        format!("{:.1}s", elapsed.as_secs_f64())
    }
}

/// Formats a count with the matching noun form (e.g. "1 version", "3 versions").
#[must_use]
pub fn count(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}
