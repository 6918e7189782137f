//! Display helpers for countdowns and progress.
//!
//! These are called from render loops, so they are total: every input maps to
//! a displayable value.

/// Shown when there is nothing to time.
pub const PLACEHOLDER: &str = "--:--";

/// `MM:SS`, zero-padded. Minutes are not wrapped into hours.
pub fn format_elapsed(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Human countdown using the two largest units, zero units dropped:
/// `1h 5m`, `1h`, `12m 30s`, `12m`, `45s`. Seconds are never shown once an
/// hour is present.
pub fn format_countdown(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    match (hours, minutes, secs) {
        (0, 0, s) => format!("{s}s"),
        (0, m, 0) => format!("{m}m"),
        (0, m, s) => format!("{m}m {s}s"),
        (h, 0, _) => format!("{h}h"),
        (h, m, _) => format!("{h}h {m}m"),
    }
}

/// `100 * elapsed / total`, clamped to `0..=100`. Zero total yields 0.
pub fn progress_pct(elapsed_secs: u64, total_secs: u64) -> f64 {
    if total_secs == 0 {
        return 0.0;
    }
    (elapsed_secs as f64 / total_secs as f64 * 100.0).clamp(0.0, 100.0)
}
