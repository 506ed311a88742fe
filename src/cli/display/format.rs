//! Duration and truncation formatters for CLI output.

/// Format milliseconds for humans: "850ms", "2.5s", "3m 05s".
pub fn format_ms(ms: u64) -> String {
    match ms {
        0..=999 => format!("{ms}ms"),
        1_000..=59_999 => format!("{:.1}s", ms as f64 / 1000.0),
        _ => {
            let secs = ms / 1000;
            format!("{}m {:02}s", secs / 60, secs % 60)
        }
    }
}

/// Format an optional count, using "-" for unknown.
pub fn count_or_dash(n: Option<u64>) -> String {
    n.map_or_else(|| "-".to_string(), |n| n.to_string())
}

/// Truncate a string with unicode ellipsis, respecting char boundaries.
pub fn truncate_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(1)).collect();
        format!("{kept}\u{2026}")
    }
}
