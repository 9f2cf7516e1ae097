//! Value formatting shared by the extraction rules
//!
//! Every helper returns `None` for a value that should fall back to the
//! column placeholder.

use chrono::DateTime;

/// Separator for list-valued fields. Must not contain the CSV delimiter.
pub const LIST_SEPARATOR: &str = "; ";

/// Maximum number of cast members kept per row
pub const MAX_CAST: usize = 10;

/// Decode HTML/XML entities, collapse whitespace runs and trim
pub fn clean_text(text: &str) -> Option<String> {
    let decoded = quick_xml::escape::unescape(text)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| text.to_string());
    let collapsed = decoded.split_whitespace().collect::<Vec<_>>().join(" ");
    (!collapsed.is_empty()).then_some(collapsed)
}

/// Milliseconds to whole minutes
pub fn duration_minutes(millis: i64) -> Option<String> {
    (millis > 0).then(|| (millis / 60_000).to_string())
}

/// Unix seconds to a UTC `YYYY-MM-DD HH:MM:SS` timestamp
pub fn timestamp(seconds: i64) -> Option<String> {
    if seconds <= 0 {
        return None;
    }
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Byte count in binary units with one decimal (`1.5 GiB`)
pub fn file_size(bytes: i64) -> Option<String> {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    if bytes < 0 {
        return None;
    }
    if bytes < 1024 {
        return Some(format!("{} B", bytes));
    }

    let mut size = bytes as f64;
    let mut unit = 0;
    // Compare the value as printed so 1023.95 KiB becomes 1.0 MiB, not 1024.0 KiB
    while unit < UNITS.len() - 1 && (size * 10.0).round() / 10.0 >= 1024.0 {
        size /= 1024.0;
        unit += 1;
    }
    Some(format!("{:.1} {}", size, UNITS[unit]))
}

/// Rating on the server's 0–10 scale as a whole percentage
pub fn rating_percent(rating: f64) -> Option<String> {
    (rating.is_finite() && rating >= 0.0).then(|| format!("{:.0}%", rating * 10.0))
}

/// Join cleaned list entries, keeping at most `cap` of them
pub fn join_list(values: Vec<String>, cap: Option<usize>) -> Option<String> {
    let cleaned = values
        .iter()
        .filter_map(|v| clean_text(v))
        .take(cap.unwrap_or(usize::MAX))
        .collect::<Vec<_>>();
    (!cleaned.is_empty()).then(|| cleaned.join(LIST_SEPARATOR))
}

/// Extract the TMDB id from a list of guid URIs (`tmdb://603`)
pub fn tmdb_id_from_guids(guids: &[String]) -> Option<String> {
    guids
        .iter()
        .find_map(|guid| guid.strip_prefix("tmdb://"))
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Render a premiere date as an open-ended ISO-8601 interval
pub fn open_date_range(start: &str) -> Option<String> {
    let start = start.trim();
    (!start.is_empty()).then(|| format!("{}/..", start))
}
