//! Permissive parsing of the balance sheet's date column.

use chrono::NaiveDate;

/// Formats tried in order against the whole (trimmed) cell.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

/// Sheets renders two-digit years like `1/5/24`; these are only tried when the last segment has
/// exactly two digits so that `%Y` does not read them as the year 24.
const SHORT_YEAR_FORMATS: &[&str] = &["%m/%d/%y", "%m-%d-%y"];

/// Parse a date cell.
///
/// Accepts US style `MM/DD/YYYY` (single digit month and day are fine), ISO `YYYY-MM-DD`, a few
/// spelled out month forms such as `January 5, 2024`, and date-times whose leading date matches
/// one of those, e.g. `10/20/2025 9:15:30 AM` or `2024-01-01T00:00:00`.
///
/// Returns `None` when nothing matches.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Some(date) = parse_date_only(s) {
        return Some(date);
    }
    // Fall back to the part before a time component.
    let date_part = s.split(|c: char| c == 'T' || c.is_whitespace()).next()?;
    if date_part.len() < s.len() {
        return parse_date_only(date_part);
    }
    None
}

fn parse_date_only(s: &str) -> Option<NaiveDate> {
    if has_short_year(s) {
        return SHORT_YEAR_FORMATS
            .iter()
            .find_map(|f| NaiveDate::parse_from_str(s, f).ok());
    }
    DATE_FORMATS
        .iter()
        .find_map(|f| NaiveDate::parse_from_str(s, f).ok())
}

fn has_short_year(s: &str) -> bool {
    let parts: Vec<&str> = s.split(['/', '-']).collect();
    parts.len() == 3
        && parts[0].len() <= 2
        && parts[2].len() == 2
        && parts
            .iter()
            .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
}
