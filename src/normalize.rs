use crate::record::Status;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use regex::Regex;

// Clock time as guests write it: "14:30", "2pm", "9.30 am", "15h00"
const TIME: &str = r"(\d{1,2}(?:[:h.]\d{2})?\s*(?:am|pm)|\d{1,2}[:h]\d{2})";

lazy_static! {
    /// Tried in order; the first pattern that matches wins.
    static ref ARRIVAL_PATTERNS: Vec<Regex> = vec![
        Regex::new(
            r"(?i)approximate time of arrival:?\s*(?:between\s+)?(\d{1,2}:\d{2}(?:\s*(?:and|-)\s*\d{1,2}:\d{2})?)"
        )
        .unwrap(),
        Regex::new(&format!(
            r"(?i)\barriv\w*(?:\s+time)?\s*(?:is|will be|:|-)?\s*(?:at|around|about|approx\.?|approximately|by)?\s*{}",
            TIME
        ))
        .unwrap(),
        Regex::new(&format!(
            r"(?i)\b(?:eta|check[- ]?in)\b\s*(?:at|around|about|by|:)?\s*{}",
            TIME
        ))
        .unwrap(),
        Regex::new(&format!(r"(?i)\baround\s+{}", TIME)).unwrap(),
    ];
}

const COUNTRIES: &[(&str, &str)] = &[
    ("AT", "Austria"),
    ("AU", "Australia"),
    ("BE", "Belgium"),
    ("BR", "Brazil"),
    ("CA", "Canada"),
    ("CH", "Switzerland"),
    ("CN", "China"),
    ("CZ", "Czech Republic"),
    ("DE", "Germany"),
    ("DK", "Denmark"),
    ("DZ", "Algeria"),
    ("ES", "Spain"),
    ("FI", "Finland"),
    ("FR", "France"),
    ("GB", "United Kingdom"),
    ("GR", "Greece"),
    ("IE", "Ireland"),
    ("IL", "Israel"),
    ("IN", "India"),
    ("IT", "Italy"),
    ("JP", "Japan"),
    ("KR", "South Korea"),
    ("LU", "Luxembourg"),
    ("MA", "Morocco"),
    ("MX", "Mexico"),
    ("NL", "Netherlands"),
    ("NO", "Norway"),
    ("NZ", "New Zealand"),
    ("PL", "Poland"),
    ("PT", "Portugal"),
    ("RU", "Russia"),
    ("SA", "Saudi Arabia"),
    ("SE", "Sweden"),
    ("TN", "Tunisia"),
    ("TR", "Turkey"),
    ("AE", "United Arab Emirates"),
    ("UK", "United Kingdom"),
    ("US", "United States"),
    ("ZA", "South Africa"),
];

/// Title-case every word: "LINLONG" -> "Linlong", "jean-luc" -> "Jean-Luc"
pub fn title_case(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut at_word_start = true;
    for c in raw.trim().chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        at_word_start = !c.is_alphabetic() && c != '\'';
    }
    out
}

/// Split a combined guest name into (first, last)
///
/// "Lu, Linlong" is read as `Last, First`; anything else as `First Last...`.
pub fn split_name(raw: &str) -> (String, String) {
    let raw = raw.trim();
    if let Some((last, first)) = raw.split_once(',') {
        return (title_case(first), title_case(last));
    }

    let mut parts = raw.split_whitespace();
    let first = parts.next().map(title_case).unwrap_or_default();
    let last = parts.map(title_case).collect::<Vec<_>>().join(" ");
    (first, last)
}

/// Keep digits and `+`, then prefix `+` if it is not already there
///
/// Input without any digit normalizes to an empty string.
pub fn normalize_phone(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect();
    if !kept.chars().any(|c| c.is_ascii_digit()) {
        String::new()
    } else if kept.starts_with('+') {
        kept
    } else {
        format!("+{}", kept)
    }
}

/// Expand a two-letter country code to its name
pub fn expand_country(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() == 2 && raw.chars().all(|c| c.is_ascii_alphabetic()) {
        let code = raw.to_ascii_uppercase();
        return COUNTRIES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, name)| name.to_string())
            .unwrap_or(code);
    }
    raw.to_string()
}

/// Extract an amount from a money string: "156.00 EUR" -> "156.00"
///
/// When both `.` and `,` appear, the last one is the decimal separator.
pub fn parse_money(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect();

    match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => kept.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => kept.replace(',', ""),
        _ => kept.replace(',', "."),
    }
}

/// Parse a date in any of the formats channel exports use
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = DateTime::parse_from_rfc3339(raw) {
        return Some(datetime.date_naive());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }
    for format in [
        "%m/%d/%Y", "%d.%m.%Y", "%Y/%m/%d", "%d %B %Y", "%d %b %Y", "%B %d, %Y", "%b %d, %Y",
    ] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            // "%Y" happily reads "26" as year 26
            if date.year() >= 1900 {
                return Some(date);
            }
        }
    }
    NaiveDate::parse_from_str(raw, "%m/%d/%y").ok()
}

/// Re-emit a date as `YYYY-MM-DD`, passing unparseable input through
pub fn normalize_date(raw: &str) -> String {
    match parse_date(raw) {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw.trim().to_string(),
    }
}

pub fn normalize_status(raw: &str) -> Status {
    let lowered = raw.trim().to_lowercase();
    match lowered.as_str() {
        "" | "ok" | "confirmed" | "accepted" => Status::Confirmed,
        s if s.contains("cancel") => Status::Cancelled,
        s if s.contains("no show") || s.contains("noshow") || s.contains("no_show") => {
            Status::NoShow
        }
        s => Status::Other(s.to_string()),
    }
}

/// Pull a stated arrival time out of free-text remarks, or ""
pub fn extract_arrival_time(remarks: &str) -> String {
    ARRIVAL_PATTERNS
        .iter()
        .find_map(|pattern| pattern.captures(remarks))
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Parse a whole number out of a spreadsheet cell ("2", "2.0", " 3 ")
pub fn parse_count(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })
}
