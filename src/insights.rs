use crate::error::{AppError, AppResult};
use crate::loader::{ParsedFile, SourceRow, parse_upload};
use crate::normalize::parse_date;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;

const DATE_COLUMNS: &[&str] = &["Date", "Review date", "Date of review", "Created"];
const RATING_COLUMNS: &[&str] = &["Rating", "Score", "Overall rating", "Review score"];
const TEXT_COLUMNS: &[&str] = &[
    "Review",
    "Review text",
    "Public review",
    "Comment",
    "Comments",
    "Text",
    "Positive",
    "Negative",
];

lazy_static! {
    /// Issue tags, in reporting order. A review counts each issue once.
    static ref ISSUE_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("cleanliness", Regex::new(r"(?i)\b(dirty|not clean|unclean|dusty|stains?|smelly|mou?ld)\b").unwrap()),
        ("noise", Regex::new(r"(?i)\b(noise|noisy|loud|thin walls)\b").unwrap()),
        ("hot water", Regex::new(r"(?i)((no|lack of|not enough) hot water|cold showers?|water pressure)").unwrap()),
        ("wifi", Regex::new(r"(?i)\b(wi-?fi|internet)\b").unwrap()),
        ("temperature", Regex::new(r"(?i)\b(freezing|too cold|too hot|heating|heater|air ?con|a/c)\b").unwrap()),
        ("breakfast", Regex::new(r"(?i)breakfast (was|is) (poor|bad|cold|disappointing|limited)").unwrap()),
        ("finding the place", Regex::new(r"(?i)(hard|difficult) to find|could ?n[o']t find|got lost").unwrap()),
        ("staff", Regex::new(r"(?i)\b(rude|unfriendly|unhelpful|impolite)\b").unwrap()),
        ("stairs", Regex::new(r"(?i)\b(stairs|steep steps)\b").unwrap()),
        ("bed comfort", Regex::new(r"(?i)(uncomfortable|hard) (bed|mattress|pillows?)").unwrap()),
    ];
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthSummary {
    /// `YYYY-MM`
    pub month: String,
    pub reviews: usize,
    pub average_rating: Option<f64>,
    pub issues: BTreeMap<String, usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueCount {
    pub issue: String,
    pub mentions: usize,
    /// Fraction of all reviews mentioning the issue
    pub share: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewInsights {
    pub total_reviews: usize,
    pub rated_reviews: usize,
    pub average_rating: Option<f64>,
    pub months: Vec<MonthSummary>,
    pub issues: Vec<IssueCount>,
    /// Pearson r between issues mentioned per review and its rating
    pub issue_rating_correlation: Option<f64>,
}

/// One parsed review
#[derive(Clone, Debug, PartialEq)]
pub struct Review {
    pub month: Option<String>,
    pub rating: Option<f64>,
    pub issues: Vec<&'static str>,
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Read a rating such as "9.2", "4,5" or "4/5" (the part before the slash)
pub fn parse_rating(raw: &str) -> Option<f64> {
    let head = raw.split('/').next().unwrap_or("").trim().replace(',', ".");
    head.parse::<f64>().ok().filter(|r| r.is_finite())
}

/// Issue tags mentioned in a text, in table order
pub fn extract_issues(text: &str) -> Vec<&'static str> {
    ISSUE_PATTERNS
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(issue, _)| *issue)
        .collect()
}

pub fn parse_review(row: &SourceRow) -> Review {
    let text = TEXT_COLUMNS
        .iter()
        .filter_map(|column| row.get(column))
        .collect::<Vec<_>>()
        .join("\n");

    Review {
        month: parse_date(row.first(DATE_COLUMNS)).map(|date| date.format("%Y-%m").to_string()),
        rating: parse_rating(row.first(RATING_COLUMNS)),
        issues: extract_issues(&text),
    }
}

/// Pearson correlation coefficient; `None` for fewer than two points or a
/// constant series
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let mean_x = xs.iter().sum::<f64>() / n as f64;
    let mean_y = ys.iter().sum::<f64>() / n as f64;

    let mut covariance = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        covariance += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(covariance / (var_x.sqrt() * var_y.sqrt()))
}

fn average(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(round_to(values.iter().sum::<f64>() / values.len() as f64, 2))
    }
}

/// Aggregate parsed reviews
pub fn summarize(reviews: &[Review]) -> ReviewInsights {
    let mut by_month: BTreeMap<String, (Vec<f64>, usize, BTreeMap<String, usize>)> =
        BTreeMap::new();
    let mut issue_totals: BTreeMap<&'static str, usize> = BTreeMap::new();
    let mut ratings = Vec::new();
    let mut issue_counts = Vec::new();

    for review in reviews {
        for issue in &review.issues {
            *issue_totals.entry(*issue).or_default() += 1;
        }
        if let Some(rating) = review.rating {
            ratings.push(rating);
            issue_counts.push(review.issues.len() as f64);
        }
        if let Some(month) = &review.month {
            let entry = by_month.entry(month.clone()).or_default();
            entry.1 += 1;
            if let Some(rating) = review.rating {
                entry.0.push(rating);
            }
            for issue in &review.issues {
                *entry.2.entry(issue.to_string()).or_default() += 1;
            }
        }
    }

    let months = by_month
        .into_iter()
        .map(|(month, (month_ratings, count, issues))| MonthSummary {
            month,
            reviews: count,
            average_rating: average(&month_ratings),
            issues,
        })
        .collect();

    let total = reviews.len();
    let mut issues: Vec<IssueCount> = ISSUE_PATTERNS
        .iter()
        .filter_map(|(issue, _)| {
            let mentions = *issue_totals.get(issue)?;
            Some(IssueCount {
                issue: issue.to_string(),
                mentions,
                share: round_to(mentions as f64 / total.max(1) as f64, 3),
            })
        })
        .collect();
    // stable: ties keep table order
    issues.sort_by(|a, b| b.mentions.cmp(&a.mentions));

    ReviewInsights {
        total_reviews: total,
        rated_reviews: ratings.len(),
        average_rating: average(&ratings),
        months,
        issues,
        issue_rating_correlation: pearson(&issue_counts, &ratings).map(|r| round_to(r, 3)),
    }
}

pub fn analyze(parsed: &ParsedFile) -> AppResult<ReviewInsights> {
    if parsed.rows.is_empty() {
        return Err(AppError::EmptyFile);
    }
    let reviews: Vec<Review> = parsed.rows.iter().map(parse_review).collect();
    Ok(summarize(&reviews))
}

/// Parse an uploaded review export and aggregate it
pub fn analyze_upload(file_name: &str, bytes: &[u8]) -> AppResult<ReviewInsights> {
    analyze(&parse_upload(file_name, bytes)?)
}
