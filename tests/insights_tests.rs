use std::path::PathBuf;

use guesthouse::error::AppError;
use guesthouse::insights::{analyze_upload, extract_issues, parse_rating, pearson};

fn reviews_csv() -> Vec<u8> {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/reviews.csv");
    std::fs::read(path).unwrap()
}

#[test]
fn ratings_in_export_formats() {
    assert_eq!(parse_rating("9.2"), Some(9.2));
    assert_eq!(parse_rating("4,5"), Some(4.5));
    assert_eq!(parse_rating("4/5"), Some(4.0));
    assert_eq!(parse_rating(""), None);
    assert_eq!(parse_rating("great"), None);
}

#[test]
fn issues_follow_table_order() {
    let issues = extract_issues("The wifi was slow, the room was NOISY and a bit dusty.");
    assert_eq!(issues, vec!["cleanliness", "noise", "wifi"]);
    assert!(extract_issues("Wonderful stay, lovely hosts").is_empty());
}

#[test]
fn pearson_edge_cases() {
    assert_eq!(pearson(&[1.0], &[2.0]), None);
    assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);

    let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]).unwrap();
    assert!((r - 1.0).abs() < 1e-9);
    let r = pearson(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
    assert!((r + 1.0).abs() < 1e-9);
}

#[test]
fn review_export_summary() {
    let insights = analyze_upload("reviews.csv", &reviews_csv()).unwrap();

    assert_eq!(insights.total_reviews, 4);
    assert_eq!(insights.rated_reviews, 4);
    assert_eq!(insights.average_rating, Some(7.25));

    assert_eq!(insights.months.len(), 2);
    assert_eq!(insights.months[0].month, "2026-01");
    assert_eq!(insights.months[0].reviews, 2);
    assert_eq!(insights.months[0].average_rating, Some(7.5));
    assert_eq!(insights.months[1].month, "2026-02");
    assert_eq!(insights.months[1].issues.get("hot water"), Some(&1));

    assert_eq!(insights.issues[0].issue, "noise");
    assert_eq!(insights.issues[0].mentions, 2);
    assert_eq!(insights.issues[0].share, 0.5);
    let names: Vec<&str> = insights.issues.iter().map(|i| i.issue.as_str()).collect();
    assert_eq!(names, vec!["noise", "cleanliness", "hot water", "wifi"]);

    let r = insights.issue_rating_correlation.unwrap();
    assert!(r < -0.9, "expected strong negative correlation, got {r}");
}

#[test]
fn empty_review_export_is_rejected() {
    let err = analyze_upload("reviews.csv", b"Date,Rating,Review\n").unwrap_err();
    assert!(matches!(err, AppError::EmptyFile));
}
