// src/models/result.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::test::TestKind;

/// Represents the 'results' table in the database.
/// One row per (user, test) pair.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct ResultRecord {
    pub id: i64,
    pub user_id: i64,
    pub test_id: i64,
    pub score: i32,
    pub total_points: i32,
}

impl ResultRecord {
    /// Score as a percentage of the total, rounded to two decimals.
    /// A zero total yields 0 rather than dividing by zero.
    pub fn percentage(&self) -> f64 {
        percentage(self.score, self.total_points)
    }
}

pub fn percentage(score: i32, total_points: i32) -> f64 {
    if total_points <= 0 {
        return 0.0;
    }
    round2(score as f64 / total_points as f64 * 100.0)
}

/// Rounds to two decimals, the precision reports are shown with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Result row with its test metadata and percentage, for listings.
#[derive(Debug, Clone, Serialize)]
pub struct ResultSummary {
    pub user_id: i64,
    pub test_id: i64,
    pub kind: TestKind,
    pub title: String,
    pub score: i32,
    pub total_points: i32,
    pub percentage: f64,
}

/// DTO returned after a successful submission.
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmissionResponse {
    pub test_id: i64,
    pub kind: TestKind,
    pub score: i32,
    pub total: i32,
}

/// DTO returned by `/api/me/results`.
#[derive(Debug, Serialize)]
pub struct MyResultsResponse {
    pub results: Vec<ResultSummary>,
    /// Mean of the per-test percentages; 0 when nothing has been taken.
    pub average: f64,
}
