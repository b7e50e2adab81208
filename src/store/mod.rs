// src/store/mod.rs

//! Persistence seam for grading.
//!
//! Handlers only talk to `GradingStore`; the Postgres implementation lives
//! in `postgres`. Every write method is atomic on its own.

pub mod postgres;

use async_trait::async_trait;

use crate::{
    error::AppError,
    grading::GradedSubmission,
    models::{
        answer::SubmittedAnswer,
        question::Question,
        result::{ResultRecord, ResultSummary},
        test::{TestInstance, TestKind},
    },
};

pub use postgres::PgGradingStore;

#[async_trait]
pub trait GradingStore: Send + Sync {
    /// Looks up a test, only if it is of the requested kind.
    async fn find_test(&self, kind: TestKind, test_id: i64) -> Result<Option<TestInstance>, AppError>;

    /// Questions of a test in display order.
    async fn questions_for_test(&self, test_id: i64) -> Result<Vec<Question>, AppError>;

    /// Fast pre-check; the real guard is `record_submission`.
    async fn result_exists(&self, user_id: i64, test_id: i64) -> Result<bool, AppError>;

    /// Writes the result and all answer rows of a submission, or nothing.
    ///
    /// Fails with `AppError::DuplicateSubmission` when a result already
    /// exists for the (user, test) pair, including when a concurrent
    /// submission got there first.
    async fn record_submission(&self, submission: &GradedSubmission) -> Result<ResultRecord, AppError>;

    /// All submitted answers of a test, ordered by user then question.
    async fn answers_for_test(&self, test_id: i64) -> Result<Vec<SubmittedAnswer>, AppError>;

    /// Sets manual scores on answers of a test, then upserts the result of
    /// every affected submitter with `score = Σ answer scores` and the given
    /// `total_points`. Unknown answer ids abort the whole operation.
    async fn apply_essay_scores(
        &self,
        test_id: i64,
        scores: &[(i64, i32)],
        total_points: i32,
    ) -> Result<Vec<ResultRecord>, AppError>;

    async fn results_for_test(&self, test_id: i64) -> Result<Vec<ResultRecord>, AppError>;

    /// Every result of a user, with test metadata, newest test first.
    async fn results_for_user(&self, user_id: i64) -> Result<Vec<ResultSummary>, AppError>;
}
