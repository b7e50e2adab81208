// src/handlers/submission.rs

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};

use crate::{
    error::AppError,
    grading,
    models::{
        answer::SubmitAnswersRequest,
        question::PublicQuestion,
        result::SubmissionResponse,
        test::{TestInstance, TestKind, TestPaper},
    },
    state::SharedStore,
    store::GradingStore,
    utils::jwt::Claims,
};

/// Looks up a test of the given kind or fails with 404.
pub(crate) async fn load_test(
    store: &dyn GradingStore,
    kind: TestKind,
    test_id: i64,
) -> Result<TestInstance, AppError> {
    store
        .find_test(kind, test_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} {} not found", kind, test_id)))
}

/// Opens a test for the caller.
///
/// Returns the questions without their answer keys. A caller who already
/// has a result for the test is turned away with 409.
pub async fn take_test(
    State(store): State<SharedStore>,
    Extension(kind): Extension<TestKind>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let test = load_test(store.as_ref(), kind, test_id).await?;

    if store.result_exists(user_id, test.id).await? {
        return Err(AppError::DuplicateSubmission(
            "You have already taken this test.".to_string(),
        ));
    }

    let questions = store.questions_for_test(test.id).await?;

    Ok(Json(TestPaper {
        id: test.id,
        kind: test.kind,
        title: test.title,
        due_date: test.due_date,
        total_points: grading::total_points(&questions).map_err(AppError::InternalServerError)?,
        questions: questions.iter().map(PublicQuestion::from).collect(),
    }))
}

/// Submits a user's answers for a test and grades them.
///
/// * Rejects a second submission for the same test with 409, before grading.
/// * Grades every question of the test in memory.
/// * Writes the result and the per-question answers in one transaction.
pub async fn submit_test(
    State(store): State<SharedStore>,
    Extension(kind): Extension<TestKind>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<i64>,
    payload: Result<Json<SubmitAnswersRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let user_id = claims.user_id()?;
    let test = load_test(store.as_ref(), kind, test_id).await?;

    if store.result_exists(user_id, test.id).await? {
        return Err(AppError::DuplicateSubmission(
            "You already submitted this test.".to_string(),
        ));
    }

    let questions = store.questions_for_test(test.id).await?;
    if questions.is_empty() {
        return Err(AppError::BadRequest("This test has no questions".to_string()));
    }

    let answers = grading::decode_answers(&questions, &req.answers).map_err(AppError::BadRequest)?;
    let graded = grading::grade_submission(user_id, test.id, &questions, &answers)
        .map_err(AppError::InternalServerError)?;

    let record = store.record_submission(&graded).await.inspect_err(|e| {
        if let AppError::DuplicateSubmission(_) = e {
            tracing::warn!("Concurrent duplicate submission by user {} for {} {}", user_id, kind, test.id);
        }
    })?;

    tracing::info!(
        "User {} submitted {} {}: {}/{}",
        user_id,
        kind,
        test.id,
        record.score,
        record.total_points
    );

    Ok(Json(SubmissionResponse {
        test_id: test.id,
        kind,
        score: record.score,
        total: record.total_points,
    }))
}
