// src/handlers/review.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
    response::IntoResponse,
};
use validator::Validate;

use crate::{
    error::AppError,
    grading,
    handlers::submission::load_test,
    models::{
        answer::{AnswerReview, EssayScoresRequest},
        question::Question,
        result::ResultSummary,
        test::TestKind,
    },
    state::SharedStore,
    utils::jwt::Claims,
};

/// Lists every submitted answer of a test with its question.
/// Reviewer only.
pub async fn list_answers(
    State(store): State<SharedStore>,
    Extension(kind): Extension<TestKind>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let test = load_test(store.as_ref(), kind, test_id).await?;

    let questions = store.questions_for_test(test.id).await?;
    let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();

    let answers: Vec<AnswerReview> = store
        .answers_for_test(test.id)
        .await?
        .into_iter()
        .filter_map(|a| {
            let question = by_id.get(&a.question_id)?;
            Some(AnswerReview {
                id: a.id,
                user_id: a.user_id,
                question_id: a.question_id,
                question: question.content.clone(),
                question_type: question.question_type,
                answer: a.answer,
                is_correct: a.is_correct,
                score: a.score,
                max_points: question.max_points(),
            })
        })
        .collect();

    Ok(Json(answers))
}

/// Stores reviewer-assigned essay scores and recomputes the affected results.
/// Reviewer only.
///
/// The recomputed total is the test's full rubric: one point per
/// auto-graded question plus each essay's maximum.
pub async fn score_essays(
    State(store): State<SharedStore>,
    Extension(kind): Extension<TestKind>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<i64>,
    payload: Result<Json<EssayScoresRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    req.validate()?;

    let test = load_test(store.as_ref(), kind, test_id).await?;
    let questions = store.questions_for_test(test.id).await?;
    let answers = store.answers_for_test(test.id).await?;

    let planned =
        grading::plan_essay_scores(&questions, &answers, &req.scores).map_err(AppError::BadRequest)?;
    let total_points = grading::total_points(&questions).map_err(AppError::InternalServerError)?;

    let results = store
        .apply_essay_scores(test.id, &planned, total_points)
        .await?;

    tracing::info!(
        "Reviewer {} scored {} essay answers on {} {}; {} results updated",
        claims.sub,
        planned.len(),
        kind,
        test.id,
        results.len()
    );

    Ok(Json(serde_json::json!({
        "updated": planned.len(),
        "results": results,
        "message": "Essay scores and results updated."
    })))
}

/// Lists the results of a test with percentages.
/// Reviewer only.
pub async fn list_results(
    State(store): State<SharedStore>,
    Extension(kind): Extension<TestKind>,
    Path(test_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let test = load_test(store.as_ref(), kind, test_id).await?;

    let results: Vec<ResultSummary> = store
        .results_for_test(test.id)
        .await?
        .into_iter()
        .map(|r| ResultSummary {
            user_id: r.user_id,
            test_id: r.test_id,
            kind: test.kind,
            title: test.title.clone(),
            score: r.score,
            total_points: r.total_points,
            percentage: r.percentage(),
        })
        .collect();

    Ok(Json(results))
}
