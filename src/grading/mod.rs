// src/grading/mod.rs

//! Answer grading and aggregation, shared by quizzes and proficiency tests.
//!
//! Everything here is pure: answers are decoded and graded in memory and
//! the caller persists the outcome in one transaction.

pub mod compare;
pub mod manual;

use std::collections::HashMap;

use serde_json::Value;

pub use manual::plan_essay_scores;

use crate::{
    models::{
        answer::AnswerValue,
        question::{Question, QuestionType},
    },
    utils::html::clean_html,
};

/// Outcome of grading one question for one submitter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedAnswer {
    pub question_id: i64,
    /// Stored text form of the answer; `None` when left unanswered.
    pub answer: Option<String>,
    pub is_correct: Option<bool>,
    pub score: i32,
}

/// A fully graded submission, ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradedSubmission {
    pub user_id: i64,
    pub test_id: i64,
    pub answers: Vec<GradedAnswer>,
    pub score: i32,
    pub total_points: i32,
}

/// Decodes raw submitted values against the test's questions.
///
/// Entries for questions that are not part of the test are skipped.
/// Essay text is sanitized since reviewers render it.
pub fn decode_answers(
    questions: &[Question],
    raw: &HashMap<i64, Value>,
) -> Result<HashMap<i64, AnswerValue>, String> {
    let by_id: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    let mut decoded = HashMap::with_capacity(raw.len());

    for (question_id, value) in raw {
        let Some(question) = by_id.get(question_id) else {
            tracing::debug!("Skipping answer for unknown question {}", question_id);
            continue;
        };

        let answer = AnswerValue::from_submission(question.question_type, value)
            .map_err(|e| format!("question {}: {}", question_id, e))?;

        if let Some(answer) = answer {
            let answer = match answer {
                AnswerValue::Text(text) if question.question_type == QuestionType::Essay => {
                    AnswerValue::Text(clean_html(&text))
                }
                other => other,
            };
            decoded.insert(*question_id, answer);
        }
    }

    Ok(decoded)
}

/// Grades a single question. Correct auto-graded answers earn 1 point;
/// essays start at 0 with correctness unset.
pub fn grade_question(question: &Question, answer: Option<&AnswerValue>) -> GradedAnswer {
    let is_correct = compare::is_correct(&question.answer_key, answer);
    let score = if is_correct == Some(true) { 1 } else { 0 };

    GradedAnswer {
        question_id: question.id,
        answer: answer.map(AnswerValue::to_stored),
        is_correct,
        score,
    }
}

/// Sum of the points every question of a test is worth.
/// Fails when the rubric adds up past what a result can hold.
pub fn total_points(questions: &[Question]) -> Result<i32, String> {
    questions
        .iter()
        .try_fold(0i32, |total, q| total.checked_add(q.max_points()))
        .ok_or_else(|| "test rubric exceeds the maximum total points".to_string())
}

/// Grades every question of a test, answered or not, and aggregates.
pub fn grade_submission(
    user_id: i64,
    test_id: i64,
    questions: &[Question],
    answers: &HashMap<i64, AnswerValue>,
) -> Result<GradedSubmission, String> {
    let total_points = total_points(questions)?;
    let graded: Vec<GradedAnswer> = questions
        .iter()
        .map(|q| grade_question(q, answers.get(&q.id)))
        .collect();

    let score = graded.iter().map(|a| a.score).sum();

    Ok(GradedSubmission {
        user_id,
        test_id,
        answers: graded,
        score,
        total_points,
    })
}
