// src/grading/manual.rs

use std::collections::HashMap;

use crate::models::{answer::SubmittedAnswer, question::Question};

/// Checks a reviewer's essay scores against the test before anything is
/// written.
///
/// Every answer must belong to the test and answer an essay question, and
/// every score must lie within that question's rubric. Returns the scores
/// ordered by answer id.
pub fn plan_essay_scores(
    questions: &[Question],
    answers: &[SubmittedAnswer],
    scores: &HashMap<i64, i32>,
) -> Result<Vec<(i64, i32)>, String> {
    let questions: HashMap<i64, &Question> = questions.iter().map(|q| (q.id, q)).collect();
    let answers: HashMap<i64, &SubmittedAnswer> = answers.iter().map(|a| (a.id, a)).collect();

    let mut planned = Vec::with_capacity(scores.len());
    for (answer_id, score) in scores {
        let answer = answers
            .get(answer_id)
            .ok_or_else(|| format!("answer {} does not belong to this test", answer_id))?;

        let question = questions
            .get(&answer.question_id)
            .ok_or_else(|| format!("answer {} has no question in this test", answer_id))?;

        if question.question_type.is_auto_graded() {
            return Err(format!(
                "answer {} is a {} answer and is graded automatically",
                answer_id, question.question_type
            ));
        }

        if *score < 0 || *score > question.max_points() {
            return Err(format!(
                "score {} for answer {} must be between 0 and {}",
                score,
                answer_id,
                question.max_points()
            ));
        }

        planned.push((*answer_id, *score));
    }

    planned.sort_unstable();
    Ok(planned)
}
