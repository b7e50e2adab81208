// src/grading/compare.rs

use crate::models::{answer::AnswerValue, question::AnswerKey};

/// Trims surrounding whitespace and lowercases, the form both sides of a
/// comparison are reduced to.
pub fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Single-answer comparison, case and whitespace insensitive.
pub fn matches_single(submitted: &str, key: &str) -> bool {
    normalize(submitted) == normalize(key)
}

/// Checkbox comparison. Order does not matter; duplicates do.
pub fn matches_set(submitted: &[String], key: &[String]) -> bool {
    let mut submitted: Vec<String> = submitted.iter().map(|v| normalize(v)).collect();
    let mut key: Vec<String> = key.iter().map(|v| normalize(v)).collect();
    submitted.sort();
    key.sort();
    submitted == key
}

/// Decides correctness of one answer against its key.
///
/// Returns `None` for manually graded questions. An absent answer, or one
/// whose shape does not fit the key, is incorrect.
pub fn is_correct(key: &AnswerKey, answer: Option<&AnswerValue>) -> Option<bool> {
    match key {
        AnswerKey::Manual => None,
        AnswerKey::Single(expected) => Some(match answer {
            Some(AnswerValue::Choice(value)) | Some(AnswerValue::Text(value)) => matches_single(value, expected),
            Some(AnswerValue::MultiChoice(_)) | None => false,
        }),
        AnswerKey::Set(expected) => Some(match answer {
            Some(AnswerValue::MultiChoice(values)) => matches_set(values, expected),
            Some(AnswerValue::Choice(_)) | Some(AnswerValue::Text(_)) | None => false,
        }),
    }
}
