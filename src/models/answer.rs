// src/models/answer.rs

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use validator::Validate;

use crate::models::question::QuestionType;

/// A submitted value, decided once at the request boundary from the
/// question's type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    /// Free text for essay questions.
    Text(String),
    /// The selected/typed value of a single-answer question.
    Choice(String),
    /// The selected values of a checkbox question.
    MultiChoice(Vec<String>),
}

impl AnswerValue {
    /// Converts a raw JSON value into a typed answer.
    ///
    /// `Ok(None)` means the question was left unanswered.
    pub fn from_submission(question_type: QuestionType, raw: &Value) -> Result<Option<Self>, String> {
        if raw.is_null() {
            return Ok(None);
        }

        match question_type {
            QuestionType::Essay => match raw {
                Value::String(text) => Ok(Some(AnswerValue::Text(text.clone()))),
                _ => Err("essay answers must be text".to_string()),
            },
            QuestionType::Checkboxes => {
                let items = match raw {
                    Value::Array(items) => items.clone(),
                    Value::String(encoded) => serde_json::from_str::<Vec<Value>>(encoded)
                        .map_err(|_| "checkbox answers must be a list".to_string())?,
                    _ => return Err("checkbox answers must be a list".to_string()),
                };
                items
                    .iter()
                    .map(|item| scalar_text(item).ok_or_else(|| "checkbox answers must be a list of values".to_string()))
                    .collect::<Result<Vec<_>, _>>()
                    .map(|values| Some(AnswerValue::MultiChoice(values)))
            }
            QuestionType::MultipleChoice | QuestionType::TrueFalse | QuestionType::FillInBlank => {
                scalar_text(raw)
                    .map(|value| Some(AnswerValue::Choice(value)))
                    .ok_or_else(|| format!("{} answers must be a single value", question_type))
            }
        }
    }

    /// Text form persisted in `submitted_answers.answer`.
    /// Checkbox selections are stored as a JSON-encoded list.
    pub fn to_stored(&self) -> String {
        match self {
            AnswerValue::Text(text) | AnswerValue::Choice(text) => text.clone(),
            AnswerValue::MultiChoice(values) => {
                Value::Array(values.iter().cloned().map(Value::String).collect()).to_string()
            }
        }
    }
}

/// Text form of a JSON scalar. Strings pass through, booleans and numbers
/// are rendered; everything else has no scalar form.
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Represents the 'submitted_answers' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub id: i64,
    pub user_id: i64,
    pub test_id: i64,
    pub question_id: i64,
    pub answer: Option<String>,
    /// `None` only for essay answers that are waiting for a reviewer.
    pub is_correct: Option<bool>,
    pub score: i32,
}

/// Answer row joined with its question, for the essay scoring screen.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerReview {
    pub id: i64,
    pub user_id: i64,
    pub question_id: i64,
    pub question: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub answer: Option<String>,
    pub is_correct: Option<bool>,
    pub score: i32,
    pub max_points: i32,
}

/// DTO for submitting a test attempt.
/// An empty map is a valid submission: every question is unanswered.
#[derive(Debug, Deserialize)]
pub struct SubmitAnswersRequest {
    /// Key: Question ID. Value: a string, a list of strings, or null.
    pub answers: HashMap<i64, Value>,
}

/// DTO for a reviewer assigning essay scores.
#[derive(Debug, Deserialize, Validate)]
pub struct EssayScoresRequest {
    /// Key: submitted answer ID. Value: awarded points.
    #[validate(custom(function = validate_scores))]
    pub scores: HashMap<i64, i32>,
}

fn validate_scores(scores: &HashMap<i64, i32>) -> Result<(), validator::ValidationError> {
    if scores.is_empty() {
        return Err(validator::ValidationError::new("no_scores_submitted"));
    }
    if scores.values().any(|s| *s < 0) {
        return Err(validator::ValidationError::new("score_cannot_be_negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checkbox_answer_accepts_list_or_encoded_list() {
        let expected = Some(AnswerValue::MultiChoice(vec!["b".to_string(), "a".to_string()]));
        assert_eq!(AnswerValue::from_submission(QuestionType::Checkboxes, &json!(["b", "a"])), Ok(expected.clone()));
        assert_eq!(
            AnswerValue::from_submission(QuestionType::Checkboxes, &json!("[\"b\",\"a\"]")),
            Ok(expected)
        );
    }

    #[test]
    fn test_null_is_unanswered() {
        for t in [QuestionType::Essay, QuestionType::Checkboxes, QuestionType::MultipleChoice] {
            assert_eq!(AnswerValue::from_submission(t, &Value::Null), Ok(None));
        }
    }

    #[test]
    fn test_true_false_accepts_booleans() {
        assert_eq!(
            AnswerValue::from_submission(QuestionType::TrueFalse, &json!(false)),
            Ok(Some(AnswerValue::Choice("false".to_string())))
        );
    }

    #[test]
    fn test_shape_mismatches_are_rejected() {
        assert!(AnswerValue::from_submission(QuestionType::MultipleChoice, &json!(["A"])).is_err());
        assert!(AnswerValue::from_submission(QuestionType::Checkboxes, &json!("A")).is_err());
        assert!(AnswerValue::from_submission(QuestionType::Essay, &json!({"text": "x"})).is_err());
        assert!(AnswerValue::from_submission(QuestionType::Checkboxes, &json!([["nested"]])).is_err());
    }

    #[test]
    fn test_checkbox_selection_is_stored_as_json_list() {
        let value = AnswerValue::MultiChoice(vec!["Y".to_string(), "X".to_string()]);
        assert_eq!(value.to_stored(), r#"["Y","X"]"#);
    }

    #[test]
    fn test_empty_answer_map_deserializes() {
        let req: SubmitAnswersRequest = serde_json::from_value(json!({ "answers": {} })).unwrap();
        assert!(req.answers.is_empty());
    }

    #[test]
    fn test_negative_essay_score_fails_validation() {
        let req = EssayScoresRequest { scores: HashMap::from([(1, -2)]) };
        assert!(req.validate().is_err());
    }
}
