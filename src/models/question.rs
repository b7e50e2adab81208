// src/models/question.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::answer::scalar_text;

/// The five question types a test can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    Checkboxes,
    TrueFalse,
    Essay,
    FillInBlank,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::Checkboxes => "checkboxes",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Essay => "essay",
            QuestionType::FillInBlank => "fill_in_blank",
        }
    }

    /// Essay questions wait for a reviewer; everything else is graded on submit.
    pub fn is_auto_graded(&self) -> bool {
        !matches!(self, QuestionType::Essay)
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QuestionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "multiple_choice" => Ok(QuestionType::MultipleChoice),
            "checkboxes" => Ok(QuestionType::Checkboxes),
            "true_false" => Ok(QuestionType::TrueFalse),
            "essay" => Ok(QuestionType::Essay),
            "fill_in_blank" => Ok(QuestionType::FillInBlank),
            other => Err(format!("unknown question type '{}'", other)),
        }
    }
}

/// Canonical correct value(s) of a question, decoded from the stored JSON.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerKey {
    /// multiple_choice, true_false and fill_in_blank.
    Single(String),
    /// checkboxes.
    Set(Vec<String>),
    /// essay: graded by a reviewer.
    Manual,
}

impl AnswerKey {
    /// Decodes a stored key for the given question type.
    ///
    /// Checkbox keys may be stored either as a JSON array or as a string
    /// holding a JSON-encoded array.
    pub fn decode(question_type: QuestionType, raw: Option<&Value>) -> Result<Self, String> {
        let raw = raw.filter(|v| !v.is_null());

        match question_type {
            QuestionType::Essay => Ok(AnswerKey::Manual),
            QuestionType::Checkboxes => {
                let raw = raw.ok_or("checkbox question has no answer key")?;
                let items = match raw {
                    Value::Array(items) => items.clone(),
                    Value::String(encoded) => serde_json::from_str::<Vec<Value>>(encoded)
                        .map_err(|e| format!("checkbox key is not a list: {}", e))?,
                    _ => return Err("checkbox key must be a list".to_string()),
                };
                items
                    .iter()
                    .map(|item| scalar_text(item).ok_or("checkbox key holds a non-scalar item"))
                    .collect::<Result<Vec<_>, _>>()
                    .map(AnswerKey::Set)
                    .map_err(str::to_string)
            }
            _ => {
                let raw = raw.ok_or("question has no answer key")?;
                match raw {
                    // Keys saved through a JSON-array column come back wrapped.
                    Value::Array(items) if items.len() == 1 => scalar_text(&items[0])
                        .map(AnswerKey::Single)
                        .ok_or_else(|| "answer key must be a scalar".to_string()),
                    other => scalar_text(other)
                        .map(AnswerKey::Single)
                        .ok_or_else(|| "answer key must be a scalar".to_string()),
                }
            }
        }
    }
}

/// A question of a test, with its key decoded.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: i64,
    pub test_id: i64,
    pub position: i32,
    pub question_type: QuestionType,
    pub content: String,
    pub options: Option<Vec<String>>,
    pub answer_key: AnswerKey,
    /// Rubric maximum for essays. Ignored for auto-graded types.
    pub points: i32,
}

impl Question {
    /// Points this question contributes to a test's total.
    pub fn max_points(&self) -> i32 {
        if self.question_type.is_auto_graded() {
            1
        } else {
            self.points
        }
    }
}

/// DTO for sending a question to a test taker (excludes the answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuestion {
    pub id: i64,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub content: String,
    pub options: Option<Vec<String>>,
    pub points: i32,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        PublicQuestion {
            id: q.id,
            question_type: q.question_type,
            content: q.content.clone(),
            options: q.options.clone(),
            points: q.max_points(),
        }
    }
}
