// src/store/postgres.rs

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};

use crate::{
    error::AppError,
    grading::GradedSubmission,
    models::{
        answer::SubmittedAnswer,
        question::{AnswerKey, Question, QuestionType},
        result::{ResultRecord, ResultSummary, percentage},
        test::{TestInstance, TestKind},
    },
    store::GradingStore,
};

/// Raw row of the 'tests' table.
#[derive(FromRow)]
struct TestRow {
    id: i64,
    kind: String,
    title: String,
    due_date: Option<chrono::DateTime<chrono::Utc>>,
}

impl TryFrom<TestRow> for TestInstance {
    type Error = AppError;

    fn try_from(row: TestRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<TestKind>()
            .map_err(|e| AppError::InternalServerError(format!("test {}: {}", row.id, e)))?;

        Ok(TestInstance {
            id: row.id,
            kind,
            title: row.title,
            due_date: row.due_date,
        })
    }
}

/// Raw row of the 'questions' table. The stored key is decoded into an
/// `AnswerKey` when converted.
#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    test_id: i64,
    position: i32,
    #[sqlx(rename = "type")]
    question_type: String,
    content: String,
    options: Option<Json<Vec<String>>>,
    answer_key: Option<Json<Value>>,
    points: i32,
}

impl TryFrom<QuestionRow> for Question {
    type Error = AppError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| AppError::InternalServerError(format!("question {}: {}", row.id, e));

        let question_type = row.question_type.parse::<QuestionType>().map_err(corrupt)?;
        let answer_key =
            AnswerKey::decode(question_type, row.answer_key.as_ref().map(|k| &k.0)).map_err(corrupt)?;

        Ok(Question {
            id: row.id,
            test_id: row.test_id,
            position: row.position,
            question_type,
            content: row.content,
            options: row.options.map(|o| o.0),
            answer_key,
            points: row.points,
        })
    }
}

/// Result row joined with its test.
#[derive(FromRow)]
struct ResultWithTestRow {
    user_id: i64,
    test_id: i64,
    kind: String,
    title: String,
    score: i32,
    total_points: i32,
}

#[derive(Clone)]
pub struct PgGradingStore {
    pool: PgPool,
}

impl PgGradingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl GradingStore for PgGradingStore {
    async fn find_test(&self, kind: TestKind, test_id: i64) -> Result<Option<TestInstance>, AppError> {
        let row = sqlx::query_as::<_, TestRow>(
            "SELECT id, kind, title, due_date FROM tests WHERE id = $1 AND kind = $2",
        )
        .bind(test_id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch test {}: {:?}", test_id, e);
            AppError::from(e)
        })?;

        row.map(TestInstance::try_from).transpose()
    }

    async fn questions_for_test(&self, test_id: i64) -> Result<Vec<Question>, AppError> {
        let rows = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, test_id, position, type, content, options, answer_key, points
            FROM questions
            WHERE test_id = $1
            ORDER BY position, id
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch questions for test {}: {:?}", test_id, e);
            AppError::from(e)
        })?;

        rows.into_iter().map(Question::try_from).collect()
    }

    async fn result_exists(&self, user_id: i64, test_id: i64) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM results WHERE user_id = $1 AND test_id = $2)",
        )
        .bind(user_id)
        .bind(test_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn record_submission(&self, submission: &GradedSubmission) -> Result<ResultRecord, AppError> {
        let mut tx = self.pool.begin().await?;

        // The unique (user_id, test_id) constraint is the duplicate guard.
        let inserted = sqlx::query_as::<_, ResultRecord>(
            r#"
            INSERT INTO results (user_id, test_id, score, total_points)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, test_id) DO NOTHING
            RETURNING id, user_id, test_id, score, total_points
            "#,
        )
        .bind(submission.user_id)
        .bind(submission.test_id)
        .bind(submission.score)
        .bind(submission.total_points)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert result: {:?}", e);
            AppError::from(e)
        })?;

        let Some(record) = inserted else {
            tx.rollback().await?;
            return Err(AppError::DuplicateSubmission(
                "You already submitted this test.".to_string(),
            ));
        };

        if !submission.answers.is_empty() {
            let mut query_builder = QueryBuilder::<Postgres>::new(
                "INSERT INTO submitted_answers (user_id, test_id, question_id, answer, is_correct, score) ",
            );
            query_builder.push_values(&submission.answers, |mut row, answer| {
                row.push_bind(submission.user_id)
                    .push_bind(submission.test_id)
                    .push_bind(answer.question_id)
                    .push_bind(answer.answer.clone())
                    .push_bind(answer.is_correct)
                    .push_bind(answer.score);
            });

            query_builder
                .build()
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        AppError::DuplicateSubmission("You already submitted this test.".to_string())
                    } else {
                        tracing::error!("Failed to insert submitted answers: {:?}", e);
                        AppError::from(e)
                    }
                })?;
        }

        tx.commit().await?;

        Ok(record)
    }

    async fn answers_for_test(&self, test_id: i64) -> Result<Vec<SubmittedAnswer>, AppError> {
        let answers = sqlx::query_as::<_, SubmittedAnswer>(
            r#"
            SELECT id, user_id, test_id, question_id, answer, is_correct, score
            FROM submitted_answers
            WHERE test_id = $1
            ORDER BY user_id, question_id
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(answers)
    }

    async fn apply_essay_scores(
        &self,
        test_id: i64,
        scores: &[(i64, i32)],
        total_points: i32,
    ) -> Result<Vec<ResultRecord>, AppError> {
        let mut tx = self.pool.begin().await?;
        let mut users = BTreeSet::new();

        for (answer_id, score) in scores {
            let user_id: Option<i64> = sqlx::query_scalar(
                r#"
                UPDATE submitted_answers
                SET score = $1, updated_at = CURRENT_TIMESTAMP
                WHERE id = $2 AND test_id = $3
                RETURNING user_id
                "#,
            )
            .bind(score)
            .bind(answer_id)
            .bind(test_id)
            .fetch_optional(&mut *tx)
            .await?;

            // Dropping `tx` rolls back the scores already written.
            let user_id = user_id.ok_or_else(|| {
                AppError::NotFound(format!("Answer {} not found for this test", answer_id))
            })?;
            users.insert(user_id);
        }

        let mut records = Vec::with_capacity(users.len());
        for user_id in users {
            let record = sqlx::query_as::<_, ResultRecord>(
                r#"
                INSERT INTO results (user_id, test_id, score, total_points)
                SELECT $1, $2, COALESCE(SUM(score), 0)::INTEGER, $3
                FROM submitted_answers
                WHERE user_id = $1 AND test_id = $2
                ON CONFLICT (user_id, test_id) DO UPDATE SET
                    score = EXCLUDED.score,
                    total_points = EXCLUDED.total_points,
                    updated_at = CURRENT_TIMESTAMP
                RETURNING id, user_id, test_id, score, total_points
                "#,
            )
            .bind(user_id)
            .bind(test_id)
            .bind(total_points)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                tracing::error!("Failed to upsert result for user {}: {:?}", user_id, e);
                AppError::from(e)
            })?;
            records.push(record);
        }

        tx.commit().await?;

        Ok(records)
    }

    async fn results_for_test(&self, test_id: i64) -> Result<Vec<ResultRecord>, AppError> {
        let results = sqlx::query_as::<_, ResultRecord>(
            r#"
            SELECT id, user_id, test_id, score, total_points
            FROM results
            WHERE test_id = $1
            ORDER BY user_id
            "#,
        )
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(results)
    }

    async fn results_for_user(&self, user_id: i64) -> Result<Vec<ResultSummary>, AppError> {
        let rows = sqlx::query_as::<_, ResultWithTestRow>(
            r#"
            SELECT r.user_id, r.test_id, t.kind, t.title, r.score, r.total_points
            FROM results r
            JOIN tests t ON t.id = r.test_id
            WHERE r.user_id = $1
            ORDER BY r.test_id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ResultSummary, AppError> {
                let kind = row.kind.parse::<TestKind>().map_err(AppError::InternalServerError)?;
                Ok(ResultSummary {
                    user_id: row.user_id,
                    test_id: row.test_id,
                    kind,
                    title: row.title,
                    score: row.score,
                    total_points: row.total_points,
                    percentage: percentage(row.score, row.total_points),
                })
            })
            .collect()
    }
}
