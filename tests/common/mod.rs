// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use gradebook::{
    config::Config,
    error::AppError,
    grading::GradedSubmission,
    models::{
        answer::SubmittedAnswer,
        question::{AnswerKey, Question, QuestionType},
        result::{ResultRecord, ResultSummary, percentage},
        test::{TestInstance, TestKind},
    },
    routes,
    state::AppState,
    store::GradingStore,
    utils::jwt::sign_jwt,
};

pub const TEST_SECRET: &str = "test_secret_for_integration_tests";

#[derive(Default)]
struct Tables {
    next_id: i64,
    tests: Vec<TestInstance>,
    questions: Vec<Question>,
    answers: Vec<SubmittedAnswer>,
    results: Vec<ResultRecord>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-memory `GradingStore` for driving the router without Postgres.
/// Each method holds the lock for its whole body, so writes are atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn add_test(&self, kind: TestKind, title: &str) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        t.tests.push(TestInstance {
            id,
            kind,
            title: title.to_string(),
            due_date: None,
        });
        id
    }

    pub fn add_question(
        &self,
        test_id: i64,
        question_type: QuestionType,
        answer_key: AnswerKey,
        points: i32,
    ) -> i64 {
        let mut t = self.tables.lock().unwrap();
        let id = t.next_id();
        let position = t.questions.iter().filter(|q| q.test_id == test_id).count() as i32;
        t.questions.push(Question {
            id,
            test_id,
            position,
            question_type,
            content: format!("Question {}", id),
            options: None,
            answer_key,
            points,
        });
        id
    }

    pub fn answers_of(&self, user_id: i64, test_id: i64) -> Vec<SubmittedAnswer> {
        let t = self.tables.lock().unwrap();
        t.answers
            .iter()
            .filter(|a| a.user_id == user_id && a.test_id == test_id)
            .cloned()
            .collect()
    }

    pub fn results_of(&self, user_id: i64, test_id: i64) -> Vec<ResultRecord> {
        let t = self.tables.lock().unwrap();
        t.results
            .iter()
            .filter(|r| r.user_id == user_id && r.test_id == test_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl GradingStore for MemoryStore {
    async fn find_test(&self, kind: TestKind, test_id: i64) -> Result<Option<TestInstance>, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.tests.iter().find(|x| x.id == test_id && x.kind == kind).cloned())
    }

    async fn questions_for_test(&self, test_id: i64) -> Result<Vec<Question>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut questions: Vec<Question> =
            t.questions.iter().filter(|q| q.test_id == test_id).cloned().collect();
        questions.sort_by_key(|q| (q.position, q.id));
        Ok(questions)
    }

    async fn result_exists(&self, user_id: i64, test_id: i64) -> Result<bool, AppError> {
        let t = self.tables.lock().unwrap();
        Ok(t.results.iter().any(|r| r.user_id == user_id && r.test_id == test_id))
    }

    async fn record_submission(&self, submission: &GradedSubmission) -> Result<ResultRecord, AppError> {
        let mut t = self.tables.lock().unwrap();
        if t
            .results
            .iter()
            .any(|r| r.user_id == submission.user_id && r.test_id == submission.test_id)
        {
            return Err(AppError::DuplicateSubmission(
                "You already submitted this test.".to_string(),
            ));
        }

        let record = ResultRecord {
            id: t.next_id(),
            user_id: submission.user_id,
            test_id: submission.test_id,
            score: submission.score,
            total_points: submission.total_points,
        };
        t.results.push(record.clone());

        for graded in &submission.answers {
            let id = t.next_id();
            t.answers.push(SubmittedAnswer {
                id,
                user_id: submission.user_id,
                test_id: submission.test_id,
                question_id: graded.question_id,
                answer: graded.answer.clone(),
                is_correct: graded.is_correct,
                score: graded.score,
            });
        }

        Ok(record)
    }

    async fn answers_for_test(&self, test_id: i64) -> Result<Vec<SubmittedAnswer>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut answers: Vec<SubmittedAnswer> =
            t.answers.iter().filter(|a| a.test_id == test_id).cloned().collect();
        answers.sort_by_key(|a| (a.user_id, a.question_id));
        Ok(answers)
    }

    async fn apply_essay_scores(
        &self,
        test_id: i64,
        scores: &[(i64, i32)],
        total_points: i32,
    ) -> Result<Vec<ResultRecord>, AppError> {
        let mut t = self.tables.lock().unwrap();

        for (answer_id, _) in scores {
            if !t.answers.iter().any(|a| a.id == *answer_id && a.test_id == test_id) {
                return Err(AppError::NotFound(format!(
                    "Answer {} not found for this test",
                    answer_id
                )));
            }
        }

        let mut users = BTreeSet::new();
        for (answer_id, score) in scores {
            if let Some(answer) = t.answers.iter_mut().find(|a| a.id == *answer_id) {
                answer.score = *score;
                users.insert(answer.user_id);
            }
        }

        let mut records = Vec::new();
        for user_id in users {
            let score: i32 = t
                .answers
                .iter()
                .filter(|a| a.user_id == user_id && a.test_id == test_id)
                .map(|a| a.score)
                .sum();

            let existing = t
                .results
                .iter_mut()
                .find(|r| r.user_id == user_id && r.test_id == test_id)
                .map(|r| {
                    r.score = score;
                    r.total_points = total_points;
                    r.clone()
                });

            let record = match existing {
                Some(record) => record,
                None => {
                    let record = ResultRecord {
                        id: t.next_id(),
                        user_id,
                        test_id,
                        score,
                        total_points,
                    };
                    t.results.push(record.clone());
                    record
                }
            };
            records.push(record);
        }

        Ok(records)
    }

    async fn results_for_test(&self, test_id: i64) -> Result<Vec<ResultRecord>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut results: Vec<ResultRecord> =
            t.results.iter().filter(|r| r.test_id == test_id).cloned().collect();
        results.sort_by_key(|r| r.user_id);
        Ok(results)
    }

    async fn results_for_user(&self, user_id: i64) -> Result<Vec<ResultSummary>, AppError> {
        let t = self.tables.lock().unwrap();
        let mut summaries: Vec<ResultSummary> = t
            .results
            .iter()
            .filter(|r| r.user_id == user_id)
            .filter_map(|r| {
                let test = t.tests.iter().find(|x| x.id == r.test_id)?;
                Some(ResultSummary {
                    user_id: r.user_id,
                    test_id: r.test_id,
                    kind: test.kind,
                    title: test.title.clone(),
                    score: r.score,
                    total_points: r.total_points,
                    percentage: percentage(r.score, r.total_points),
                })
            })
            .collect();
        summaries.sort_by_key(|s| std::cmp::Reverse(s.test_id));
        Ok(summaries)
    }
}

pub struct TestApp {
    pub address: String,
    pub store: Arc<MemoryStore>,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn token(&self, user_id: i64, role: &str) -> String {
        sign_jwt(user_id, role, TEST_SECRET, 600).expect("sign token")
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn post_json(
        &self,
        path: &str,
        token: &str,
        body: &serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .expect("Failed to execute request")
    }
}

/// Spawns the app on a random port, backed by a fresh in-memory store.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::default());

    let config = Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_dir: "logs".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
    };

    let state = AppState {
        store: store.clone(),
        config,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        store,
        client: reqwest::Client::new(),
    }
}

/// Quiz with a multiple_choice (key "B"), a checkboxes (key ["X","Y"]) and
/// an essay question worth `essay_points`. Returns (test id, question ids).
pub fn seed_mixed_test(store: &MemoryStore, kind: TestKind, essay_points: i32) -> (i64, [i64; 3]) {
    let test_id = store.add_test(kind, "Mixed");
    let mc = store.add_question(
        test_id,
        QuestionType::MultipleChoice,
        AnswerKey::Single("B".to_string()),
        1,
    );
    let cb = store.add_question(
        test_id,
        QuestionType::Checkboxes,
        AnswerKey::Set(vec!["X".to_string(), "Y".to_string()]),
        1,
    );
    let essay = store.add_question(test_id, QuestionType::Essay, AnswerKey::Manual, essay_points);
    (test_id, [mc, cb, essay])
}
