// src/routes.rs

use axum::{
    Extension, Router,
    http::{HeaderValue, Method},
    middleware,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    handlers::{results, review, submission},
    models::test::TestKind,
    state::AppState,
    utils::jwt::{auth_middleware, reviewer_middleware},
};

/// Routes of one test kind. Quizzes and proficiency tests share handlers;
/// the kind reaches them as an extension.
fn test_routes(state: &AppState, kind: TestKind) -> Router<AppState> {
    let taker_routes = Router::new()
        .route("/{id}", get(submission::take_test))
        .route("/{id}/submit", post(submission::submit_test));

    let reviewer_routes = Router::new()
        .route("/{id}/answers", get(review::list_answers))
        .route("/{id}/essay-scores", post(review::score_essays))
        .route("/{id}/results", get(review::list_results))
        .layer(middleware::from_fn(reviewer_middleware));

    // Auth first, then the reviewer check on the reviewer subset
    taker_routes
        .merge(reviewer_routes)
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(Extension(kind))
}

/// Assembles the main application router.
///
/// * Nests the quiz and proficiency-test route families.
/// * Applies global middleware (Trace, CORS).
/// * Injects global state (store, config).
pub fn create_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let me_routes = Router::new()
        .route("/results", get(results::my_results))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api/quizzes", test_routes(&state, TestKind::Quiz))
        .nest("/api/proficiency-tests", test_routes(&state, TestKind::Proficiency))
        .nest("/api/me", me_routes)
        // Global Middleware (applied from top to bottom)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
