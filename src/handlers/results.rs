// src/handlers/results.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};

use crate::{
    error::AppError,
    models::result::{MyResultsResponse, round2},
    state::SharedStore,
    utils::jwt::Claims,
};

/// Retrieves the caller's own results across all tests, with the average
/// percentage.
pub async fn my_results(
    State(store): State<SharedStore>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let results = store.results_for_user(user_id).await?;

    let average = if results.is_empty() {
        0.0
    } else {
        round2(results.iter().map(|r| r.percentage).sum::<f64>() / results.len() as f64)
    };

    Ok(Json(MyResultsResponse { results, average }))
}
