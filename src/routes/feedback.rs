use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{FeedbackResponse, FeedbackSubmission},
    routes::AppState,
};

/// Handler for rating a recommended meal plan
pub async fn submit(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<FeedbackSubmission>, JsonRejection>,
) -> AppResult<Json<FeedbackResponse>> {
    let Json(submission) = payload?;

    tracing::info!(
        request_id = %request_id,
        user_id = %submission.user_id,
        lunch_ratings = submission.lunch.ratings.len(),
        dinner_ratings = submission.dinner.ratings.len(),
        "Processing feedback submission"
    );

    let saved = state.recommender.record_feedback(&submission).await?;

    Ok(Json(FeedbackResponse {
        status: "Ratings saved".to_string(),
        saved,
    }))
}
