use axum::{
    extract::{rejection::JsonRejection, State},
    Extension, Json,
};
use std::sync::Arc;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{RecommendationRequest, RecommendationResponse},
    routes::AppState,
};

/// Handler for the meal recommendation endpoint
pub async fn recommend(
    State(state): State<Arc<AppState>>,
    Extension(request_id): Extension<RequestId>,
    payload: Result<Json<RecommendationRequest>, JsonRejection>,
) -> AppResult<Json<RecommendationResponse>> {
    let Json(request) = payload?;
    let profile = request.profile.unwrap_or_default();
    let seed = request.seed.unwrap_or_else(|| request_id.seed());

    tracing::info!(
        request_id = %request_id,
        user_id = %request.user_id,
        preferred_categories = ?profile.preferred_categories,
        seed,
        "Processing recommendation request"
    );

    let plan = state
        .recommender
        .recommend(&request.user_id, &profile, seed)
        .await?;

    tracing::info!(request_id = %request_id, "Recommendation completed");

    Ok(Json(plan.into()))
}
