//! Rating API endpoints.

use axum::extract::{Path, State};

use super::{created, success, ApiResult, AppJson};
use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::{validate_rating_value, RateBusinessRequest, Rating, RatingOutcome};
use crate::AppState;

/// POST /api/businesses/:id/ratings - Add or replace the acting user's rating.
pub async fn rate_business(
    State(state): State<AppState>,
    actor: Actor,
    Path(business_id): Path<String>,
    AppJson(request): AppJson<RateBusinessRequest>,
) -> ApiResult<RatingOutcome> {
    let value = request
        .value
        .ok_or_else(|| AppError::Validation("Rating value is required".to_string()))?;
    validate_rating_value(value).map_err(AppError::Validation)?;

    let outcome = state
        .repo
        .upsert_rating(&business_id, &actor.id, value)
        .await?;
    created(outcome)
}

/// GET /api/businesses/:id/ratings/:user_id - Get one user's rating.
pub async fn get_rating(
    State(state): State<AppState>,
    Path((business_id, user_id)): Path<(String, String)>,
) -> ApiResult<Rating> {
    match state.repo.get_rating(&business_id, &user_id).await? {
        Some(rating) => success(rating),
        None => Err(AppError::NotFound(format!(
            "Rating by {} for business {} not found",
            user_id, business_id
        ))),
    }
}
