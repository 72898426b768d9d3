//! Business API endpoints.

use axum::extract::{Path, Query, State};

use super::{created, success, ApiResult, AppJson};
use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::{
    Business, BusinessFilter, BusinessRemoval, CreateBusinessRequest, LikeStatus,
    ListBusinessesParams, UpdateBusinessRequest,
};
use crate::AppState;

/// GET /api/businesses - List businesses with keyword, rating and sort options.
pub async fn list_businesses(
    State(state): State<AppState>,
    Query(params): Query<ListBusinessesParams>,
) -> ApiResult<Vec<Business>> {
    let filter = BusinessFilter::from_params(&params).map_err(AppError::Validation)?;
    success(state.repo.list_businesses(&filter).await?)
}

/// GET /api/businesses/:id - Get a single business.
pub async fn get_business(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Business> {
    match state.repo.get_business(&id).await? {
        Some(business) => success(business),
        None => Err(AppError::not_found("Business", &id)),
    }
}

/// POST /api/businesses - Create a business owned by the acting user.
pub async fn create_business(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(request): AppJson<CreateBusinessRequest>,
) -> ApiResult<Business> {
    let missing = request.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::Validation(format!(
            "Please fill out all fields: {} missing",
            missing.join(", ")
        )));
    }

    created(state.repo.create_business(&actor.id, &request).await?)
}

/// PUT /api/businesses/:id - Update a business (owner only).
pub async fn update_business(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    AppJson(request): AppJson<UpdateBusinessRequest>,
) -> ApiResult<Business> {
    success(state.repo.update_business(&id, &actor.id, &request).await?)
}

/// DELETE /api/businesses/:id - Delete a business and its dependents (owner only).
pub async fn delete_business(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<BusinessRemoval> {
    success(state.repo.delete_business(&id, &actor.id).await?)
}

/// PUT /api/businesses/:id/like - Like or unlike a business.
pub async fn like_business(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> ApiResult<LikeStatus> {
    success(state.repo.toggle_like(&id, &actor.id).await?)
}
