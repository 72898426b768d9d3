//! Comment API endpoints.

use axum::extract::{Path, State};

use super::{created, require_text, success, ApiResult, AppJson};
use crate::auth::Actor;
use crate::errors::AppError;
use crate::models::{Comment, CreateCommentRequest};
use crate::AppState;

/// GET /api/businesses/:id/comments - List comments of a business.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(business_id): Path<String>,
) -> ApiResult<Vec<Comment>> {
    if state.repo.get_business(&business_id).await?.is_none() {
        return Err(AppError::not_found("Business", &business_id));
    }

    success(state.repo.list_comments(&business_id).await?)
}

/// POST /api/businesses/:id/comments - Add a comment as the acting user.
pub async fn add_comment(
    State(state): State<AppState>,
    actor: Actor,
    Path(business_id): Path<String>,
    AppJson(request): AppJson<CreateCommentRequest>,
) -> ApiResult<Comment> {
    require_text(&request.text, "Comment text is required")?;

    let comment = state
        .repo
        .add_comment(&business_id, &actor.id, &actor.username, request.text.trim())
        .await?;
    created(comment)
}

/// GET /api/comments/:id - Get a single comment.
pub async fn get_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Comment> {
    match state.repo.get_comment(&id).await? {
        Some(comment) => success(comment),
        None => Err(AppError::not_found("Comment", &id)),
    }
}
