//! User API endpoints.

use axum::extract::{Path, State};

use super::{created, success, ApiResult, AppJson};
use crate::auth::{hash_password_blocking, verify_password_blocking, Actor};
use crate::errors::AppError;
use crate::models::{
    Business, FollowStatus, LoginRequest, RegisterRequest, SaveStatus, UpdateProfileRequest,
    User, UserProfilePage,
};
use crate::AppState;

/// POST /api/users/register - Register a new user.
pub async fn register_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> ApiResult<User> {
    let username = request.username.trim();
    let email = request.email.trim();
    if username.is_empty() || email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation("All fields are required".to_string()));
    }

    let password_hash = hash_password_blocking(request.password).await?;
    created(state.repo.create_user(username, email, &password_hash).await?)
}

/// POST /api/users/login - Check credentials and return the user's own profile.
pub async fn login_user(
    State(state): State<AppState>,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<User> {
    let invalid = || AppError::Unauthorized("Invalid email or password".to_string());

    let (id, password_hash) = state
        .repo
        .find_credentials(request.email.trim())
        .await?
        .ok_or_else(invalid)?;

    if !verify_password_blocking(request.password, password_hash).await? {
        tracing::debug!(user_id = %id, "Rejected login");
        return Err(invalid());
    }

    match state.repo.get_user(&id).await? {
        Some(user) => success(user),
        None => Err(invalid()),
    }
}

/// GET /api/users - List all users (public view).
pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<User>> {
    let users = state.repo.list_users().await?;
    success(users.into_iter().map(User::into_public).collect())
}

/// GET /api/users/:username - Public profile with the user's businesses.
pub async fn get_user_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> ApiResult<UserProfilePage> {
    let user = state
        .repo
        .get_user_by_username(&username)
        .await?
        .ok_or_else(|| AppError::not_found("User", &username))?;

    let businesses = state.repo.list_businesses_by_owner(&user.id).await?;
    success(UserProfilePage {
        user: user.into_public(),
        businesses,
    })
}

/// GET /api/users/profile/posts - Businesses owned by the acting user.
pub async fn get_own_posts(State(state): State<AppState>, actor: Actor) -> ApiResult<Vec<Business>> {
    success(state.repo.list_businesses_by_owner(&actor.id).await?)
}

/// GET /api/users/profile/saved - Businesses saved by the acting user.
pub async fn get_saved_businesses(
    State(state): State<AppState>,
    actor: Actor,
) -> ApiResult<Vec<Business>> {
    success(state.repo.list_saved_businesses(&actor.id).await?)
}

/// PUT /api/users/profile - Update the acting user's bio and picture.
pub async fn update_profile(
    State(state): State<AppState>,
    actor: Actor,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> ApiResult<User> {
    success(state.repo.update_profile(&actor.id, &request).await?)
}

/// PUT /api/users/:user_id/follow - Follow or unfollow a user.
pub async fn follow_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<String>,
) -> ApiResult<FollowStatus> {
    success(state.repo.toggle_follow(&actor.id, &user_id).await?)
}

/// PUT /api/users/:user_id/unfollow - Stop following a user.
pub async fn unfollow_user(
    State(state): State<AppState>,
    actor: Actor,
    Path(user_id): Path<String>,
) -> ApiResult<FollowStatus> {
    success(state.repo.unfollow(&actor.id, &user_id).await?)
}

/// PUT /api/users/save/:business_id - Save or unsave a business.
pub async fn save_business(
    State(state): State<AppState>,
    actor: Actor,
    Path(business_id): Path<String>,
) -> ApiResult<SaveStatus> {
    success(state.repo.toggle_save(&actor.id, &business_id).await?)
}

/// PUT /api/users/unsave/:business_id - Remove a saved business.
pub async fn unsave_business(
    State(state): State<AppState>,
    actor: Actor,
    Path(business_id): Path<String>,
) -> ApiResult<SaveStatus> {
    success(state.repo.unsave(&actor.id, &business_id).await?)
}
