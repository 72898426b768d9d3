//! Acting-user extraction.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::errors::AppError;
use crate::AppState;

/// Header carrying the authenticated user's id, set by the gateway.
pub const ACTOR_HEADER: &str = "x-actor-id";

/// The authenticated user a mutating request runs on behalf of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub username: String,
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(ACTOR_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no actor".to_string()))?;

        let username = state
            .repo
            .get_username(id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Not authorized, unknown actor".to_string()))?;

        Ok(Actor {
            id: id.to_string(),
            username,
        })
    }
}
