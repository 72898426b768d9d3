//! User models.

use serde::{Deserialize, Serialize};

/// Minimal reference to a user, used inside follower/saver lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: String,
    pub username: String,
}

/// A registered user. `email` is only filled for the user's own views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_picture: Option<String>,
    pub followers: Vec<UserSummary>,
    pub following: Vec<UserSummary>,
    pub saved_businesses: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    /// Strip private fields before showing the record to other users.
    pub fn into_public(mut self) -> Self {
        self.email = None;
        self
    }
}

/// Request body for registering a new user.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for logging in.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for updating the acting user's profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub profile_picture: Option<String>,
}

/// A user's public page: the profile plus the businesses they own.
#[derive(Debug, Clone, Serialize)]
pub struct UserProfilePage {
    pub user: User,
    pub businesses: Vec<super::Business>,
}
