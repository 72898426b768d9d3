//! Comment models.

use serde::{Deserialize, Serialize};

/// A comment left on a business. Comments are never edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub business_id: String,
    pub user_id: String,
    /// Author name captured when the comment was written
    pub username: String,
    pub text: String,
    pub created_at: String,
}

/// Request body for adding a comment.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub text: String,
}
