//! Business models.

use serde::{Deserialize, Serialize};

/// Owner reference embedded in a business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BusinessOwner {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// A directory listing owned by one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Business {
    pub id: String,
    pub owner: BusinessOwner,
    pub name: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub images: Vec<String>,
    /// Ids of users who like the business
    pub likes: Vec<String>,
    pub saved_by: Vec<super::UserSummary>,
    pub like_count: i64,
    pub average_rating: f64,
    pub num_ratings: i64,
    pub num_comments: i64,
    pub num_saves: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Business {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner.id == user_id
    }
}

/// Request body for creating a new business.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateBusinessRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub location: String,
    /// URLs produced by the upload service
    #[serde(default)]
    pub images: Vec<String>,
}

impl CreateBusinessRequest {
    /// Names of required fields that are missing or blank.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("name", &self.name),
            ("description", &self.description),
            ("category", &self.category),
            ("location", &self.location),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }
}

/// Request body for updating a business. Blank text fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBusinessRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

/// Result of deleting a business and its dependents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRemoval {
    pub id: String,
    pub removed_comments: u64,
    pub removed_ratings: u64,
}

/// Pick the new value for a text field, keeping the old one for blank input.
pub fn merge_text(update: Option<&String>, existing: &str) -> String {
    match update {
        Some(value) if !value.trim().is_empty() => value.clone(),
        _ => existing.to_string(),
    }
}
