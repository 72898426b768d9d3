//! Rating models and the average computation.

use serde::{Deserialize, Serialize};

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

/// One user's score for one business.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rating {
    pub id: String,
    pub business_id: String,
    pub user_id: String,
    pub value: i64,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for submitting a rating.
#[derive(Debug, Clone, Deserialize)]
pub struct RateBusinessRequest {
    #[serde(default)]
    pub value: Option<i64>,
}

/// Aggregate of every rating currently stored for a business.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RatingSummary {
    pub average_rating: f64,
    pub num_ratings: i64,
}

impl RatingSummary {
    /// Unweighted mean of `values`; a business nobody rated averages 0.
    pub fn from_values(values: &[i64]) -> Self {
        if values.is_empty() {
            return Self {
                average_rating: 0.0,
                num_ratings: 0,
            };
        }

        let total: i64 = values.iter().sum();
        Self {
            average_rating: total as f64 / values.len() as f64,
            num_ratings: values.len() as i64,
        }
    }
}

/// A stored rating together with the business aggregate after the write.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingOutcome {
    pub rating: Rating,
    #[serde(flatten)]
    pub summary: RatingSummary,
}

pub fn validate_rating_value(value: i64) -> Result<(), String> {
    if (MIN_RATING..=MAX_RATING).contains(&value) {
        Ok(())
    } else {
        Err(format!(
            "Rating must be between {} and {}",
            MIN_RATING, MAX_RATING
        ))
    }
}
