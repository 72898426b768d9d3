//! Data models for the directory application.
//!
//! Field names serialize as camelCase to match the single-page client.

mod business;
mod comment;
mod filter;
mod rating;
mod social;
mod user;

pub use business::*;
pub use comment::*;
pub use filter::*;
pub use rating::*;
pub use social::*;
pub use user::*;
