//! Database repository for CRUD operations.
//!
//! Every write that touches more than one row runs in a single transaction so
//! edge rows and the counters derived from them commit together.

use chrono::{SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection, SqlitePool, Transaction};

use crate::errors::AppError;
use crate::models::{
    Business, BusinessFilter, BusinessOwner, BusinessRemoval, Comment, CreateBusinessRequest,
    FollowStatus, LikeStatus, Rating, RatingOutcome, RatingSummary, SaveStatus,
    UpdateBusinessRequest, UpdateProfileRequest, User, merge_text,
};

const USER_SELECT: &str = r#"SELECT u.id, u.username, u.email, u.bio, u.profile_picture,
          u.created_at, u.updated_at,
          (SELECT json_group_array(json_object('id', f.follower_id, 'username', fu.username))
             FROM follows f JOIN users fu ON fu.id = f.follower_id
            WHERE f.followee_id = u.id) AS followers,
          (SELECT json_group_array(json_object('id', f.followee_id, 'username', fu.username))
             FROM follows f JOIN users fu ON fu.id = f.followee_id
            WHERE f.follower_id = u.id) AS following,
          (SELECT json_group_array(s.business_id)
             FROM saved_businesses s WHERE s.user_id = u.id) AS saved_businesses
   FROM users u"#;

const BUSINESS_SELECT: &str = r#"SELECT b.id, b.owner_id, o.username AS owner_username, b.name,
          b.description, b.category, b.location, b.images, b.average_rating,
          b.num_ratings, b.num_comments, b.num_saves, b.created_at, b.updated_at,
          (SELECT COUNT(*) FROM business_likes l WHERE l.business_id = b.id) AS like_count,
          (SELECT json_group_array(l.user_id)
             FROM business_likes l WHERE l.business_id = b.id) AS likes,
          (SELECT json_group_array(json_object('id', s.user_id, 'username', su.username))
             FROM saved_businesses s JOIN users su ON su.id = s.user_id
            WHERE s.business_id = b.id) AS saved_by
   FROM businesses b
   LEFT JOIN users o ON o.id = b.owner_id"#;

const COMMENT_SELECT: &str =
    "SELECT id, business_id, user_id, username, text, created_at FROM comments";

const RATING_SELECT: &str =
    "SELECT id, business_id, user_id, value, created_at, updated_at FROM ratings";

/// A membership relation stored as one row per (actor, target) pair.
///
/// Binding order of the two ids follows the table's key columns:
/// follows `(follower, followee)`, likes `(business, user)`, saves `(user, business)`.
#[derive(Debug, Clone, Copy)]
enum Edge {
    Follow,
    Like,
    Save,
}

impl Edge {
    fn exists_sql(self) -> &'static str {
        match self {
            Edge::Follow => {
                "SELECT COUNT(*) FROM follows WHERE follower_id = ? AND followee_id = ?"
            }
            Edge::Like => {
                "SELECT COUNT(*) FROM business_likes WHERE business_id = ? AND user_id = ?"
            }
            Edge::Save => {
                "SELECT COUNT(*) FROM saved_businesses WHERE user_id = ? AND business_id = ?"
            }
        }
    }

    fn insert_sql(self) -> &'static str {
        match self {
            Edge::Follow => {
                "INSERT OR IGNORE INTO follows (follower_id, followee_id, created_at) VALUES (?, ?, ?)"
            }
            Edge::Like => {
                "INSERT OR IGNORE INTO business_likes (business_id, user_id, created_at) VALUES (?, ?, ?)"
            }
            Edge::Save => {
                "INSERT OR IGNORE INTO saved_businesses (user_id, business_id, created_at) VALUES (?, ?, ?)"
            }
        }
    }

    fn delete_sql(self) -> &'static str {
        match self {
            Edge::Follow => "DELETE FROM follows WHERE follower_id = ? AND followee_id = ?",
            Edge::Like => "DELETE FROM business_likes WHERE business_id = ? AND user_id = ?",
            Edge::Save => "DELETE FROM saved_businesses WHERE user_id = ? AND business_id = ?",
        }
    }
}

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open a transaction that takes the write lock up front.
    ///
    /// A deferred read-then-write transaction fails its lock upgrade with
    /// `SQLITE_BUSY` under a concurrent writer; the busy timeout only covers `BEGIN`.
    async fn begin_write(&self) -> Result<Transaction<'static, Sqlite>, AppError> {
        Ok(self.pool.begin_with("BEGIN IMMEDIATE").await?)
    }

    // ==================== USER OPERATIONS ====================

    /// Create a user. Username and email must both be unused.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, AppError> {
        let taken: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        if taken > 0 {
            return Err(AppError::Validation("User already exists".to_string()));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();

        let inserted = sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await;

        match inserted {
            Ok(_) => {}
            // Lost a race with a concurrent registration
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(AppError::Validation("User already exists".to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(user_id = %id, username, "User registered");

        Ok(User {
            id,
            username: username.to_string(),
            email: Some(email.to_string()),
            bio: None,
            profile_picture: None,
            followers: Vec::new(),
            following: Vec::new(),
            saved_businesses: Vec::new(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Look up `(user id, password hash)` for a login email.
    pub async fn find_credentials(&self, email: &str) -> Result<Option<(String, String)>, AppError> {
        let row = sqlx::query("SELECT id, password_hash FROM users WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| (r.get("id"), r.get("password_hash"))))
    }

    /// Get a user by ID.
    pub async fn get_user(&self, id: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("{} WHERE u.id = ?", USER_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Get a user by username.
    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let row = sqlx::query(&format!("{} WHERE u.username = ?", USER_SELECT))
            .bind(username)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(user_from_row))
    }

    /// Resolve a user id to its username.
    pub async fn get_username(&self, id: &str) -> Result<Option<String>, AppError> {
        let username = sqlx::query_scalar("SELECT username FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(username)
    }

    /// List all users, newest first.
    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let rows = sqlx::query(&format!("{} ORDER BY u.created_at DESC", USER_SELECT))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(user_from_row).collect())
    }

    /// Update bio and profile picture. Absent fields keep their value.
    pub async fn update_profile(
        &self,
        id: &str,
        request: &UpdateProfileRequest,
    ) -> Result<User, AppError> {
        let result = sqlx::query(
            "UPDATE users SET bio = COALESCE(?, bio), profile_picture = COALESCE(?, profile_picture), updated_at = ? WHERE id = ?",
        )
        .bind(&request.bio)
        .bind(&request.profile_picture)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found("User", id));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| AppError::not_found("User", id))
    }

    // ==================== BUSINESS OPERATIONS ====================

    /// List businesses matching a filter.
    pub async fn list_businesses(&self, filter: &BusinessFilter) -> Result<Vec<Business>, AppError> {
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(BUSINESS_SELECT);
        query.push(" WHERE 1 = 1");

        if let Some(pattern) = filter.like_pattern() {
            query
                .push(" AND (lower(b.name) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(b.category) LIKE ")
                .push_bind(pattern.clone())
                .push(" ESCAPE '\\' OR lower(b.description) LIKE ")
                .push_bind(pattern)
                .push(" ESCAPE '\\')");
        }

        if let Some(min_rating) = filter.min_rating {
            query.push(" AND b.average_rating >= ").push_bind(min_rating);
        }

        let direction = filter.order.as_sql();
        query.push(format!(
            " ORDER BY {} {}, b.id {}",
            filter.sort_by.order_expr(),
            direction,
            direction
        ));

        let rows = query.build().fetch_all(&self.pool).await?;
        Ok(rows.iter().map(business_from_row).collect())
    }

    /// List businesses owned by a user, newest first.
    pub async fn list_businesses_by_owner(&self, owner_id: &str) -> Result<Vec<Business>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE b.owner_id = ? ORDER BY b.created_at DESC",
            BUSINESS_SELECT
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(business_from_row).collect())
    }

    /// List businesses a user has saved, most recently saved first.
    pub async fn list_saved_businesses(&self, user_id: &str) -> Result<Vec<Business>, AppError> {
        let rows = sqlx::query(&format!(
            "{} JOIN saved_businesses sv ON sv.business_id = b.id WHERE sv.user_id = ? ORDER BY sv.created_at DESC",
            BUSINESS_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(business_from_row).collect())
    }

    /// Get a business by ID.
    pub async fn get_business(&self, id: &str) -> Result<Option<Business>, AppError> {
        let row = sqlx::query(&format!("{} WHERE b.id = ?", BUSINESS_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(business_from_row))
    }

    /// Create a business owned by `owner_id`. Counters start at zero.
    pub async fn create_business(
        &self,
        owner_id: &str,
        request: &CreateBusinessRequest,
    ) -> Result<Business, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = timestamp();
        let images_json = serde_json::to_string(&request.images)?;

        sqlx::query(
            "INSERT INTO businesses (id, owner_id, name, description, category, location, images, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(owner_id)
        .bind(request.name.trim())
        .bind(request.description.trim())
        .bind(request.category.trim())
        .bind(request.location.trim())
        .bind(&images_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        tracing::info!(business_id = %id, owner_id, "Business created");

        self.get_business(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Business {} vanished after insert", id)))
    }

    /// Update a business. Only its owner may do so.
    pub async fn update_business(
        &self,
        id: &str,
        actor_id: &str,
        request: &UpdateBusinessRequest,
    ) -> Result<Business, AppError> {
        let existing = self
            .get_business(id)
            .await?
            .ok_or_else(|| AppError::not_found("Business", id))?;

        if !existing.is_owned_by(actor_id) {
            return Err(AppError::Unauthorized(
                "Not authorized to modify this business".to_string(),
            ));
        }

        let name = merge_text(request.name.as_ref(), &existing.name);
        let description = merge_text(request.description.as_ref(), &existing.description);
        let category = merge_text(request.category.as_ref(), &existing.category);
        let location = merge_text(request.location.as_ref(), &existing.location);
        let images = request.images.as_ref().unwrap_or(&existing.images);
        let images_json = serde_json::to_string(images)?;

        sqlx::query(
            "UPDATE businesses SET name = ?, description = ?, category = ?, location = ?, images = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&name)
        .bind(&description)
        .bind(&category)
        .bind(&location)
        .bind(&images_json)
        .bind(timestamp())
        .bind(id)
        .execute(&self.pool)
        .await?;

        self.get_business(id)
            .await?
            .ok_or_else(|| AppError::not_found("Business", id))
    }

    /// Delete a business with its comments, ratings, likes and saves.
    pub async fn delete_business(
        &self,
        id: &str,
        actor_id: &str,
    ) -> Result<BusinessRemoval, AppError> {
        let mut tx = self.begin_write().await?;

        let owner_id: Option<String> =
            sqlx::query_scalar("SELECT owner_id FROM businesses WHERE id = ?")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let owner_id = owner_id.ok_or_else(|| AppError::not_found("Business", id))?;
        if owner_id != actor_id {
            return Err(AppError::Unauthorized(
                "Not authorized to delete this business".to_string(),
            ));
        }

        let removed_comments = sqlx::query("DELETE FROM comments WHERE business_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let removed_ratings = sqlx::query("DELETE FROM ratings WHERE business_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        sqlx::query("DELETE FROM business_likes WHERE business_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM saved_businesses WHERE business_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM businesses WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            business_id = id,
            removed_comments,
            removed_ratings,
            "Business deleted"
        );

        Ok(BusinessRemoval {
            id: id.to_string(),
            removed_comments,
            removed_ratings,
        })
    }

    // ==================== COMMENT OPERATIONS ====================

    /// Add a comment and bump the business's comment counter.
    pub async fn add_comment(
        &self,
        business_id: &str,
        user_id: &str,
        username: &str,
        text: &str,
    ) -> Result<Comment, AppError> {
        let mut tx = self.begin_write().await?;

        if !business_exists(&mut tx, business_id).await? {
            return Err(AppError::not_found("Business", business_id));
        }

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            business_id: business_id.to_string(),
            user_id: user_id.to_string(),
            username: username.to_string(),
            text: text.to_string(),
            created_at: timestamp(),
        };

        sqlx::query(
            "INSERT INTO comments (id, business_id, user_id, username, text, created_at) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&comment.id)
        .bind(&comment.business_id)
        .bind(&comment.user_id)
        .bind(&comment.username)
        .bind(&comment.text)
        .bind(&comment.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE businesses SET num_comments = num_comments + 1 WHERE id = ?")
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(comment)
    }

    /// List comments of a business, oldest first.
    pub async fn list_comments(&self, business_id: &str) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(&format!(
            "{} WHERE business_id = ? ORDER BY created_at, id",
            COMMENT_SELECT
        ))
        .bind(business_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(comment_from_row).collect())
    }

    /// Get a comment by ID.
    pub async fn get_comment(&self, id: &str) -> Result<Option<Comment>, AppError> {
        let row = sqlx::query(&format!("{} WHERE id = ?", COMMENT_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(comment_from_row))
    }

    // ==================== RATING OPERATIONS ====================

    /// Insert or replace a user's rating, then recompute the business average
    /// from every stored rating.
    pub async fn upsert_rating(
        &self,
        business_id: &str,
        user_id: &str,
        value: i64,
    ) -> Result<RatingOutcome, AppError> {
        let mut tx = self.begin_write().await?;

        if !business_exists(&mut tx, business_id).await? {
            return Err(AppError::not_found("Business", business_id));
        }

        let now = timestamp();
        sqlx::query(
            r#"INSERT INTO ratings (id, business_id, user_id, value, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?)
               ON CONFLICT (business_id, user_id)
               DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(business_id)
        .bind(user_id)
        .bind(value)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query(&format!(
            "{} WHERE business_id = ? AND user_id = ?",
            RATING_SELECT
        ))
        .bind(business_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
        let rating = rating_from_row(&row);

        let values: Vec<i64> = sqlx::query_scalar("SELECT value FROM ratings WHERE business_id = ?")
            .bind(business_id)
            .fetch_all(&mut *tx)
            .await?;
        let summary = RatingSummary::from_values(&values);

        sqlx::query("UPDATE businesses SET average_rating = ?, num_ratings = ? WHERE id = ?")
            .bind(summary.average_rating)
            .bind(summary.num_ratings)
            .bind(business_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::debug!(
            business_id,
            user_id,
            value,
            average = summary.average_rating,
            count = summary.num_ratings,
            "Rating stored"
        );

        Ok(RatingOutcome { rating, summary })
    }

    /// Get one user's rating of a business.
    pub async fn get_rating(
        &self,
        business_id: &str,
        user_id: &str,
    ) -> Result<Option<Rating>, AppError> {
        let row = sqlx::query(&format!(
            "{} WHERE business_id = ? AND user_id = ?",
            RATING_SELECT
        ))
        .bind(business_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(rating_from_row))
    }

    // ==================== SOCIAL OPERATIONS ====================

    /// Like a business, or unlike it if already liked.
    pub async fn toggle_like(&self, business_id: &str, user_id: &str) -> Result<LikeStatus, AppError> {
        let mut tx = self.begin_write().await?;

        if !business_exists(&mut tx, business_id).await? {
            return Err(AppError::not_found("Business", business_id));
        }

        let liked = toggle_edge(&mut tx, Edge::Like, business_id, user_id).await?;

        let like_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM business_likes WHERE business_id = ?")
                .bind(business_id)
                .fetch_one(&mut *tx)
                .await?;

        tx.commit().await?;

        tracing::debug!(business_id, user_id, liked, "Like toggled");
        Ok(LikeStatus { liked, like_count })
    }

    /// Save a business, or unsave it if already saved.
    pub async fn toggle_save(&self, user_id: &str, business_id: &str) -> Result<SaveStatus, AppError> {
        let mut tx = self.begin_write().await?;

        if !business_exists(&mut tx, business_id).await? {
            return Err(AppError::not_found("Business", business_id));
        }

        let saved = toggle_edge(&mut tx, Edge::Save, user_id, business_id).await?;
        let num_saves = refresh_save_count(&mut tx, business_id).await?;

        tx.commit().await?;

        tracing::debug!(business_id, user_id, saved, "Save toggled");
        Ok(SaveStatus { saved, num_saves })
    }

    /// Remove a saved business. Not having saved it is not an error.
    pub async fn unsave(&self, user_id: &str, business_id: &str) -> Result<SaveStatus, AppError> {
        let mut tx = self.begin_write().await?;

        if !business_exists(&mut tx, business_id).await? {
            return Err(AppError::not_found("Business", business_id));
        }

        remove_edge(&mut tx, Edge::Save, user_id, business_id).await?;
        let num_saves = refresh_save_count(&mut tx, business_id).await?;

        tx.commit().await?;

        Ok(SaveStatus {
            saved: false,
            num_saves,
        })
    }

    /// Follow a user, or unfollow if already following.
    pub async fn toggle_follow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<FollowStatus, AppError> {
        if follower_id == followee_id {
            return Err(AppError::Validation("You cannot follow yourself".to_string()));
        }

        let mut tx = self.begin_write().await?;

        if !user_exists(&mut tx, followee_id).await? {
            return Err(AppError::not_found("User", followee_id));
        }

        let is_following = toggle_edge(&mut tx, Edge::Follow, follower_id, followee_id).await?;
        let follower_count = follower_count(&mut tx, followee_id).await?;

        tx.commit().await?;

        tracing::debug!(follower_id, followee_id, is_following, "Follow toggled");
        Ok(FollowStatus {
            is_following,
            follower_count,
        })
    }

    /// Stop following a user. Not following is not an error.
    pub async fn unfollow(
        &self,
        follower_id: &str,
        followee_id: &str,
    ) -> Result<FollowStatus, AppError> {
        let mut tx = self.begin_write().await?;

        if !user_exists(&mut tx, followee_id).await? {
            return Err(AppError::not_found("User", followee_id));
        }

        remove_edge(&mut tx, Edge::Follow, follower_id, followee_id).await?;
        let follower_count = follower_count(&mut tx, followee_id).await?;

        tx.commit().await?;

        Ok(FollowStatus {
            is_following: false,
            follower_count,
        })
    }
}

// Transaction helpers

async fn business_exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM businesses WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

async fn user_exists(conn: &mut SqliteConnection, id: &str) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE id = ?")
        .bind(id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count > 0)
}

/// Flip an edge and return whether it exists afterwards.
async fn toggle_edge(
    conn: &mut SqliteConnection,
    edge: Edge,
    first: &str,
    second: &str,
) -> Result<bool, AppError> {
    let count: i64 = sqlx::query_scalar(edge.exists_sql())
        .bind(first)
        .bind(second)
        .fetch_one(&mut *conn)
        .await?;

    if count > 0 {
        remove_edge(conn, edge, first, second).await?;
        Ok(false)
    } else {
        sqlx::query(edge.insert_sql())
            .bind(first)
            .bind(second)
            .bind(timestamp())
            .execute(&mut *conn)
            .await?;
        Ok(true)
    }
}

async fn remove_edge(
    conn: &mut SqliteConnection,
    edge: Edge,
    first: &str,
    second: &str,
) -> Result<(), AppError> {
    sqlx::query(edge.delete_sql())
        .bind(first)
        .bind(second)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Recompute `num_saves` from the save edges and return it.
async fn refresh_save_count(conn: &mut SqliteConnection, business_id: &str) -> Result<i64, AppError> {
    let num_saves: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM saved_businesses WHERE business_id = ?")
            .bind(business_id)
            .fetch_one(&mut *conn)
            .await?;

    sqlx::query("UPDATE businesses SET num_saves = ? WHERE id = ?")
        .bind(num_saves)
        .bind(business_id)
        .execute(&mut *conn)
        .await?;

    Ok(num_saves)
}

async fn follower_count(conn: &mut SqliteConnection, user_id: &str) -> Result<i64, AppError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followee_id = ?")
        .bind(user_id)
        .fetch_one(&mut *conn)
        .await?;
    Ok(count)
}

/// Fixed-width UTC timestamp so string order matches time order.
fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Helper functions for row conversion

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        username: row.get("username"),
        email: row.get("email"),
        bio: row.get("bio"),
        profile_picture: row.get("profile_picture"),
        followers: parse_json_list(row.get("followers")),
        following: parse_json_list(row.get("following")),
        saved_businesses: parse_json_list(row.get("saved_businesses")),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn business_from_row(row: &SqliteRow) -> Business {
    Business {
        id: row.get("id"),
        owner: BusinessOwner {
            id: row.get("owner_id"),
            username: row.get("owner_username"),
        },
        name: row.get("name"),
        description: row.get("description"),
        category: row.get("category"),
        location: row.get("location"),
        images: parse_json_list(row.get("images")),
        likes: parse_json_list(row.get("likes")),
        saved_by: parse_json_list(row.get("saved_by")),
        like_count: row.get("like_count"),
        average_rating: row.get("average_rating"),
        num_ratings: row.get("num_ratings"),
        num_comments: row.get("num_comments"),
        num_saves: row.get("num_saves"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn comment_from_row(row: &SqliteRow) -> Comment {
    Comment {
        id: row.get("id"),
        business_id: row.get("business_id"),
        user_id: row.get("user_id"),
        username: row.get("username"),
        text: row.get("text"),
        created_at: row.get("created_at"),
    }
}

fn rating_from_row(row: &SqliteRow) -> Rating {
    Rating {
        id: row.get("id"),
        business_id: row.get("business_id"),
        user_id: row.get("user_id"),
        value: row.get("value"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn parse_json_list<T: DeserializeOwned>(s: Option<String>) -> Vec<T> {
    s.and_then(|s| serde_json::from_str(&s).ok())
        .unwrap_or_default()
}
