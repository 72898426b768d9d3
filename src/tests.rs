//! Integration tests for the directory backend.

use std::sync::Arc;

use reqwest::{Client, RequestBuilder, Response};
use serde_json::{json, Value};
use tempfile::TempDir;

use crate::auth::ACTOR_HEADER;
use crate::config::Config;
use crate::db::{init_database, Repository};
use crate::{create_router, AppState};

const TEST_PSK: &str = "test-gateway-key";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    _temp_dir: TempDir,
}

/// A registered user as seen by the tests.
struct TestUser {
    id: String,
    username: String,
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_psk(Some(TEST_PSK.to_string())).await
    }

    async fn with_psk(psk: Option<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.sqlite");

        let pool = init_database(&db_path).await.expect("Failed to init DB");
        let repo = Arc::new(Repository::new(pool));

        let config = Config {
            api_psk: psk.clone(),
            db_path,
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            log_level: "warn".to_string(),
            cors_origin: None,
        };

        let state = AppState {
            repo,
            config: Arc::new(config),
        };

        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut client_builder = Client::builder();
        if let Some(key) = psk {
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert("x-api-key", key.parse().unwrap());
            client_builder = client_builder.default_headers(headers);
        }

        TestFixture {
            client: client_builder.build().unwrap(),
            base_url,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn as_user(&self, builder: RequestBuilder, user: &TestUser) -> RequestBuilder {
        builder.header(ACTOR_HEADER, &user.id)
    }

    async fn register(&self, username: &str) -> TestUser {
        let resp = self
            .client
            .post(self.url("/api/users/register"))
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "long enough password"
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        TestUser {
            id: body["data"]["id"].as_str().unwrap().to_string(),
            username: username.to_string(),
        }
    }

    async fn create_business(&self, owner: &TestUser, name: &str, category: &str) -> String {
        let resp = self
            .as_user(self.client.post(self.url("/api/businesses")), owner)
            .json(&json!({
                "name": name,
                "description": format!("{} description", name),
                "category": category,
                "location": "Springfield",
                "images": ["https://img.example.com/a.jpg"]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 201);
        let body: Value = resp.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    async fn rate(&self, user: &TestUser, business_id: &str, value: i64) -> Response {
        self.as_user(
            self.client
                .post(self.url(&format!("/api/businesses/{}/ratings", business_id))),
            user,
        )
        .json(&json!({ "value": value }))
        .send()
        .await
        .unwrap()
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_gateway_key_required() {
    let fixture = TestFixture::new().await;

    // Request without the gateway key
    let resp = Client::new()
        .get(fixture.url("/api/businesses"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // Request with the wrong key
    let resp = Client::new()
        .get(fixture.url("/api/businesses"))
        .header("x-api-key", "wrong-key")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Bearer form is accepted too
    let resp = Client::new()
        .get(fixture.url("/api/businesses"))
        .bearer_auth(TEST_PSK)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn test_dev_mode_without_key() {
    let fixture = TestFixture::with_psk(None).await;
    let (status, body) = fixture.get_json("/api/businesses").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_register_and_login() {
    let fixture = TestFixture::new().await;
    let alice = fixture.register("alice").await;

    // Duplicate email
    let resp = fixture
        .client
        .post(fixture.url("/api/users/register"))
        .json(&json!({
            "username": "alice2",
            "email": "alice@example.com",
            "password": "long enough password"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Missing fields
    let resp = fixture
        .client
        .post(fixture.url("/api/users/register"))
        .json(&json!({ "username": "bob" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let resp = fixture
        .client
        .post(fixture.url("/api/users/login"))
        .json(&json!({ "email": "alice@example.com", "password": "long enough password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["id"], alice.id.as_str());
    assert_eq!(body["data"]["email"], "alice@example.com");
    assert!(body["data"].get("passwordHash").is_none());

    let resp = fixture
        .client
        .post(fixture.url("/api/users/login"))
        .json(&json!({ "email": "alice@example.com", "password": "wrong password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_actor_required_for_mutations() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/businesses"))
        .json(&json!({
            "name": "Cafe", "description": "d", "category": "Food", "location": "here"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .client
        .post(fixture.url("/api/businesses"))
        .header(ACTOR_HEADER, "no-such-user")
        .json(&json!({
            "name": "Cafe", "description": "d", "category": "Food", "location": "here"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_business_crud_and_ownership() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("owner").await;
    let other = fixture.register("other").await;

    // Validation
    let resp = fixture
        .as_user(fixture.client.post(fixture.url("/api/businesses")), &owner)
        .json(&json!({ "name": "Half done" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let id = fixture.create_business(&owner, "Corner Cafe", "Food").await;

    let (status, body) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["name"], "Corner Cafe");
    assert_eq!(body["data"]["owner"]["username"], "owner");
    assert_eq!(body["data"]["averageRating"], 0.0);
    assert_eq!(body["data"]["numRatings"], 0);
    assert_eq!(body["data"]["images"][0], "https://img.example.com/a.jpg");

    // Non-owner update is rejected
    let resp = fixture
        .as_user(
            fixture.client.put(fixture.url(&format!("/api/businesses/{}", id))),
            &other,
        )
        .json(&json!({ "name": "Hijacked" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    // Owner update keeps blank fields
    let resp = fixture
        .as_user(
            fixture.client.put(fixture.url(&format!("/api/businesses/{}", id))),
            &owner,
        )
        .json(&json!({ "name": "Corner Bistro", "category": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Corner Bistro");
    assert_eq!(body["data"]["category"], "Food");

    let (status, _) = fixture.get_json("/api/businesses/missing").await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_rating_example_sequence() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("owner").await;
    let a = fixture.register("usera").await;
    let b = fixture.register("userb").await;
    let id = fixture.create_business(&owner, "Diner", "Food").await;

    let resp = fixture.rate(&a, &id, 4).await;
    assert_eq!(resp.status(), 201);

    let resp = fixture.rate(&a, &id, 2).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["averageRating"], 2.0);
    assert_eq!(body["data"]["numRatings"], 1);

    let resp = fixture.rate(&b, &id, 4).await;
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["averageRating"], 3.0);
    assert_eq!(body["data"]["numRatings"], 2);

    let (_, body) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(body["data"]["averageRating"], 3.0);
    assert_eq!(body["data"]["numRatings"], 2);

    let (status, body) = fixture
        .get_json(&format!("/api/businesses/{}/ratings/{}", id, a.id))
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["value"], 2);

    // Out of range
    let resp = fixture.rate(&a, &id, 9).await;
    assert_eq!(resp.status(), 400);

    // Unknown business
    let resp = fixture.rate(&a, "missing", 3).await;
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_malformed_bodies_use_error_envelope() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("owner").await;
    let rater = fixture.register("rater").await;
    let id = fixture.create_business(&owner, "Bakery", "Food").await;
    let ratings_url = fixture.url(&format!("/api/businesses/{}/ratings", id));

    // Missing value
    let resp = fixture
        .as_user(fixture.client.post(&ratings_url), &rater)
        .json(&json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Rating value is required");

    // Fractional value
    let resp = fixture
        .as_user(fixture.client.post(&ratings_url), &rater)
        .json(&json!({ "value": 4.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Not JSON at all
    let resp = fixture
        .as_user(fixture.client.post(fixture.url("/api/businesses")), &owner)
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    // Nothing was stored
    let (_, body) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(body["data"]["numRatings"], 0);
}

#[tokio::test]
async fn test_follow_toggle_and_self_follow() {
    let fixture = TestFixture::new().await;
    let a = fixture.register("alice").await;
    let b = fixture.register("bob").await;

    let follow = |user: &TestUser, target: &str| {
        fixture.as_user(
            fixture
                .client
                .put(fixture.url(&format!("/api/users/{}/follow", target))),
            user,
        )
    };

    let resp = follow(&a, &b.id).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isFollowing"], true);
    assert_eq!(body["data"]["followerCount"], 1);

    let (_, body) = fixture.get_json("/api/users/bob").await;
    assert_eq!(body["data"]["user"]["followers"][0]["id"], a.id.as_str());
    assert!(body["data"]["user"].get("email").is_none());
    let (_, body) = fixture.get_json("/api/users/alice").await;
    assert_eq!(body["data"]["user"]["following"][0]["username"], "bob");

    // Toggle back to the initial state
    let resp = follow(&a, &b.id).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isFollowing"], false);
    let (_, body) = fixture.get_json("/api/users/bob").await;
    assert_eq!(body["data"]["user"]["followers"], json!([]));

    // Self-follow
    let resp = follow(&a, &a.id).send().await.unwrap();
    assert_eq!(resp.status(), 400);

    // Unknown target
    let resp = follow(&a, "nobody").send().await.unwrap();
    assert_eq!(resp.status(), 404);

    // Explicit unfollow is a no-op when not following
    let resp = fixture
        .as_user(
            fixture
                .client
                .put(fixture.url(&format!("/api/users/{}/unfollow", b.id))),
            &a,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["isFollowing"], false);
    assert_eq!(body["data"]["followerCount"], 0);
}

#[tokio::test]
async fn test_like_and_save_toggles() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("owner").await;
    let fan = fixture.register("fan").await;
    let id = fixture.create_business(&owner, "Bookshop", "Retail").await;

    let like = || {
        fixture.as_user(
            fixture
                .client
                .put(fixture.url(&format!("/api/businesses/{}/like", id))),
            &fan,
        )
    };
    let save = || {
        fixture.as_user(
            fixture
                .client
                .put(fixture.url(&format!("/api/users/save/{}", id))),
            &fan,
        )
    };

    let body: Value = like().send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["liked"], true);
    assert_eq!(body["data"]["likeCount"], 1);

    let body: Value = save().send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["saved"], true);
    assert_eq!(body["data"]["numSaves"], 1);

    let (_, body) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(body["data"]["likes"][0], fan.id.as_str());
    assert_eq!(body["data"]["savedBy"][0]["username"], fan.username.as_str());
    assert_eq!(body["data"]["numSaves"], 1);

    let resp = fixture
        .as_user(
            fixture.client.get(fixture.url("/api/users/profile/saved")),
            &fan,
        )
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["id"], id.as_str());

    // Second toggles restore the initial state
    let body: Value = like().send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["liked"], false);
    let body: Value = save().send().await.unwrap().json().await.unwrap();
    assert_eq!(body["data"]["saved"], false);

    let (_, body) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(body["data"]["likes"], json!([]));
    assert_eq!(body["data"]["savedBy"], json!([]));
    assert_eq!(body["data"]["numSaves"], 0);
}

#[tokio::test]
async fn test_comments_and_cascade_delete() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("owner").await;
    let visitor = fixture.register("visitor").await;
    let id = fixture.create_business(&owner, "Barber", "Services").await;

    // Blank comment
    let resp = fixture
        .as_user(
            fixture
                .client
                .post(fixture.url(&format!("/api/businesses/{}/comments", id))),
            &visitor,
        )
        .json(&json!({ "text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .as_user(
            fixture
                .client
                .post(fixture.url(&format!("/api/businesses/{}/comments", id))),
            &visitor,
        )
        .json(&json!({ "text": "Sharp cut" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 201);
    let body: Value = resp.json().await.unwrap();
    let comment_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["username"], "visitor");

    fixture.rate(&visitor, &id, 5).await;

    let (_, body) = fixture
        .get_json(&format!("/api/businesses/{}/comments", id))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(body["data"]["numComments"], 1);

    // Only the owner can delete
    let resp = fixture
        .as_user(
            fixture
                .client
                .delete(fixture.url(&format!("/api/businesses/{}", id))),
            &visitor,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = fixture
        .as_user(
            fixture
                .client
                .delete(fixture.url(&format!("/api/businesses/{}", id))),
            &owner,
        )
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["removedComments"], 1);
    assert_eq!(body["data"]["removedRatings"], 1);

    let (status, _) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(status, 404);
    let (status, _) = fixture.get_json(&format!("/api/comments/{}", comment_id)).await;
    assert_eq!(status, 404);
    let (status, _) = fixture
        .get_json(&format!("/api/businesses/{}/ratings/{}", id, visitor.id))
        .await;
    assert_eq!(status, 404);
    let (status, _) = fixture
        .get_json(&format!("/api/businesses/{}/comments", id))
        .await;
    assert_eq!(status, 404);
}

#[tokio::test]
async fn test_listing_filters() {
    let fixture = TestFixture::new().await;
    let owner = fixture.register("owner").await;
    let rater = fixture.register("rater").await;
    let pizza = fixture.create_business(&owner, "Pizza Place", "Food").await;
    let gym = fixture.create_business(&owner, "Iron Gym", "Fitness").await;

    fixture.rate(&rater, &pizza, 5).await;
    fixture.rate(&rater, &gym, 2).await;

    let (_, body) = fixture.get_json("/api/businesses?keyword=fitNESS").await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], gym.as_str());

    let (_, body) = fixture.get_json("/api/businesses?minRating=4").await;
    let list = body["data"].as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], pizza.as_str());

    let (_, body) = fixture
        .get_json("/api/businesses?sortBy=averageRating&order=asc")
        .await;
    assert_eq!(body["data"][0]["id"], gym.as_str());
    assert_eq!(body["data"][1]["id"], pizza.as_str());

    let (status, body) = fixture.get_json("/api/businesses?sortBy=owner").await;
    assert_eq!(status, 400);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = fixture.get_json("/api/businesses?minRating=high").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_profile_views() {
    let fixture = TestFixture::new().await;
    let alice = fixture.register("alice").await;
    fixture.create_business(&alice, "Alice's Atelier", "Art").await;

    let resp = fixture
        .as_user(fixture.client.put(fixture.url("/api/users/profile")), &alice)
        .json(&json!({ "bio": "Painter", "profilePicture": "https://img.example.com/me.png" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["bio"], "Painter");
    assert_eq!(body["data"]["profilePicture"], "https://img.example.com/me.png");

    let resp = fixture
        .as_user(
            fixture.client.get(fixture.url("/api/users/profile/posts")),
            &alice,
        )
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0]["name"], "Alice's Atelier");

    let (_, body) = fixture.get_json("/api/users").await;
    let users = body["data"].as_array().unwrap();
    assert_eq!(users.len(), 1);
    assert!(users[0].get("email").is_none());
    assert_eq!(users[0]["bio"], "Painter");

    let (_, body) = fixture.get_json("/api/users/alice").await;
    assert_eq!(body["data"]["businesses"].as_array().unwrap().len(), 1);

    let (status, _) = fixture.get_json("/api/users/nobody").await;
    assert_eq!(status, 404);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_writes_from_distinct_users() {
    const RATERS: usize = 12;

    let fixture = TestFixture::new().await;
    let owner = fixture.register("owner").await;
    let id = fixture.create_business(&owner, "Busy Cafe", "Cafe").await;

    let mut raters = Vec::with_capacity(RATERS);
    for i in 0..RATERS {
        raters.push(fixture.register(&format!("rater{}", i)).await);
    }

    let mut tasks = tokio::task::JoinSet::new();
    for (i, rater) in raters.iter().enumerate() {
        let client = fixture.client.clone();
        let rate_url = fixture.url(&format!("/api/businesses/{}/ratings", id));
        let like_url = fixture.url(&format!("/api/businesses/{}/like", id));
        let actor_id = rater.id.clone();
        let value = (i % 5) as i64 + 1;

        tasks.spawn(async move {
            let rated = client
                .post(rate_url)
                .header(ACTOR_HEADER, &actor_id)
                .json(&json!({ "value": value }))
                .send()
                .await
                .unwrap()
                .status()
                .as_u16();
            let liked = client
                .put(like_url)
                .header(ACTOR_HEADER, &actor_id)
                .send()
                .await
                .unwrap()
                .status()
                .as_u16();
            (rated, liked)
        });
    }

    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap(), (201, 200));
    }

    // Values cycle 1..=5 over twelve raters: 33 / 12
    let (status, body) = fixture.get_json(&format!("/api/businesses/{}", id)).await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["numRatings"], RATERS as i64);
    assert_eq!(body["data"]["likeCount"], RATERS as i64);
    let average = body["data"]["averageRating"].as_f64().unwrap();
    assert!((average - 2.75).abs() < 1e-9);
}
