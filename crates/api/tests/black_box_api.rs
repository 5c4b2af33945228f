use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use larder_api::config::ApiSettings;
use larder_auth::{JwtClaims, Role};
use larder_core::UserId;
use larder_infra::InMemoryStore;
use reqwest::StatusCode;
use serde_json::{json, Value};

const JWT_SECRET: &str = "test-secret";
const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8/5+hHgAHggJ/PchI7wAAAABJRU5ErkJggg==";

struct TestServer {
    base_url: String,
    client: reqwest::Client,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod over a fresh in-memory store, on an ephemeral port.
        let app = larder_api::app::build_router(
            JWT_SECRET.to_string(),
            Arc::new(InMemoryStore::new()),
            ApiSettings::default(),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            client: reqwest::Client::new(),
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn register(&self, username: &str) -> (i64, String) {
        let res = self
            .client
            .post(self.url("/users"))
            .json(&json!({
                "email": format!("{username}@example.com"),
                "username": username,
                "first_name": "Test",
                "last_name": "User",
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        let body: Value = res.json().await.unwrap();
        let id = body["id"].as_i64().unwrap();
        (id, mint_jwt(id, vec![]))
    }

    async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .unwrap()
    }

    async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .unwrap()
    }

    /// Admin-created tag and ingredients plus one recipe by `author_token`.
    async fn seed_recipe(&self, author_token: &str) -> (i64, Value) {
        let admin = mint_jwt(999, vec![Role::ADMIN]);
        let res = self
            .post(&admin, "/tags", json!({ "name": "Breakfast", "color": "#E26C2D", "slug": "breakfast" }))
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let tag: Value = res.json().await.unwrap();

        let mut ingredient_ids = Vec::new();
        for (name, unit) in [("Salt", "g"), ("Sugar", "g")] {
            let res = self
                .post(&admin, "/ingredients", json!({ "name": name, "measurement_unit": unit }))
                .await;
            assert_eq!(res.status(), StatusCode::CREATED);
            let ingredient: Value = res.json().await.unwrap();
            ingredient_ids.push(ingredient["id"].as_i64().unwrap());
        }

        let res = self
            .post(
                author_token,
                "/recipes",
                json!({
                    "name": "Porridge",
                    "text": "Boil and stir.",
                    "cooking_time": 10,
                    "image": PIXEL,
                    "tags": [tag["id"]],
                    "ingredients": [
                        { "id": ingredient_ids[0], "amount": 5 },
                        { "id": ingredient_ids[1], "amount": 30 },
                    ],
                }),
            )
            .await;
        assert_eq!(res.status(), StatusCode::CREATED);
        let recipe: Value = res.json().await.unwrap();
        (recipe["id"].as_i64().unwrap(), recipe)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn mint_jwt(user_id: i64, roles: Vec<Role>) -> String {
    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(user_id),
        roles,
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };

    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
    .expect("failed to encode jwt")
}

#[tokio::test]
async fn health_is_public_and_whoami_needs_a_token() {
    let srv = TestServer::spawn().await;

    let res = srv.client.get(srv.url("/health")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let res = srv.client.get(srv.url("/whoami")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");
}

#[tokio::test]
async fn forged_token_is_rejected_with_json_body() {
    let srv = TestServer::spawn().await;

    let now = Utc::now();
    let claims = JwtClaims {
        sub: UserId::new(1),
        roles: vec![Role::ADMIN],
        issued_at: now,
        expires_at: now + ChronoDuration::minutes(10),
    };
    let forged = jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(forged)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "invalid_token");
    assert!(body["message"].as_str().unwrap().starts_with("invalid token"));
}

#[tokio::test]
async fn whoami_reflects_token_claims() {
    let srv = TestServer::spawn().await;
    let token = mint_jwt(42, vec![Role::ADMIN]);

    let res = srv
        .client
        .get(srv.url("/whoami"))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["user_id"], 42);
    assert!(body["roles"].as_array().unwrap().iter().any(|r| r == "admin"));
}

#[tokio::test]
async fn catalog_writes_require_admin() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.register("cook").await;

    let res = srv
        .post(&token, "/tags", json!({ "name": "Lunch", "color": "#00FF00", "slug": "lunch" }))
        .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn shopping_cart_lifecycle_and_download() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.register("cook").await;
    let (recipe_id, _) = srv.seed_recipe(&token).await;

    let path = format!("/recipes/{recipe_id}/shopping_cart");
    let res = srv.post(&token, &path, json!({})).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let short: Value = res.json().await.unwrap();
    assert_eq!(short["id"], recipe_id);
    assert_eq!(short["name"], "Porridge");
    assert_eq!(short["cooking_time"], 10);

    let res = srv.post(&token, &path, json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "conflict");

    let res = srv
        .client
        .get(srv.url(&format!("/recipes/{recipe_id}")))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let recipe: Value = res.json().await.unwrap();
    assert_eq!(recipe["is_in_shopping_cart"], true);
    assert_eq!(recipe["is_favorited"], false);

    let res = srv
        .client
        .get(srv.url("/recipes/download_shopping_cart"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["content-type"], "application/pdf");
    assert_eq!(
        res.headers()["content-disposition"],
        "attachment; filename=\"shopping_cart.pdf\""
    );
    let bytes = res.bytes().await.unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    let text = String::from_utf8_lossy(&bytes);
    assert!(text.contains("(1. Salt: 5 g.)"));
    assert!(text.contains("(2. Sugar: 30 g.)"));

    let res = srv.delete(&token, &path).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv.delete(&token, &path).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn download_requires_authentication() {
    let srv = TestServer::spawn().await;
    let res = srv
        .client
        .get(srv.url("/recipes/download_shopping_cart"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn anonymous_listing_and_author_only_updates() {
    let srv = TestServer::spawn().await;
    let (author_id, author) = srv.register("author").await;
    let (_, stranger) = srv.register("stranger").await;
    let (recipe_id, created) = srv.seed_recipe(&author).await;
    assert_eq!(created["author"]["id"], author_id);

    let res = srv
        .client
        .get(srv.url("/recipes?tags=breakfast"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["id"], recipe_id);
    assert_eq!(page["results"][0]["is_favorited"], false);

    let update = json!({
        "name": "Sweet porridge",
        "tags": created["tags"].as_array().unwrap().iter().map(|t| t["id"].clone()).collect::<Vec<_>>(),
        "ingredients": [{ "id": created["ingredients"][1]["id"], "amount": 50 }],
    });

    let res = srv
        .client
        .patch(srv.url(&format!("/recipes/{recipe_id}")))
        .bearer_auth(&stranger)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = srv
        .client
        .patch(srv.url(&format!("/recipes/{recipe_id}")))
        .bearer_auth(&author)
        .json(&update)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["name"], "Sweet porridge");
    assert_eq!(updated["text"], "Boil and stir.");
    assert_eq!(updated["ingredients"].as_array().unwrap().len(), 1);
    assert_eq!(updated["ingredients"][0]["amount"], 50);
}

#[tokio::test]
async fn invalid_recipe_payload_names_the_field() {
    let srv = TestServer::spawn().await;
    let (_, token) = srv.register("cook").await;
    let (_, created) = srv.seed_recipe(&token).await;

    let res = srv
        .post(
            &token,
            "/recipes",
            json!({
                "name": "Nothing",
                "text": "Empty.",
                "cooking_time": 5,
                "image": PIXEL,
                "tags": [created["tags"][0]["id"]],
                "ingredients": [{ "id": created["ingredients"][0]["id"], "amount": 0 }],
            }),
        )
        .await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["field"], "amount");
}

#[tokio::test]
async fn subscriptions_embed_recipe_previews() {
    let srv = TestServer::spawn().await;
    let (author_id, author) = srv.register("author").await;
    let (_, reader) = srv.register("reader").await;
    srv.seed_recipe(&author).await;

    let path = format!("/users/{author_id}/subscribe");
    let res = srv.post(&reader, &path, json!({})).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["id"], author_id);
    assert_eq!(body["is_subscribed"], true);
    assert_eq!(body["recipes_count"], 1);
    assert_eq!(body["recipes"][0]["name"], "Porridge");

    let res = srv.post(&reader, &path, json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv.post(&author, &path, json!({})).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = srv
        .client
        .get(srv.url("/users/subscriptions"))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["count"], 1);
    assert_eq!(page["results"][0]["username"], "author");

    let res = srv
        .client
        .get(srv.url("/users/subscriptions?recipes_limit=500"))
        .bearer_auth(&reader)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let page: Value = res.json().await.unwrap();
    assert_eq!(page["results"][0]["recipes"].as_array().unwrap().len(), 1);
    assert_eq!(page["results"][0]["recipes_count"], 1);

    let res = srv.delete(&reader, &path).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let res = srv
        .post(&reader, &format!("{path}?recipes_limit=500"), json!({}))
        .await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["recipes"].as_array().unwrap().len(), 1);

    let res = srv.delete(&reader, &path).await;
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    let res = srv.delete(&reader, "/users/12345/subscribe").await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
