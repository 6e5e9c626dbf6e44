// tests/api_tests.rs

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use microblog::{
    config::Config,
    db,
    models::user::User,
    routes,
    state::AppState,
    utils::notify::{FollowNotifier, NotifyError},
};
use serde_json::{Value, json};

/// Records (follower, followed) nicknames instead of delivering anything.
#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl FollowNotifier for RecordingNotifier {
    async fn notify_follow(&self, follower: &User, followed: &User) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((follower.nickname.clone(), followed.nickname.clone()));
        Ok(())
    }
}

struct TestApp {
    address: String,
    client: reqwest::Client,
    notifier: Arc<RecordingNotifier>,
}

/// Helper function to spawn the app on a random port for testing,
/// backed by a fresh in-memory database.
async fn spawn_app() -> TestApp {
    let pool = db::connect("sqlite::memory:", 1)
        .await
        .expect("Failed to open in-memory database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        database_max_connections: 1,
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        posts_per_page: 2,
        max_search_results: 50,
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
    };

    let notifier = Arc::new(RecordingNotifier::default());
    let state = AppState {
        pool,
        config,
        notifier: notifier.clone(),
    };
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        client: reqwest::Client::new(),
        notifier,
    }
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.address, path)
    }

    /// Logs in through the identity-provider endpoint; returns (token, user json).
    async fn login(&self, nickname: Option<&str>, email: &str) -> (String, Value) {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(&json!({ "email": email, "nickname": nickname }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.unwrap();
        (body["token"].as_str().unwrap().to_string(), body["user"].clone())
    }

    async fn create_post(&self, token: &str, body: &str) -> i64 {
        let response = self
            .client
            .post(self.url("/posts"))
            .bearer_auth(token)
            .json(&json!({ "body": body }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 201);
        response.json::<Value>().await.unwrap()["id"].as_i64().unwrap()
    }
}

fn unique_email(prefix: &str) -> String {
    format!("{}_{}@example.com", prefix, &uuid::Uuid::new_v4().to_string()[..8])
}

#[tokio::test]
async fn unknown_path_is_404() {
    let app = spawn_app().await;

    let response = app
        .client
        .get(format!("{}/random_path_that_does_not_exist", app.address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn login_creates_the_account_once() {
    let app = spawn_app().await;
    let email = unique_email("zoe");

    let (token, user) = app.login(Some("Zoe Q!"), &email).await;
    assert_eq!(user["nickname"], "ZoeQ");
    assert!(user.get("email").is_none());

    let (_, again) = app.login(Some("ignored"), &email).await;
    assert_eq!(again["id"], user["id"]);
    assert_eq!(again["nickname"], "ZoeQ");

    let session: Value = app
        .client
        .get(app.url("/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["state"], "authenticated");
    assert_eq!(session["user"]["nickname"], "ZoeQ");
    assert!(session["user"]["last_seen"].is_string());
}

#[tokio::test]
async fn login_requires_an_email() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/auth/login"))
        .json(&json!({ "email": "", "nickname": "nobody" }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn login_accepts_whatever_email_the_provider_reports() {
    let app = spawn_app().await;
    let tag = &uuid::Uuid::new_v4().simple().to_string()[..8];
    let email = format!("openid-user-{}", tag);

    let (token, user) = app.login(None, &email).await;
    assert_eq!(user["nickname"], format!("openiduser{}", tag));

    let (_, again) = app.login(None, &email).await;
    assert_eq!(again["id"], user["id"]);

    let session: Value = app
        .client
        .get(app.url("/session"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["state"], "authenticated");
}

#[tokio::test]
async fn blank_posts_are_rejected() {
    let app = spawn_app().await;
    let (token, _) = app.login(Some("blank"), &unique_email("blank")).await;

    let response = app
        .client
        .post(app.url("/posts"))
        .bearer_auth(&token)
        .json(&json!({ "body": "   \n\t " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);

    let feed: Value = app
        .client
        .get(app.url("/feed"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(feed["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn anonymous_and_bad_tokens_are_handled() {
    let app = spawn_app().await;

    let session: Value = app
        .client
        .get(app.url("/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["state"], "anonymous");

    let feed = app.client.get(app.url("/feed")).send().await.unwrap();
    assert_eq!(feed.status().as_u16(), 401);

    let bad = app
        .client
        .get(app.url("/feed"))
        .bearer_auth("not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(bad.status().as_u16(), 401);
}

#[tokio::test]
async fn follow_feed_heart_and_delete_flow() {
    let app = spawn_app().await;
    let (alice, _) = app.login(Some("alice"), &unique_email("alice")).await;
    let (bob, _) = app.login(Some("bob"), &unique_email("bob")).await;

    let bob_post = app.create_post(&bob, "hello from bob").await;
    let alice_post = app.create_post(&alice, "hello from alice").await;

    // Alice follows Bob; a second follow is a no-op and does not notify again.
    for _ in 0..2 {
        let response = app
            .client
            .post(app.url("/users/bob/follow"))
            .bearer_auth(&alice)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 200);
    }

    let mut sent = Vec::new();
    for _ in 0..50 {
        sent = app.notifier.sent.lock().unwrap().clone();
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(sent, vec![("alice".to_string(), "bob".to_string())]);

    // Feed holds both posts, newest first, two per page.
    let feed: Value = app
        .client
        .get(app.url("/feed?page=1"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let ids: Vec<i64> = feed["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&bob_post) && ids.contains(&alice_post));
    assert_eq!(feed["has_next"], false);

    let beyond: Value = app
        .client
        .get(app.url("/feed?page=5"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(beyond["items"].as_array().unwrap().is_empty());

    // Hearting twice leaves a single heart.
    for _ in 0..2 {
        let heart: Value = app
            .client
            .post(app.url(&format!("/posts/{}/heart", bob_post)))
            .bearer_auth(&alice)
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(heart["hearts_count"], 1);
    }

    let post: Value = app
        .client
        .get(app.url(&format!("/posts/{}", bob_post)))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["hearted"], true);
    assert_eq!(post["author_nickname"], "bob");

    let missing_heart = app
        .client
        .post(app.url("/posts/999999/heart"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(missing_heart.status().as_u16(), 404);

    // Only the author may delete.
    let forbidden = app
        .client
        .delete(app.url(&format!("/posts/{}", bob_post)))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status().as_u16(), 403);

    let deleted = app
        .client
        .delete(app.url(&format!("/posts/{}", bob_post)))
        .bearer_auth(&bob)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let gone = app
        .client
        .get(app.url(&format!("/posts/{}", bob_post)))
        .send()
        .await
        .unwrap();
    assert_eq!(gone.status().as_u16(), 404);

    // Unfollow removes Bob from the profile's follower count.
    let response = app
        .client
        .delete(app.url("/users/bob/follow"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let profile: Value = app
        .client
        .get(app.url("/users/bob"))
        .bearer_auth(&alice)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(profile["followers_count"], 0);
    assert_eq!(profile["is_following"], false);
}

#[tokio::test]
async fn follow_rejects_self_and_unknown_users() {
    let app = spawn_app().await;
    let (carl, _) = app.login(Some("carl"), &unique_email("carl")).await;

    let own = app
        .client
        .post(app.url("/users/carl/follow"))
        .bearer_auth(&carl)
        .send()
        .await
        .unwrap();
    assert_eq!(own.status().as_u16(), 400);

    let unknown = app
        .client
        .post(app.url("/users/ghost/follow"))
        .bearer_auth(&carl)
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 404);
}

#[tokio::test]
async fn user_posts_are_paginated_and_unknown_users_404() {
    let app = spawn_app().await;
    let (dana, _) = app.login(Some("dana"), &unique_email("dana")).await;
    for i in 0..3 {
        app.create_post(&dana, &format!("post {}", i)).await;
    }

    let first: Value = app
        .client
        .get(app.url("/users/dana/posts"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(first["items"].as_array().unwrap().len(), 2);
    assert_eq!(first["has_next"], true);

    let second: Value = app
        .client
        .get(app.url("/users/dana/posts?page=2"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(second["items"].as_array().unwrap().len(), 1);
    assert_eq!(second["has_prev"], true);

    let missing = app.client.get(app.url("/users/nobody/posts")).send().await.unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn profile_edit_validates_and_detects_conflicts() {
    let app = spawn_app().await;
    let (erin, _) = app.login(Some("erin"), &unique_email("erin")).await;
    app.login(Some("frank"), &unique_email("frank")).await;

    let too_long = app
        .client
        .put(app.url("/profile"))
        .bearer_auth(&erin)
        .json(&json!({ "nickname": "erin", "about_me": "x".repeat(141) }))
        .send()
        .await
        .unwrap();
    assert_eq!(too_long.status().as_u16(), 400);

    let taken = app
        .client
        .put(app.url("/profile"))
        .bearer_auth(&erin)
        .json(&json!({ "nickname": "frank", "about_me": "hi" }))
        .send()
        .await
        .unwrap();
    assert_eq!(taken.status().as_u16(), 409);

    let ok: Value = app
        .client
        .put(app.url("/profile"))
        .bearer_auth(&erin)
        .json(&json!({ "nickname": "erin_2", "about_me": "x".repeat(140) }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ok["nickname"], "erin_2");
    assert_eq!(ok["about_me"].as_str().unwrap().len(), 140);
    assert!(ok["email"].as_str().unwrap().starts_with("erin_"));
}

#[tokio::test]
async fn search_is_exact_and_never_errors_on_no_results() {
    let app = spawn_app().await;
    app.login(Some("grace"), &unique_email("grace")).await;

    let hits: Vec<Value> = app
        .client
        .get(app.url("/search?q=grace"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0]["nickname"], "grace");

    let none: Vec<Value> = app
        .client
        .get(app.url("/search?q=gra"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn deleted_accounts_lose_their_session() {
    let app = spawn_app().await;
    let (hank, _) = app.login(Some("hank"), &unique_email("hank")).await;

    let deleted = app
        .client
        .delete(app.url("/profile"))
        .bearer_auth(&hank)
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let after = app
        .client
        .get(app.url("/profile"))
        .bearer_auth(&hank)
        .send()
        .await
        .unwrap();
    assert_eq!(after.status().as_u16(), 401);
}
