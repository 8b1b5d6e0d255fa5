#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::task::JoinHandle;
use uuid::Uuid;

use storerate::auth::{JwtKeys, PasswordHasher};
use storerate::config::DB_FILE;
use storerate::db::{Database, SqliteDatabase};
use storerate::server::{AppState, create_router};
use storerate::types::{Role, User};

pub const JWT_SECRET: &[u8] = b"integration-test-secret";
pub const ADMIN_NAME: &str = "Application System Administrator";
pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const ADMIN_PASSWORD: &str = "Admin@123";
pub const PASSWORD: &str = "Secret@123";

/// A server bound to an ephemeral port, running on the test's runtime.
pub struct TestServer {
    pub temp_dir: TempDir,
    pub base_url: String,
    pub admin_id: String,
    pub admin_token: String,
    pub client: reqwest::Client,
    server: JoinHandle<()>,
}

pub fn jwt_keys() -> JwtKeys {
    JwtKeys::new(JWT_SECRET, Duration::hours(1))
}

impl TestServer {
    pub async fn start() -> Self {
        let temp_dir = TempDir::new().expect("create temp dir");
        let db = SqliteDatabase::new(temp_dir.path().join(DB_FILE)).expect("open database");
        db.initialize().expect("initialize database");

        let now = Utc::now();
        let admin = User {
            id: Uuid::new_v4().to_string(),
            name: ADMIN_NAME.to_string(),
            email: ADMIN_EMAIL.to_string(),
            address: None,
            password_hash: PasswordHasher::new().hash(ADMIN_PASSWORD).expect("hash"),
            role: Role::Admin,
            created_at: now,
            updated_at: now,
        };
        db.create_user(&admin).expect("create admin");

        let state = Arc::new(AppState::new(Arc::new(db), jwt_keys()));
        let app = create_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let port = listener.local_addr().expect("local addr").port();
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });

        let mut server = Self {
            temp_dir,
            base_url: format!("http://127.0.0.1:{port}"),
            admin_id: admin.id,
            admin_token: String::new(),
            client: reqwest::Client::new(),
            server,
        };
        server.admin_token = server.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Logs in and returns the session token, panicking on failure.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("login request");
        assert_eq!(resp.status(), 200, "login failed for {email}");

        let body: Value = resp.json().await.expect("login body");
        body["token"].as_str().expect("token").to_string()
    }

    /// Signs up a USER account and returns its id.
    pub async fn signup_user(&self, name: &str, email: &str) -> String {
        let resp = self
            .client
            .post(self.url("/api/auth/signup"))
            .json(&json!({
                "name": name,
                "email": email,
                "address": "12 Market Street",
                "password": PASSWORD,
            }))
            .send()
            .await
            .expect("signup request");
        assert_eq!(resp.status(), 201, "signup failed for {email}");

        let body: Value = resp.json().await.expect("signup body");
        body["user"]["id"].as_str().expect("user id").to_string()
    }

    /// Signs up an OWNER with a store and returns `(owner_id, store_id)`.
    pub async fn signup_owner(&self, name: &str, email: &str, store_name: &str) -> (String, String) {
        let resp = self
            .client
            .post(self.url("/api/auth/signup-owner"))
            .json(&json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "storeName": store_name,
                "storeAddress": "1 Harbour Road",
            }))
            .send()
            .await
            .expect("owner signup request");
        assert_eq!(resp.status(), 201, "owner signup failed for {email}");

        let body: Value = resp.json().await.expect("owner signup body");
        (
            body["owner"]["id"].as_str().expect("owner id").to_string(),
            body["store"]["id"].as_str().expect("store id").to_string(),
        )
    }

    pub async fn rate(&self, token: &str, store_id: &str, value: Value) -> reqwest::Response {
        self.client
            .post(self.url(&format!("/api/stores/{store_id}/ratings")))
            .bearer_auth(token)
            .json(&json!({ "value": value }))
            .send()
            .await
            .expect("rating request")
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request")
    }

    pub async fn delete(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .delete(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("delete request")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.server.abort();
    }
}
