#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use fintrack::auth::AuthService;
use fintrack::cache::{MemorySessionCache, SessionCache, session_key};
use fintrack::db::Database;
use fintrack::jwt::{JwtConfig, TokenLifetimes};
use fintrack::password::CredentialVerifier;
use fintrack::{ServerConfig, create_app};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"integration-test-secret-0123456789abcdef";

/// Cheap bcrypt cost so tests stay fast.
const TEST_BCRYPT_COST: u32 = 4;

/// Application wired against an in-memory database and marker store.
pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub cache: MemorySessionCache,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_rate_limit(1000).await
    }

    pub async fn with_rate_limit(login_rate_per_minute: u32) -> Self {
        let db = Database::open(":memory:")
            .await
            .expect("Failed to open test database");
        let cache = MemorySessionCache::new();
        let config = ServerConfig {
            db: db.clone(),
            cache: Arc::new(cache.clone()),
            jwt_secret: TEST_SECRET.to_vec(),
            lifetimes: TokenLifetimes::default(),
            verifier: verifier(),
            login_rate_per_minute,
        };

        Self {
            app: create_app(&config),
            db,
            cache,
        }
    }

    /// A lifecycle manager sharing this app's stores.
    pub fn service(&self) -> AuthService {
        AuthService::new(
            self.db.clone(),
            Arc::new(self.cache.clone()),
            Arc::new(jwt()),
            verifier(),
        )
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        bearer: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = bearer {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(body), None).await
    }

    pub async fn get_authed(&self, uri: &str, access_token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, None, Some(access_token)).await
    }

    /// Register a user and return its id.
    pub async fn register(&self, email: &str, password: &str) -> i64 {
        let (status, body) = self
            .post(
                "/auth/register",
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        body["id"].as_i64().unwrap()
    }

    /// Log in and return `(access_token, refresh_token)`.
    pub async fn login(&self, email: &str, password: &str) -> (String, String) {
        let (status, body) = self
            .post("/auth/login", json!({ "email": email, "password": password }))
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        (
            body["access_token"].as_str().unwrap().to_string(),
            body["refresh_token"].as_str().unwrap().to_string(),
        )
    }

    /// Register and log in, returning `(user_id, access_token, refresh_token)`.
    pub async fn signed_in_user(&self, email: &str) -> (i64, String, String) {
        let user_id = self.register(email, "secret1").await;
        let (access, refresh) = self.login(email, "secret1").await;
        (user_id, access, refresh)
    }

    pub async fn refresh(&self, refresh_token: &str) -> (StatusCode, Value) {
        self.post("/auth/refresh", json!({ "refresh_token": refresh_token }))
            .await
    }

    pub async fn marker_exists(&self, user_id: i64, refresh_token: &str) -> bool {
        self.cache
            .check_valid(&session_key(user_id, refresh_token))
            .await
            .unwrap()
            > 0
    }

    pub async fn durable_row_exists(&self, refresh_token: &str) -> bool {
        self.db
            .sessions()
            .get_by_token(refresh_token)
            .await
            .unwrap()
            .is_some()
    }
}

pub fn jwt() -> JwtConfig {
    JwtConfig::new(TEST_SECRET, TokenLifetimes::default())
}

pub fn verifier() -> CredentialVerifier {
    CredentialVerifier::with_cost(TEST_BCRYPT_COST).unwrap()
}
