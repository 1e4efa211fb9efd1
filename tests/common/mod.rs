#![allow(dead_code)]

use axum::{
    body::{Body, Bytes},
    http::{header, Method, Request, StatusCode},
    Router,
};
use bookstore_app::Application;
use bookstore_kernel::Settings;
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tower::ServiceExt;

pub const ADD_CATEGORIES: &str = include_str!("../fixtures/categories/add-categories.sql");
pub const CLEAR_CATEGORIES: &str = include_str!("../fixtures/categories/clear-categories.sql");
pub const ADD_BOOKS: &str = include_str!("../fixtures/books/add-books.sql");
pub const CLEAR_BOOKS: &str = include_str!("../fixtures/books/clear-books.sql");
pub const ADD_USERS: &str = include_str!("../fixtures/users/add-users.sql");
pub const CLEAR_USERS: &str = include_str!("../fixtures/users/clear-users.sql");
pub const ADD_CART_ITEMS: &str = include_str!("../fixtures/cart/add-cart-items.sql");
pub const CLEAR_CART_ITEMS: &str = include_str!("../fixtures/cart/clear-cart-items.sql");

pub const USER_EMAIL: &str = "user1@email.com";
pub const OTHER_USER_EMAIL: &str = "user2@email.com";
pub const ADMIN_EMAIL: &str = "admin@admin.com";

/// The full router over a private in-memory database.
pub struct TestApp {
    pub app: Application,
    router: Router,
}

impl TestApp {
    /// Boot the application and run `fixtures` in order.
    pub async fn spawn(fixtures: &[&str]) -> Self {
        let mut settings = Settings::default();
        settings.database.url = "sqlite::memory:".to_string();
        settings.database.max_connections = 1;
        settings.auth.bcrypt_cost = 4;

        let app = bookstore_app::bootstrap(settings).await.expect("bootstrap");
        let router = app.router();
        let test_app = Self { app, router };
        for fixture in fixtures {
            test_app.run_sql(fixture).await;
        }
        test_app
    }

    pub async fn run_sql(&self, sql: &str) {
        sqlx::raw_sql(sql)
            .execute(&self.app.state.db)
            .await
            .expect("fixture script");
    }

    /// A token for `email`, minted the way the login endpoint does.
    pub fn token_for(&self, email: &str) -> String {
        self.app.state.tokens.generate(email).expect("token")
    }

    pub fn user_token(&self) -> String {
        self.token_for(USER_EMAIL)
    }

    pub fn admin_token(&self) -> String {
        self.token_for(ADMIN_EMAIL)
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.expect("infallible");
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.into_body().collect().await.expect("body").to_bytes();
        TestResponse { status, headers, body }
    }

    pub async fn call(&self, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).expect("request")).await
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.call(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.call(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.call(Method::PUT, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.call(Method::DELETE, uri, Some(token), None).await
    }
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: axum::http::HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).unwrap_or_else(|e| {
            panic!(
                "body is not the expected JSON ({e}): {}",
                String::from_utf8_lossy(&self.body)
            )
        })
    }

    pub fn value(&self) -> Value {
        self.json()
    }

    /// The `error.code` of an error envelope.
    pub fn error_code(&self) -> String {
        self.value()["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    /// Fields named in the `details` of a validation error.
    pub fn error_fields(&self) -> Vec<String> {
        self.value()["error"]["details"]
            .as_array()
            .map(|details| {
                details
                    .iter()
                    .filter_map(|d| d["field"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
