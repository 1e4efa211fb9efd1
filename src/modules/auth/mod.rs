pub mod models;
pub mod principal;
pub mod repository;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::post, Router};
use bookstore_authz::RoleName;
use bookstore_kernel::{AppState, InitCtx, Migration, Module};
use utoipa::OpenApi;

pub use principal::CurrentUser;

#[derive(OpenApi)]
#[openapi(
    paths(routes::register, routes::login),
    tags((name = "Authentication", description = "Registration and token issuance"))
)]
struct AuthApi;

/// Accounts, roles, and token issuance. The only module reachable without a
/// bearer token.
pub struct AuthModule;

impl AuthModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for AuthModule {
    fn name(&self) -> &'static str {
        "auth"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let roles = repository::RoleRepository::new(ctx.db.clone());
        for name in RoleName::ALL {
            if roles.find_by_name(name).await?.is_none() {
                anyhow::bail!("role {name} is missing from the roles table");
            }
        }

        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            token_ttl_secs = ctx.settings.auth.jwt_expiration_secs,
            "auth module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/registration", post(routes::register))
            .route("/login", post(routes::login))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(AuthApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![
            Migration {
                id: "001_init",
                up: r#"
                CREATE TABLE roles (
                    id   INTEGER PRIMARY KEY,
                    name TEXT NOT NULL UNIQUE
                );
                CREATE TABLE users (
                    id               INTEGER PRIMARY KEY,
                    email            TEXT NOT NULL UNIQUE,
                    password         TEXT NOT NULL,
                    first_name       TEXT NOT NULL,
                    last_name        TEXT NOT NULL,
                    shipping_address TEXT
                );
                CREATE TABLE users_roles (
                    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    role_id INTEGER NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
                    PRIMARY KEY (user_id, role_id)
                );
                "#,
            },
            Migration {
                id: "002_seed_roles",
                up: "INSERT INTO roles (id, name) VALUES (1, 'USER'), (2, 'ADMIN');",
            },
        ]
    }
}

/// Create a new instance of the auth module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(AuthModule::new())
}
