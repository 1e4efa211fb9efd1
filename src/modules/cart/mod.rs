pub mod models;
pub mod repository;
pub mod routes;

use async_trait::async_trait;
use axum::{
    routing::{get, put},
    Router,
};
use bookstore_kernel::{AppState, InitCtx, Migration, Module};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(routes::get_cart, routes::add_book, routes::update_item, routes::delete_item),
    tags((name = "Shopping cart", description = "The signed-in customer's cart"))
)]
struct CartApi;

/// Per-user shopping carts.
pub struct CartModule;

impl CartModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for CartModule {
    fn name(&self) -> &'static str {
        "cart"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "cart module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/", get(routes::get_cart).post(routes::add_book))
            .route(
                "/items/{cartItemId}",
                put(routes::update_item).delete(routes::delete_item),
            )
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(CartApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
            CREATE TABLE shopping_carts (
                id      INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL UNIQUE REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE TABLE cart_items (
                id       INTEGER PRIMARY KEY,
                cart_id  INTEGER NOT NULL REFERENCES shopping_carts(id) ON DELETE CASCADE,
                book_id  INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                quantity INTEGER NOT NULL CHECK (quantity > 0 AND quantity <= 2147483647),
                UNIQUE (cart_id, book_id)
            );
            "#,
        }]
    }
}

/// Create a new instance of the cart module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CartModule::new())
}
