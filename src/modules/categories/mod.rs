pub mod models;
pub mod repository;
pub mod routes;

use async_trait::async_trait;
use axum::{routing::get, Router};
use bookstore_kernel::{AppState, InitCtx, Migration, Module};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::list_categories,
        routes::get_category,
        routes::list_category_books,
        routes::create_category,
        routes::update_category,
        routes::delete_category
    ),
    tags((name = "Categories", description = "Book categories"))
)]
struct CategoriesApi;

pub struct CategoriesModule;

impl CategoriesModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for CategoriesModule {
    fn name(&self) -> &'static str {
        "categories"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            "categories module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/", get(routes::list_categories).post(routes::create_category))
            .route(
                "/{id}",
                get(routes::get_category)
                    .put(routes::update_category)
                    .delete(routes::delete_category),
            )
            .route("/{id}/books", get(routes::list_category_books))
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(CategoriesApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
            CREATE TABLE categories (
                id          INTEGER PRIMARY KEY,
                name        TEXT NOT NULL UNIQUE,
                description TEXT
            );
            "#,
        }]
    }
}

/// Create a new instance of the categories module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(CategoriesModule::new())
}
