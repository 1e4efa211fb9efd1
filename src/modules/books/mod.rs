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
        routes::list_books,
        routes::search_books,
        routes::get_book,
        routes::create_book,
        routes::update_book,
        routes::delete_book
    ),
    tags((name = "Books", description = "Book catalogue"))
)]
struct BooksApi;

/// Book catalogue with category links.
pub struct BooksModule;

impl BooksModule {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Module for BooksModule {
    fn name(&self) -> &'static str {
        "books"
    }

    async fn init(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(ctx.db)
            .await?;
        tracing::info!(
            module = self.name(),
            environment = ?ctx.settings.environment,
            books = count,
            "books module initialized"
        );
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
            .route("/", get(routes::list_books).post(routes::create_book))
            .route("/search", get(routes::search_books))
            .route(
                "/{id}",
                get(routes::get_book)
                    .put(routes::update_book)
                    .delete(routes::delete_book),
            )
    }

    fn openapi(&self) -> Option<serde_json::Value> {
        serde_json::to_value(BooksApi::openapi()).ok()
    }

    fn migrations(&self) -> Vec<Migration> {
        vec![Migration {
            id: "001_init",
            up: r#"
            CREATE TABLE books (
                id          INTEGER PRIMARY KEY,
                title       TEXT NOT NULL,
                author      TEXT NOT NULL,
                isbn        TEXT NOT NULL UNIQUE,
                price       REAL NOT NULL CHECK (price >= 0),
                description TEXT,
                cover_image TEXT
            );
            CREATE TABLE books_categories (
                book_id     INTEGER NOT NULL REFERENCES books(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
                PRIMARY KEY (book_id, category_id)
            );
            CREATE INDEX idx_books_categories_category ON books_categories(category_id);
            "#,
        }]
    }
}

/// Create a new instance of the books module
pub fn create_module() -> std::sync::Arc<dyn Module> {
    std::sync::Arc::new(BooksModule::new())
}
