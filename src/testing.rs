use bookstore_db::DbPool;

use crate::app::registered_modules;

/// A fresh in-memory database with every module's migrations applied.
pub async fn migrated_pool() -> DbPool {
    let pool = bookstore_db::connect("sqlite::memory:", 1)
        .await
        .expect("in-memory database");
    let registry = registered_modules().expect("modules register");
    bookstore_db::migrate(&pool, &registry.collect_migrations())
        .await
        .expect("migrations apply");
    pool
}
