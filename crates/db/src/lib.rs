//! SQLite connection factory and the migration runner used by feature modules.

use std::str::FromStr;

use anyhow::Context;
use sqlx::error::ErrorKind;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::Row;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Connection pool shared across the application.
pub type DbPool = sqlx::SqlitePool;

/// Migration definition contributed by a module
#[derive(Debug, Clone)]
pub struct Migration {
    pub id: &'static str,
    pub up: &'static str,
}

const MIGRATIONS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS _migrations (
        module     TEXT NOT NULL,
        id         TEXT NOT NULL,
        applied_at TEXT NOT NULL,
        PRIMARY KEY (module, id)
    )
"#;

/// Open a pool for `url` with foreign keys enforced.
///
/// In-memory databases live only as long as their connection, so they get a
/// single connection that is never recycled.
pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<DbPool> {
    let options = SqliteConnectOptions::from_str(url)
        .with_context(|| format!("invalid database url '{url}'"))?
        .foreign_keys(true)
        .create_if_missing(true);

    let pool_options = if is_in_memory(url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(max_connections.max(1))
    };

    let pool = pool_options
        .connect_with(options)
        .await
        .with_context(|| format!("failed to connect to database '{url}'"))?;

    tracing::info!(target: "bookstore-db", url, "database pool ready");
    Ok(pool)
}

fn is_in_memory(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// Apply every migration not yet recorded in `_migrations`.
///
/// Each migration runs in its own transaction together with its bookkeeping
/// row. Returns the number of migrations applied.
pub async fn migrate(pool: &DbPool, migrations: &[(String, Migration)]) -> anyhow::Result<usize> {
    sqlx::query(MIGRATIONS_TABLE)
        .execute(pool)
        .await
        .context("failed to create migrations table")?;

    let mut applied = 0;
    for (module, migration) in migrations {
        let already_applied = sqlx::query("SELECT 1 FROM _migrations WHERE module = ? AND id = ?")
            .bind(module)
            .bind(migration.id)
            .fetch_optional(pool)
            .await?
            .is_some();
        if already_applied {
            continue;
        }

        tracing::info!(target: "bookstore-db", module = %module, id = migration.id, "applying migration");

        let mut tx = pool.begin().await?;
        sqlx::raw_sql(migration.up)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("migration {module}/{} failed", migration.id))?;
        sqlx::query("INSERT INTO _migrations (module, id, applied_at) VALUES (?, ?, ?)")
            .bind(module)
            .bind(migration.id)
            .bind(OffsetDateTime::now_utc().format(&Rfc3339)?)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        applied += 1;
    }

    Ok(applied)
}

/// List applied migrations as `(module, id)` pairs, oldest first.
pub async fn applied_migrations(pool: &DbPool) -> anyhow::Result<Vec<(String, String)>> {
    let rows = sqlx::query("SELECT module, id FROM _migrations ORDER BY applied_at, rowid")
        .fetch_all(pool)
        .await
        .context("failed to read applied migrations")?;

    rows.iter()
        .map(|row| Ok((row.try_get("module")?, row.try_get("id")?)))
        .collect()
}

/// Integrity constraint a rejected statement ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique,
    ForeignKey,
    Check,
}

/// Classify `error` when it wraps a constraint failure reported by SQLite.
///
/// Context added with `anyhow` is looked through.
pub fn constraint_violation(error: &anyhow::Error) -> Option<ConstraintViolation> {
    let Some(sqlx::Error::Database(database_error)) = error.downcast_ref::<sqlx::Error>() else {
        return None;
    };
    match database_error.kind() {
        ErrorKind::UniqueViolation => Some(ConstraintViolation::Unique),
        ErrorKind::ForeignKeyViolation => Some(ConstraintViolation::ForeignKey),
        ErrorKind::CheckViolation => Some(ConstraintViolation::Check),
        _ => None,
    }
}
