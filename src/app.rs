use anyhow::Context;
use axum::Router;
use bookstore_db::DbPool;
use bookstore_kernel::{
    settings::{LogFormat, TelemetrySettings},
    AppState, InitCtx, ModuleRegistry, Settings,
};

use crate::modules;

/// A migrated database, initialized modules and the shared request state.
pub struct Application {
    pub registry: ModuleRegistry,
    pub state: AppState,
}

/// Connect to the database, apply pending migrations and initialize every
/// module.
pub async fn bootstrap(settings: Settings) -> anyhow::Result<Application> {
    let (db, registry) = open_database(&settings).await?;

    let ctx = InitCtx {
        settings: &settings,
        db: &db,
    };
    registry.init_modules(&ctx).await?;

    Ok(Application {
        registry,
        state: AppState::new(settings, db),
    })
}

/// Apply pending migrations without initializing modules. Returns how many
/// were applied.
pub async fn migrate(settings: &Settings) -> anyhow::Result<usize> {
    let db = connect(settings).await?;
    let registry = registered_modules()?;
    let applied = bookstore_db::migrate(&db, &registry.collect_migrations()).await?;
    db.close().await;
    Ok(applied)
}

async fn open_database(settings: &Settings) -> anyhow::Result<(DbPool, ModuleRegistry)> {
    let db = connect(settings).await?;
    let registry = registered_modules()?;

    let applied = bookstore_db::migrate(&db, &registry.collect_migrations()).await?;
    tracing::info!(applied, modules = registry.module_count(), "database migrated");
    Ok((db, registry))
}

async fn connect(settings: &Settings) -> anyhow::Result<DbPool> {
    bookstore_db::connect(&settings.database.url, settings.database.max_connections)
        .await
        .with_context(|| format!("failed to open database {}", settings.database.url))
}

pub(crate) fn registered_modules() -> anyhow::Result<ModuleRegistry> {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry)?;
    Ok(registry)
}

impl Application {
    /// The complete HTTP application, without binding a socket.
    pub fn router(&self) -> Router {
        bookstore_http::build_router(&self.registry, self.state.clone())
    }

    /// Start modules, serve until Ctrl-C, then stop modules in reverse order.
    pub async fn serve(self) -> anyhow::Result<()> {
        let ctx = InitCtx {
            settings: &self.state.settings,
            db: &self.state.db,
        };
        self.registry.start_modules(&ctx).await?;

        let served = bookstore_http::start_server(&self.registry, self.state.clone()).await;
        if let Err(e) = self.registry.stop_modules().await {
            tracing::error!(error = ?e, "module shutdown failed");
        }
        served
    }
}

/// Install the tracing subscriber described by `settings`.
pub fn init_telemetry(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let format = match settings.log_format {
        LogFormat::Pretty => bookstore_telemetry::Format::Pretty,
        LogFormat::Json => bookstore_telemetry::Format::Json,
    };
    bookstore_telemetry::init(format, &settings.filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn in_memory() -> Settings {
        let mut settings = Settings::default();
        settings.database.url = "sqlite::memory:".to_string();
        settings.database.max_connections = 1;
        settings
    }

    #[tokio::test]
    async fn bootstrap_registers_every_module() {
        let app = bootstrap(in_memory()).await.unwrap();
        let names: Vec<_> = app.registry.modules().map(|m| m.name()).collect();
        assert_eq!(names, vec!["auth", "categories", "books", "cart"]);

        let applied = bookstore_db::applied_migrations(&app.state.db).await.unwrap();
        assert_eq!(applied.len(), 5);
    }

    #[tokio::test]
    async fn migrate_reports_applied_count() {
        assert_eq!(migrate(&in_memory()).await.unwrap(), 5);
    }
}
