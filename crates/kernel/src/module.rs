use async_trait::async_trait;
use axum::Router;
use bookstore_db::{DbPool, Migration};

use crate::settings::Settings;
use crate::state::AppState;

/// What a module sees while the application boots: the loaded settings and
/// an already migrated pool.
pub struct InitCtx<'a> {
    pub settings: &'a Settings,
    pub db: &'a DbPool,
}

/// A feature area of the bookstore (accounts, catalogue, carts).
///
/// A module owns its tables through [`Module::migrations`] and its HTTP
/// surface through [`Module::routes`], which the server nests under
/// `/api/{name}`.
#[async_trait]
pub trait Module: Sync + Send {
    /// Registry key and route prefix. Must be unique.
    fn name(&self) -> &'static str;

    /// Runs once after every module's migrations have been applied.
    async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    fn routes(&self) -> Router<AppState> {
        Router::new()
    }

    /// OpenAPI fragment with paths relative to the module prefix.
    fn openapi(&self) -> Option<serde_json::Value> {
        None
    }

    /// Schema changes owned by this module, applied in the order returned.
    fn migrations(&self) -> Vec<Migration> {
        vec![]
    }

    /// Runs after the router is built and before the listener accepts
    /// connections.
    async fn start(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs on shutdown, in reverse registration order.
    async fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
