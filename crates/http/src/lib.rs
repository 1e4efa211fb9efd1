//! HTTP server facade for the bookstore: Axum wiring, error envelope,
//! request validation, pagination, and OpenAPI aggregation.

use anyhow::Context;
use axum::{routing::get, Router};

use bookstore_kernel::{AppState, ModuleRegistry};

pub mod error;
pub mod pagination;
pub mod router;
pub mod validation;

pub use error::AppError;
pub use pagination::{Page, PageRequest};
pub use validation::{ValidJson, ValidPath, ValidQuery, Validate, Violations};

use router::RouterBuilder;

/// Start the HTTP server and serve until Ctrl-C.
pub async fn start_server(registry: &ModuleRegistry, state: AppState) -> anyhow::Result<()> {
    let host = state.settings.server.host.clone();
    let port = state.settings.server.port;

    tracing::info!("starting HTTP server on {}:{}", host, port);

    let app = build_router(registry, state);

    let listener = tokio::net::TcpListener::bind(format!("{}:{}", host, port))
        .await
        .context("failed to bind to address")?;

    tracing::info!("HTTP server listening on http://{}:{}", host, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, state: AppState) -> Router {
    let timeout_ms = state.settings.server.request_timeout_ms;
    let mut router_builder = RouterBuilder::new().route("/healthz", get(health_check));

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under /api/{}",
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    // Layers wrap only the routes added before them, so they go last.
    router_builder
        .with_openapi(registry)
        .with_timeout(timeout_ms)
        .with_cors()
        .with_tracing()
        .with_request_id()
        .build(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "ok"
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
