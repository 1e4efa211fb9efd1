use anyhow::Context;
use bookstore_kernel::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load bookstore settings")?;
    bookstore_app::init_telemetry(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        db = %settings.database.url,
        "bookstore bootstrap starting"
    );

    let app = bookstore_app::bootstrap(settings).await?;
    tracing::info!("bookstore bootstrap complete");
    app.serve().await
}
