use anyhow::Context;
use bookshelf_kernel::settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().with_context(|| "failed to load bookshelf settings")?;
    let _telemetry = bookshelf_telemetry::init(&settings.telemetry)?;

    tracing::info!(
        env = ?settings.environment,
        store = %settings.store.endpoint,
        "bookshelf-app bootstrap starting"
    );

    bookshelf_app::app::serve(settings).await
}
