//! Process bootstrap: store handle, module registry, index check, HTTP server.

use std::sync::Arc;

use anyhow::Context;
use bookshelf_kernel::{settings::Settings, AppState, IndexNames, InitCtx, ModuleRegistry};
use bookshelf_store::{BootstrapReport, DocumentStore, OpenSearchStore};

use crate::modules;

/// Registry holding every service module.
pub fn registry() -> ModuleRegistry {
    let mut registry = ModuleRegistry::new();
    modules::register_all(&mut registry);
    registry
}

/// Store client for the configured endpoint.
pub fn connect(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    let store = OpenSearchStore::new(&settings.store.endpoint)
        .with_context(|| format!("invalid store endpoint '{}'", settings.store.endpoint))?;
    Ok(Arc::new(store))
}

/// Create the indices the registered modules declare and report the outcome.
pub async fn bootstrap(
    registry: &ModuleRegistry,
    settings: &Settings,
    store: &dyn DocumentStore,
) -> BootstrapReport {
    let definitions = registry.collect_indices(settings);
    let report = bookshelf_store::ensure_indices(store, &definitions).await;
    tracing::info!(
        created = ?report.created,
        existing = ?report.existing,
        failed = report.failed.len(),
        "index bootstrap finished"
    );
    report
}

/// Run the service until shutdown.
///
/// Index bootstrap failures are logged and the service starts anyway;
/// requests against a missing index then fail individually.
pub async fn serve(settings: Settings) -> anyhow::Result<()> {
    let store = connect(&settings)?;
    let state = AppState::new(store, IndexNames::from(&settings.store));
    let registry = registry();
    let ctx = InitCtx {
        settings: &settings,
        state: &state,
    };

    registry.init_modules(&ctx).await?;

    let report = bootstrap(&registry, &settings, state.store.as_ref()).await;
    if !report.is_ok() {
        tracing::warn!(
            failed = report.failed.len(),
            "starting with missing indices"
        );
    }

    registry.start_modules(&ctx).await?;

    let served = bookshelf_http::start_server(&registry, &settings, state.clone()).await;
    registry.stop_modules().await?;
    served
}

/// Create missing indices once and fail if any could not be created.
pub async fn ensure_indices(settings: &Settings) -> anyhow::Result<BootstrapReport> {
    let store = connect(settings)?;
    let report = bootstrap(&registry(), settings, store.as_ref()).await;
    if let Some((index, err)) = report.failed.first() {
        anyhow::bail!(
            "{} index(es) could not be created, first failure on '{index}': {err}",
            report.failed.len()
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_store::MemoryStore;

    #[test]
    fn registry_holds_every_module() {
        let registry = registry();

        assert_eq!(registry.module_count(), 4);
        for name in ["books", "reviews", "search", "analytics"] {
            assert!(registry.get_module(name).is_some(), "missing {name}");
        }
    }

    #[tokio::test]
    async fn bootstrap_creates_both_indices_once() {
        let settings = Settings::default();
        let store = MemoryStore::new();
        let registry = registry();

        let first = bootstrap(&registry, &settings, &store).await;
        let second = bootstrap(&registry, &settings, &store).await;

        assert_eq!(first.created, vec!["books".to_string(), "reviews".to_string()]);
        assert!(second.created.is_empty());
        assert_eq!(second.existing.len(), 2);
    }

    #[test]
    fn bad_endpoint_is_rejected() {
        let mut settings = Settings::default();
        settings.store.endpoint = "not a url".to_string();

        assert!(connect(&settings).is_err());
    }
}
