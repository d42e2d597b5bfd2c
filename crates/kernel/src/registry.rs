use anyhow::Context;
use std::sync::Arc;

use bookshelf_store::IndexDefinition;

use crate::module::{InitCtx, Module};
use crate::settings::Settings;

/// Module registry driving the module lifecycle in registration order
pub struct ModuleRegistry {
    modules: Vec<Arc<dyn Module>>,
}

impl ModuleRegistry {
    /// Create a new module registry
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
        }
    }

    /// Register a module with the registry
    pub fn register(&mut self, module: Arc<dyn Module>) {
        self.modules.push(module);
    }

    /// Get all registered modules
    pub fn modules(&self) -> &[Arc<dyn Module>] {
        &self.modules
    }

    /// Get a module by name
    pub fn get_module(&self, name: &str) -> Option<&Arc<dyn Module>> {
        self.modules.iter().find(|module| module.name() == name)
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Initialize modules in registration order
    pub async fn init_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("initializing {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "initializing module");

            module
                .init(ctx)
                .await
                .with_context(|| format!("failed to initialize module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Start modules in registration order
    pub async fn start_modules(&self, ctx: &InitCtx<'_>) -> anyhow::Result<()> {
        tracing::info!("starting {} modules", self.modules.len());

        for module in &self.modules {
            tracing::info!(module = module.name(), "starting module");

            module
                .start(ctx)
                .await
                .with_context(|| format!("failed to start module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Stop modules in reverse order
    pub async fn stop_modules(&self) -> anyhow::Result<()> {
        tracing::info!("stopping {} modules", self.modules.len());

        for module in self.modules.iter().rev() {
            tracing::info!(module = module.name(), "stopping module");

            module
                .stop()
                .await
                .with_context(|| format!("failed to stop module '{}'", module.name()))?;
        }

        Ok(())
    }

    /// Collect index definitions from all modules, ordered by index name
    pub fn collect_indices(&self, settings: &Settings) -> Vec<IndexDefinition> {
        let mut indices: Vec<IndexDefinition> = self
            .modules
            .iter()
            .flat_map(|module| module.indices(settings))
            .collect();

        indices.sort_by(|a, b| a.name.cmp(&b.name));
        indices.dedup_by(|a, b| a.name == b.name);
        indices
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{AppState, IndexNames};
    use bookshelf_store::MemoryStore;
    use serde_json::json;
    use std::sync::Mutex;

    struct TestModule {
        name: &'static str,
        index: &'static str,
        events: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait::async_trait]
    impl Module for TestModule {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn init(&self, _ctx: &InitCtx<'_>) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("init:{}", self.name));
            Ok(())
        }

        fn indices(&self, _settings: &Settings) -> Vec<IndexDefinition> {
            vec![IndexDefinition::new(self.index, json!({"properties": {}}))]
        }

        async fn stop(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    fn registry(events: &Arc<Mutex<Vec<String>>>) -> ModuleRegistry {
        let mut registry = ModuleRegistry::new();
        for (name, index) in [("reviews", "reviews"), ("books", "books"), ("search", "books")] {
            registry.register(Arc::new(TestModule {
                name,
                index,
                events: events.clone(),
            }));
        }
        registry
    }

    #[test]
    fn test_module_registry_creation() {
        let registry = ModuleRegistry::new();
        assert!(registry.modules().is_empty());
        assert!(registry.get_module("books").is_none());
    }

    #[test]
    fn test_index_collection_is_sorted_and_deduplicated() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&events);

        let names: Vec<String> = registry
            .collect_indices(&Settings::default())
            .into_iter()
            .map(|def| def.name)
            .collect();

        assert_eq!(names, vec!["books", "reviews"]);
    }

    #[tokio::test]
    async fn test_module_lifecycle() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(&events);
        let settings = Settings::default();
        let state = AppState::new(
            Arc::new(MemoryStore::new()),
            IndexNames::from(&settings.store),
        );
        let ctx = InitCtx {
            settings: &settings,
            state: &state,
        };

        registry.init_modules(&ctx).await.unwrap();
        registry.start_modules(&ctx).await.unwrap();
        registry.stop_modules().await.unwrap();

        assert_eq!(registry.module_count(), 3);
        assert_eq!(
            *events.lock().unwrap(),
            vec![
                "init:reviews",
                "init:books",
                "init:search",
                "stop:search",
                "stop:books",
                "stop:reviews"
            ]
        );
    }
}
