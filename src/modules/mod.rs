pub mod analytics;
pub mod books;
pub mod reviews;
pub mod search;
#[cfg(test)]
pub(crate) mod testing;

use bookshelf_kernel::ModuleRegistry;

/// Register all service modules with the registry
pub fn register_all(registry: &mut ModuleRegistry) {
    registry.register(books::create_module());
    registry.register(reviews::create_module());
    registry.register(std::sync::Arc::new(search::SearchModule::new()));
    registry.register(std::sync::Arc::new(analytics::AnalyticsModule::new()));
}
