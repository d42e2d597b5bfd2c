//! Core traits, settings, and module registry shared by every bookshelf crate.

pub mod module;
pub mod registry;
pub mod settings;

pub use module::{AppState, IndexNames, InitCtx, Module};
pub use registry::ModuleRegistry;
