//! Books and reviews service.
//!
//! Resource modules, shared payload utilities, and the process bootstrap.

pub mod app;
pub mod modules;
pub mod utils;
