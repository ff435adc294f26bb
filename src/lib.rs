// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod a11y;
pub mod app;
pub mod app_dirs;
pub mod config;
pub mod cursor;
pub mod error;
pub mod host;
pub mod logging;
pub mod page;
pub mod runtime;
pub mod scheduler;
pub mod timing;
pub mod transition;
pub mod typing;
pub mod ui;
