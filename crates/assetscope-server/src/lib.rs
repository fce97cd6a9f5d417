//! assetscope-server: Configuration, logging and request wiring
//!
//! This crate assembles the domain filters into request handlers:
//! - Configuration loading (defaults, YAML, environment)
//! - Structured logging setup
//! - List handler that turns raw request parameters into filtered records
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              assetscope-server              │
//! ├─────────────────────────────────────────────┤
//! │  config.rs      - Configuration management  │
//! │  observability/ - Logging setup             │
//! │  handlers/      - Request handlers          │
//! │    list.rs        - Filtered reads          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handlers;
pub mod observability;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::{ListHandler, RawParams};
pub use observability::{init_logging, LoggingConfig};
