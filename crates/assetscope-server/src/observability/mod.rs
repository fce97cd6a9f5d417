//! Observability infrastructure for assetscope.
//!
//! Currently structured logging only.

mod logging;

pub use logging::{create_json_layer, init_logging, LoggingConfig};
