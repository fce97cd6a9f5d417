//! Structured logging setup.
//!
//! Filtering decisions are logged by the domain crate through `tracing`;
//! this module installs the subscriber that renders them, as JSON in
//! production or pretty text during development.
//!
//! ```json
//! {"timestamp":"...","level":"DEBUG","target":"assetscope_domain::query","fields":{"message":"query short-circuited","recognizer":"exact","query":"asset_type:survey"}}
//! ```

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::config::{ConfigLoadError, LoggingSettings};

/// Logging subscriber options.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// JSON lines (true) or pretty text (false)
    pub json_format: bool,
    /// Level used when `RUST_LOG` is unset
    pub default_level: Level,
    /// Emit span enter/exit events, useful to follow a request through the
    /// access and search filters
    pub include_spans: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            json_format: false,
            default_level: Level::INFO,
            include_spans: false,
        }
    }
}

impl LoggingConfig {
    /// Derives subscriber options from the `logging` config section.
    pub fn from_settings(settings: &LoggingSettings) -> Result<Self, ConfigLoadError> {
        let default_level =
            Level::from_str(&settings.level).map_err(|_| ConfigLoadError::Invalid {
                message: format!("logging.level is not a level: {}", settings.level),
            })?;
        Ok(Self {
            json_format: settings.json,
            default_level,
            include_spans: false,
        })
    }

    pub fn with_spans(mut self) -> Self {
        self.include_spans = true;
        self
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(config: LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_level.to_string()));

    let span_events = if config.include_spans {
        FmtSpan::ENTER | FmtSpan::EXIT
    } else {
        FmtSpan::NONE
    };

    if config.json_format {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .json()
                .with_span_events(span_events)
                .with_current_span(true)
                .with_target(true)
                .with_file(false)
                .with_line_number(false),
        );
        let _ = tracing::subscriber::set_global_default(subscriber);
    } else {
        let subscriber = tracing_subscriber::registry().with(filter).with(
            fmt::layer()
                .pretty()
                .with_span_events(span_events)
                .with_target(true),
        );
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

/// A JSON subscriber writing to `writer`, for capturing logs in tests.
pub fn create_json_layer<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'writer> tracing_subscriber::fmt::MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::registry()
        .with(EnvFilter::new("trace"))
        .with(
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_current_span(true),
        )
}
