//! Logging setup for the composition root
//!
//! Installs a `tracing-subscriber` with JSON (production), pretty
//! (development) or compact output.
//!
//! # Features
//!
//! - `logging-json` - JSON structured output (default)
//! - `logging-pretty` - pretty output as the default format, even alongside
//!   `logging-json`
//!
//! # Example
//!
//! ```rust,ignore
//! use service_composer::logging;
//!
//! logging::builder()
//!     .info()
//!     .with_target_filter("service_composer")
//!     .pretty()
//!     .init();
//! ```
//!
//! `RUST_LOG`, when set, takes precedence over the configured level.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Logging format configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON structured logging (production default)
    #[cfg_attr(all(feature = "logging-json", not(feature = "logging-pretty")), default)]
    Json,
    /// Pretty colorful output (development)
    #[cfg_attr(any(feature = "logging-pretty", not(feature = "logging-json")), default)]
    Pretty,
    /// Compact single-line output
    Compact,
}

/// `[log]` section of the boot configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `trace`, `debug`, `info`, `warn` or `error`
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::default(),
        }
    }
}

/// Builder for logging configuration
#[derive(Debug, Clone)]
pub struct LoggingBuilder {
    level: Level,
    format: LogFormat,
    target: Option<&'static str>,
    with_file: bool,
    with_line_number: bool,
    with_thread_ids: bool,
    with_thread_names: bool,
}

impl Default for LoggingBuilder {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            format: LogFormat::default(),
            target: None,
            with_file: false,
            with_line_number: false,
            with_thread_ids: false,
            with_thread_names: false,
        }
    }
}

impl LoggingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder seeded from configuration.
    ///
    /// An unrecognised level falls back to `info`.
    pub fn from_settings(settings: &LogSettings) -> Self {
        let level = settings.level.parse().unwrap_or(Level::INFO);
        Self::new().with_level(level).with_format(settings.format)
    }

    /// Set the minimum log level
    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn trace(self) -> Self {
        self.with_level(Level::TRACE)
    }

    pub fn debug(self) -> Self {
        self.with_level(Level::DEBUG)
    }

    pub fn info(self) -> Self {
        self.with_level(Level::INFO)
    }

    pub fn warn(self) -> Self {
        self.with_level(Level::WARN)
    }

    pub fn error(self) -> Self {
        self.with_level(Level::ERROR)
    }

    /// Filter to only show logs from a specific target
    pub fn with_target_filter(mut self, target: &'static str) -> Self {
        self.target = Some(target);
        self
    }

    /// Only show registry logs
    pub fn registry_only(self) -> Self {
        self.with_target_filter("service_composer")
    }

    pub fn with_file(mut self) -> Self {
        self.with_file = true;
        self
    }

    pub fn with_line_number(mut self) -> Self {
        self.with_line_number = true;
        self
    }

    pub fn with_thread_ids(mut self) -> Self {
        self.with_thread_ids = true;
        self
    }

    pub fn with_thread_names(mut self) -> Self {
        self.with_thread_names = true;
        self
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn json(self) -> Self {
        self.with_format(LogFormat::Json)
    }

    pub fn pretty(self) -> Self {
        self.with_format(LogFormat::Pretty)
    }

    pub fn compact(self) -> Self {
        self.with_format(LogFormat::Compact)
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| match self.target {
            Some(target) => EnvFilter::new(format!("{}={}", target, self.level)),
            None => EnvFilter::new(self.level.to_string()),
        })
    }

    /// Install the subscriber globally.
    ///
    /// Returns `false` if a global subscriber was already installed.
    pub fn init(self) -> bool {
        let filter = self.filter();

        let result = match self.format {
            #[cfg(feature = "logging-json")]
            LogFormat::Json => {
                let layer = fmt::layer()
                    .json()
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
                    .with_thread_ids(self.with_thread_ids)
                    .with_thread_names(self.with_thread_names)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()
            }
            // Without the json feature, JSON requests fall back to pretty
            #[cfg(not(feature = "logging-json"))]
            LogFormat::Json | LogFormat::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
                    .with_thread_ids(self.with_thread_ids)
                    .with_thread_names(self.with_thread_names)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()
            }
            #[cfg(feature = "logging-json")]
            LogFormat::Pretty => {
                let layer = fmt::layer()
                    .pretty()
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
                    .with_thread_ids(self.with_thread_ids)
                    .with_thread_names(self.with_thread_names)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()
            }
            LogFormat::Compact => {
                let layer = fmt::layer()
                    .compact()
                    .with_file(self.with_file)
                    .with_line_number(self.with_line_number)
                    .with_thread_ids(self.with_thread_ids)
                    .with_thread_names(self.with_thread_names)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(filter)
                    .with(layer)
                    .try_init()
            }
        };

        result.is_ok()
    }
}

/// Create a new logging builder
pub fn builder() -> LoggingBuilder {
    LoggingBuilder::new()
}

/// Initialise logging from the `[log]` configuration section.
pub fn init(settings: &LogSettings) -> bool {
    LoggingBuilder::from_settings(settings).init()
}
