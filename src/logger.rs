//! Named loggers injected by caller identity
//!
//! Three bindings cooperate:
//!
//! - [`LOGGER_NAME`] is a dynamic value computed from the resolution chain by
//!   [`logger_name`](crate::context::logger_name)
//! - [`LOGGER`] is a transient [`Logger`] built from that name
//! - [`LOGGER_PROVIDER`] hands out a [`LoggerProvider`] for code that needs a
//!   logger with an explicit name at runtime
//!
//! A service that declares `Inject::new(LOGGER)` receives a logger named after
//! itself without saying so.

use crate::context::{NAME_TAG, logger_name};
use crate::{
    Inject, Registration, Registry, Resolved, Result, Service, ServiceId, Strategy, WeakRegistry,
};
use std::sync::Arc;

pub const LOGGER: ServiceId = ServiceId::symbol("Logger");
pub const LOGGER_NAME: ServiceId = ServiceId::symbol("Logger_Name");
pub const LOGGER_PROVIDER: ServiceId = ServiceId::symbol("LoggerProvider");

/// Logger carrying the name of the service it was injected into.
///
/// Every event is forwarded to `tracing` with a `logger` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Logger {
    name: String,
}

impl Logger {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn debug(&self, message: &str) {
        tracing::debug!(target: "service_composer", logger = %self.name, "{message}");
    }

    pub fn info(&self, message: &str) {
        tracing::info!(target: "service_composer", logger = %self.name, "{message}");
    }

    pub fn warn(&self, message: &str) {
        tracing::warn!(target: "service_composer", logger = %self.name, "{message}");
    }

    pub fn error(&self, message: &str) {
        tracing::error!(target: "service_composer", logger = %self.name, "{message}");
    }
}

impl Service for Logger {
    fn dependencies() -> Vec<Inject> {
        vec![Inject::new(LOGGER_NAME)]
    }

    fn create(deps: &mut Resolved) -> Result<Self> {
        let name = deps.get::<String>(LOGGER_NAME)?;
        Ok(Logger::new(name.as_str()))
    }
}

/// Creates loggers with an explicit name.
///
/// Holds a weak handle so a provider stored inside a singleton does not keep
/// the registry alive.
#[derive(Debug, Clone)]
pub struct LoggerProvider {
    registry: WeakRegistry,
}

impl LoggerProvider {
    pub fn new(registry: &Registry) -> Self {
        Self {
            registry: registry.downgrade(),
        }
    }

    /// Tagged resolution of [`LOGGER`] with `name`.
    pub fn get(&self, name: &str) -> Result<Arc<Logger>> {
        self.registry
            .upgrade()?
            .get_tagged::<Logger>(LOGGER, NAME_TAG, name)
    }
}

/// The three logger registrations.
pub fn logger_registrations() -> Vec<Registration> {
    vec![
        Registration::new(LOGGER_NAME, Strategy::dynamic(logger_name)),
        Registration::new(LOGGER, Strategy::to::<Logger>()),
        Registration::new(
            LOGGER_PROVIDER,
            Strategy::factory(|cx| Ok(LoggerProvider::new(cx.registry()))),
        )
        .in_singleton_scope(),
    ]
}

/// Bind the logger registrations into `registry`.
pub fn bind_logger(registry: &Registry) -> Result<()> {
    logger_registrations()
        .into_iter()
        .try_for_each(|reg| registry.bind(reg))
}
