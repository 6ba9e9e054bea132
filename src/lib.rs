//! # Service Composer
//!
//! A service-composition runtime: one registry that constructs, wires,
//! overrides and tears down the graph of services a server is made of.
//!
//! ## Features
//!
//! - **Lock-free lookups** - the binding table is a `DashMap` keyed by [`ServiceId`]
//! - **At-most-once singletons** - first construction is serialised per binding
//! - **Contextual values** - a logger learns its name from whoever requested it
//! - **Override** - [`Registry::bind_or_replace`] swaps in stand-ins for optional subsystems
//! - **Module batches** - ordered loading with a boot-time [`ActivationGate`]
//! - **Lifecycle** - eager initialisation at boot, reverse-order teardown at exit
//!
//! ## Quick Start
//!
//! ```rust
//! use service_composer::prelude::*;
//! use service_composer::logger::{bind_logger, Logger, LOGGER};
//!
//! const DATABASE: ServiceId = ServiceId::symbol("Database");
//! const USERS: ServiceId = ServiceId::symbol("UserService");
//!
//! struct Database;
//! impl Service for Database {
//!     fn create(_: &mut Resolved) -> Result<Self> { Ok(Database) }
//! }
//!
//! struct UserService { logger: Arc<Logger>, db: Arc<Database> }
//! impl Service for UserService {
//!     fn dependencies() -> Vec<Inject> {
//!         vec![Inject::new(LOGGER), Inject::new(DATABASE)]
//!     }
//!     fn create(deps: &mut Resolved) -> Result<Self> {
//!         Ok(UserService { logger: deps.get(LOGGER)?, db: deps.get(DATABASE)? })
//!     }
//! }
//!
//! let registry = Registry::new();
//! bind_logger(&registry).unwrap();
//! registry.bind(binding!(singleton DATABASE => Database)).unwrap();
//! registry.bind(binding!(singleton USERS => UserService)).unwrap();
//! registry.run_lifecycle_hooks(&[]).unwrap();
//!
//! let users = registry.get::<UserService>(USERS).unwrap();
//! assert_eq!(users.logger.name(), "UserService");
//! ```
//!
//! ## Overriding
//!
//! ```rust
//! use service_composer::prelude::*;
//!
//! const MODE: ServiceId = ServiceId::key("mode");
//!
//! let registry = Registry::new();
//! assert_eq!(
//!     registry.bind_or_replace(Registration::new(MODE, Strategy::constant("full"))).unwrap(),
//!     OverrideOutcome::Added,
//! );
//! assert_eq!(
//!     registry.bind_or_replace(Registration::new(MODE, Strategy::constant("stub"))).unwrap(),
//!     OverrideOutcome::Replaced,
//! );
//! assert_eq!(*registry.get::<&str>(MODE).unwrap(), "stub");
//! ```

mod container;
pub mod context;
mod error;
mod factory;
mod id;
mod lifecycle;
mod module;
mod provider;
mod storage;

pub mod app;
pub mod capabilities;
pub mod config;
pub mod i18n;
pub mod logger;
pub mod logging;

pub use container::{OverrideOutcome, Registry, WeakRegistry};
pub use context::{Frame, NAME_TAG, ResolutionContext};
pub use error::*;
pub use factory::{
    AnyArc, Concrete, Constructor, Dispose, FactoryContext, Inject, Resolved, Service, Strategy,
    Teardown,
};
pub use id::{Catalog, ServiceId};
pub use lifecycle::LifecycleReport;
pub use module::{ActivationGate, RegistryModule};
pub use provider::*;

pub use std::sync::Arc;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ActivationGate, DiError, Inject, Lifetime, OverrideOutcome, Registration, Registry,
        RegistryModule, Resolved, Result, Service, ServiceId, Strategy, binding,
    };
    pub use std::sync::Arc;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use crate::context::NAME_TAG;
    use crate::logger::{LOGGER, Logger, bind_logger};

    const ALPHA: ServiceId = ServiceId::symbol("Alpha");
    const BETA: ServiceId = ServiceId::symbol("Beta");

    struct Consumer {
        logger: Arc<Logger>,
    }

    impl Service for Consumer {
        fn dependencies() -> Vec<Inject> {
            vec![Inject::new(LOGGER)]
        }

        fn create(deps: &mut Resolved) -> Result<Self> {
            Ok(Consumer {
                logger: deps.get(LOGGER)?,
            })
        }
    }

    #[test]
    fn test_contextual_logger_names() {
        let registry = Registry::new();
        bind_logger(&registry).unwrap();
        registry
            .bind(binding!(singleton ALPHA => Consumer).tagged(NAME_TAG, "Alpha"))
            .unwrap();
        registry.bind(binding!(BETA => Consumer)).unwrap();

        assert_eq!(registry.get::<Consumer>(ALPHA).unwrap().logger.name(), "Alpha");
        assert_eq!(registry.get::<Consumer>(BETA).unwrap().logger.name(), "Beta");
        assert_eq!(registry.get::<Logger>(LOGGER).unwrap().name(), "");
    }

    #[test]
    fn test_gated_module_then_override() {
        const X: ServiceId = ServiceId::symbol("X");

        let registry = Registry::new();
        let gate = ActivationGate::new("optional", false);
        registry
            .load_if(
                &gate,
                &[RegistryModule::new("optional")
                    .with(Registration::new(X, Strategy::constant(1u8)))],
            )
            .unwrap();
        assert!(registry.resolve(X).unwrap_err().is_unknown_binding());

        let outcome = registry
            .bind_or_replace(Registration::new(X, Strategy::constant(0u8)))
            .unwrap();
        assert_eq!(outcome, OverrideOutcome::Added);
        assert_eq!(*registry.get::<u8>(X).unwrap(), 0);
    }
}
