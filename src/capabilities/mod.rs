//! Capability contracts for optional subsystems
//!
//! Each subsystem that may be absent at runtime is reached only through a
//! trait object. A no-op variant implementing the same trait is bound in its
//! place through [`Registry::bind_or_replace`](crate::Registry::bind_or_replace),
//! so dependents never branch on whether the real subsystem is present.

pub mod auth;
pub mod licensing;
pub mod nlu;

pub use auth::{AuthStrategies, AuthStrategy, DummyAuthStrategies};
pub use licensing::{AuditReport, DummyLicensingService, LicenseInfo, LicenseStatus, LicensingService};
pub use nlu::{DummyNluProcess, WorkerProcess};

use crate::error::BoxError;
use thiserror::Error;

/// Failure reported by a capability implementation.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// The subsystem is not running or not installed
    #[error("{0} is unavailable")]
    Unavailable(&'static str),

    /// A request to the subsystem failed
    #[error("Request to {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: BoxError,
    },
}

pub type CapabilityResult<T> = std::result::Result<T, CapabilityError>;
