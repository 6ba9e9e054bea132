//! Error types for the service registry

use crate::ServiceId;
use thiserror::Error;

/// Boxed construction failure, kept `Send + Sync` so it can cross threads.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while binding or resolving services
#[derive(Error, Debug)]
pub enum DiError {
    /// `bind` was called for an identifier that already has a binding
    #[error("Service already bound: {service}")]
    DuplicateBinding { service: ServiceId },

    /// No binding exists for the identifier
    #[error("No binding for service: {service}")]
    UnknownBinding { service: ServiceId },

    /// The dependency chain revisits an identifier already under construction
    #[error("Circular dependency detected while resolving {service}: {path}")]
    CyclicDependency { service: ServiceId, path: String },

    /// The strategy itself failed to produce a value
    #[error("Failed to construct service {service}: {source}")]
    Construction {
        service: ServiceId,
        #[source]
        source: BoxError,
    },

    /// The resolved instance is not of the requested type
    #[error("Service {service} is not a {expected}")]
    TypeMismatch {
        service: ServiceId,
        expected: &'static str,
    },

    /// A declared dependency has no binding at boot verification time
    #[error("Service {service} depends on unbound service {dependency}")]
    MissingDependency {
        service: ServiceId,
        dependency: ServiceId,
    },

    /// The identifier is not part of the registry's declared catalog
    #[error("Service identifier not declared in catalog: {service}")]
    UndeclaredIdentifier { service: ServiceId },

    /// The same identifier was declared more than once
    #[error("Service identifier declared twice: {service}")]
    IdentifierCollision { service: ServiceId },

    /// The registry is locked and cannot be modified
    #[error("Registry is locked - cannot change bindings after boot")]
    Locked,

    /// A weak registry handle outlived its registry
    #[error("Registry has been dropped")]
    RegistryDropped,

    /// Boot configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DiError {
    /// Create an UnknownBinding error
    #[inline]
    pub fn unknown(service: ServiceId) -> Self {
        Self::UnknownBinding { service }
    }

    /// Create a DuplicateBinding error
    #[inline]
    pub fn duplicate(service: ServiceId) -> Self {
        Self::DuplicateBinding { service }
    }

    /// Wrap a strategy failure
    #[inline]
    pub fn construction(service: ServiceId, source: impl Into<BoxError>) -> Self {
        Self::Construction {
            service,
            source: source.into(),
        }
    }

    /// Create a TypeMismatch error for `T`
    #[inline]
    pub fn type_mismatch<T: ?Sized + 'static>(service: ServiceId) -> Self {
        Self::TypeMismatch {
            service,
            expected: std::any::type_name::<T>(),
        }
    }

    /// True for the one error the override mechanism recovers from
    #[inline]
    pub fn is_unknown_binding(&self) -> bool {
        matches!(self, Self::UnknownBinding { .. })
    }
}

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, DiError>;

#[cfg(test)]
mod tests {
    use super::*;

    const DATABASE: ServiceId = ServiceId::symbol("Database");

    #[test]
    fn test_display_messages() {
        assert_eq!(
            DiError::unknown(DATABASE).to_string(),
            "No binding for service: Symbol(Database)"
        );
        assert_eq!(
            DiError::duplicate(DATABASE).to_string(),
            "Service already bound: Symbol(Database)"
        );
    }

    #[test]
    fn test_construction_keeps_source() {
        use std::error::Error as _;

        let err = DiError::construction(DATABASE, "connection refused");
        assert!(err.to_string().contains("connection refused"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_is_unknown_binding() {
        assert!(DiError::unknown(DATABASE).is_unknown_binding());
        assert!(!DiError::duplicate(DATABASE).is_unknown_binding());
    }
}
