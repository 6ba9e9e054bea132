//! Registrations: what gets bound under an identifier
//!
//! A [`Registration`] pairs a [`ServiceId`] with a [`Strategy`], a [`Lifetime`]
//! and optional metadata. It is the unit that `Registry::bind`, the
//! override mechanism and module batches all consume.

use crate::{ServiceId, Strategy};

/// Service lifetime (the binding's scope)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Lifetime {
    /// Constructed once on first resolution, then shared
    Singleton,

    /// Constructed fresh on every resolution
    #[default]
    Transient,
}

/// A binding recipe ready to be placed in the binding table.
#[derive(Debug, Clone)]
pub struct Registration {
    pub(crate) id: ServiceId,
    pub(crate) strategy: Strategy,
    pub(crate) lifetime: Lifetime,
    pub(crate) tags: Vec<(String, String)>,
    pub(crate) eager: bool,
}

impl Registration {
    /// New transient registration.
    #[inline]
    pub fn new(id: ServiceId, strategy: impl Into<Strategy>) -> Self {
        Self {
            id,
            strategy: strategy.into(),
            lifetime: Lifetime::Transient,
            tags: Vec::new(),
            eager: false,
        }
    }

    #[inline]
    pub fn with_lifetime(mut self, lifetime: Lifetime) -> Self {
        self.lifetime = lifetime;
        self
    }

    #[inline]
    pub fn in_singleton_scope(self) -> Self {
        self.with_lifetime(Lifetime::Singleton)
    }

    #[inline]
    pub fn in_transient_scope(self) -> Self {
        self.with_lifetime(Lifetime::Transient)
    }

    /// Registration metadata, seeded into every request frame for this
    /// binding unless the request carries the same key.
    #[inline]
    pub fn tagged(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.push((key.into(), value.into()));
        self
    }

    /// Initialise at boot instead of on first use.
    #[inline]
    pub fn eager(mut self) -> Self {
        self.eager = true;
        self
    }

    #[inline]
    pub fn id(&self) -> ServiceId {
        self.id
    }

    #[inline]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    #[inline]
    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }
}

/// Shorthand for building a [`Registration`].
///
/// ```rust
/// use service_composer::{binding, Lifetime, Resolved, Result, Service, ServiceId};
///
/// const CONFIG: ServiceId = ServiceId::symbol("Config");
///
/// struct Config;
/// impl Service for Config {
///     fn create(_: &mut Resolved) -> Result<Self> { Ok(Config) }
/// }
///
/// let reg = binding!(singleton CONFIG => Config);
/// assert_eq!(reg.lifetime(), Lifetime::Singleton);
///
/// let reg = binding!(CONFIG => Config);
/// assert_eq!(reg.lifetime(), Lifetime::Transient);
/// ```
#[macro_export]
macro_rules! binding {
    (singleton $id:expr => $service:ty as $iface:ty) => {
        $crate::Registration::new(
            $id,
            $crate::Strategy::to_as::<$service, $iface>(|s| s as ::std::sync::Arc<$iface>),
        )
        .in_singleton_scope()
    };
    (singleton $id:expr => $service:ty) => {
        $crate::Registration::new($id, $crate::Strategy::to::<$service>()).in_singleton_scope()
    };
    ($id:expr => $service:ty as $iface:ty) => {
        $crate::Registration::new(
            $id,
            $crate::Strategy::to_as::<$service, $iface>(|s| s as ::std::sync::Arc<$iface>),
        )
    };
    ($id:expr => $service:ty) => {
        $crate::Registration::new($id, $crate::Strategy::to::<$service>())
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    const FLAG: ServiceId = ServiceId::symbol("Flag");

    #[test]
    fn test_defaults_to_transient() {
        let reg = Registration::new(FLAG, Strategy::constant(true));
        assert_eq!(reg.lifetime(), Lifetime::Transient);
        assert!(!reg.eager);
        assert!(reg.tags.is_empty());
    }

    #[test]
    fn test_builder_chain() {
        let reg = Registration::new(FLAG, Strategy::constant(true))
            .in_singleton_scope()
            .tagged("name", "Alpha")
            .eager();

        assert_eq!(reg.id(), FLAG);
        assert_eq!(reg.lifetime(), Lifetime::Singleton);
        assert!(reg.eager);
        assert_eq!(reg.tags, vec![("name".to_owned(), "Alpha".to_owned())]);
        assert_eq!(reg.strategy().kind(), "constant");
    }
}
