//! Service identifiers
//!
//! A [`ServiceId`] is an opaque, `Copy` token naming a service. Identifiers are
//! declared as constants by the composition root, so the full set is known at
//! compile time and can be collected into a [`Catalog`].

use crate::{DiError, Result};
use ahash::RandomState;
use std::collections::HashSet;

/// How an identifier renders as text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum IdKind {
    /// Unique symbol, rendered as `Symbol(<name>)`
    Symbol,
    /// Plain string key, rendered as-is
    Key,
}

/// Globally unique service identifier.
///
/// # Examples
///
/// ```rust
/// use service_composer::ServiceId;
///
/// const DATABASE: ServiceId = ServiceId::symbol("Database");
/// const LEGACY: ServiceId = ServiceId::key("nlu-server");
///
/// assert_eq!(DATABASE.to_string(), "Symbol(Database)");
/// assert_eq!(LEGACY.to_string(), "nlu-server");
/// assert_ne!(ServiceId::symbol("nlu"), ServiceId::key("nlu"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId {
    kind: IdKind,
    name: &'static str,
}

impl ServiceId {
    /// Symbol-like identifier.
    #[inline]
    pub const fn symbol(name: &'static str) -> Self {
        Self {
            kind: IdKind::Symbol,
            name,
        }
    }

    /// Plain string key (legacy-style identifier).
    #[inline]
    pub const fn key(name: &'static str) -> Self {
        Self {
            kind: IdKind::Key,
            name,
        }
    }

    /// The bare name, without decoration.
    #[inline]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Whether this identifier is symbol-like.
    #[inline]
    pub const fn is_symbol(&self) -> bool {
        matches!(self.kind, IdKind::Symbol)
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            IdKind::Symbol => write!(f, "Symbol({})", self.name),
            IdKind::Key => f.write_str(self.name),
        }
    }
}

/// The closed set of identifiers a registry accepts.
///
/// When a registry carries a catalog, binding an identifier outside of it
/// fails with [`DiError::UndeclaredIdentifier`].
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    ids: HashSet<ServiceId, RandomState>,
}

impl Catalog {
    /// Build a catalog, rejecting identifiers declared more than once.
    pub fn new(ids: &[ServiceId]) -> Result<Self> {
        let mut set = HashSet::with_capacity_and_hasher(ids.len(), RandomState::new());
        for id in ids {
            if !set.insert(*id) {
                return Err(DiError::IdentifierCollision { service: *id });
            }
        }
        Ok(Self { ids: set })
    }

    /// Check that `id` was declared.
    #[inline]
    pub fn check(&self, id: ServiceId) -> Result<()> {
        if self.ids.contains(&id) {
            Ok(())
        } else {
            Err(DiError::UndeclaredIdentifier { service: id })
        }
    }

    #[inline]
    pub fn contains(&self, id: ServiceId) -> bool {
        self.ids.contains(&id)
    }

    /// Look up a declared identifier by its textual form.
    ///
    /// An exact display match wins (`Symbol(A)`, `nlu-server`); otherwise a
    /// bare name selects the symbol of that name.
    pub fn find(&self, text: &str) -> Option<ServiceId> {
        let mut ids = self.ids.iter().copied();
        ids.clone()
            .find(|id| id.to_string() == text)
            .or_else(|| ids.find(|id| id.is_symbol() && id.name() == text))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
