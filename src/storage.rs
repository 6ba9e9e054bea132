//! Binding table
//!
//! Uses DashMap for lock-free concurrent lookups by identifier. Entries are
//! handed out as `Arc<Binding>` so no shard guard is held while a binding is
//! being constructed (construction recurses into the table).

use crate::factory::AnyArc;
use crate::{DiError, Lifetime, Registration, Result, ServiceId, Strategy};
use ahash::RandomState;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// A registered binding plus its singleton cell.
pub(crate) struct Binding {
    pub id: ServiceId,
    pub strategy: Strategy,
    pub lifetime: Lifetime,
    pub tags: Vec<(String, String)>,
    pub eager: bool,
    /// Cached singleton, populated lazily on first resolution
    pub instance: OnceCell<AnyArc>,
}

impl Binding {
    fn from_registration(reg: Registration) -> Self {
        let Registration {
            id,
            strategy,
            lifetime,
            tags,
            eager,
        } = reg;
        Self {
            id,
            strategy,
            lifetime,
            tags,
            eager,
            instance: OnceCell::new(),
        }
    }

    /// Whether a singleton instance has been constructed.
    #[inline]
    pub fn is_constructed(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl std::fmt::Debug for Binding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding")
            .field("id", &self.id)
            .field("strategy", &self.strategy.kind())
            .field("lifetime", &self.lifetime)
            .field("eager", &self.eager)
            .field("constructed", &self.is_constructed())
            .finish()
    }
}

/// Thread-safe map from identifier to binding.
pub(crate) struct BindingTable {
    bindings: DashMap<ServiceId, Arc<Binding>, RandomState>,
}

impl BindingTable {
    /// Create an empty table.
    ///
    /// Uses 8 shards; composition roots rarely hold more than a few dozen
    /// bindings.
    #[inline]
    pub fn new() -> Self {
        Self {
            bindings: DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                RandomState::new(),
                8,
            ),
        }
    }

    /// Insert a new binding; fails if `id` is already bound.
    pub fn insert_new(&self, reg: Registration) -> Result<()> {
        match self.bindings.entry(reg.id) {
            Entry::Occupied(entry) => Err(DiError::duplicate(*entry.key())),
            Entry::Vacant(entry) => {
                entry.insert(Arc::new(Binding::from_registration(reg)));
                Ok(())
            }
        }
    }

    /// Replace an existing binding; fails if `id` is not bound.
    ///
    /// The previous binding's cached singleton is not touched; holders of the
    /// old instance keep it.
    pub fn replace(&self, reg: Registration) -> Result<Arc<Binding>> {
        match self.bindings.get_mut(&reg.id) {
            Some(mut slot) => {
                let previous = std::mem::replace(
                    slot.value_mut(),
                    Arc::new(Binding::from_registration(reg)),
                );
                Ok(previous)
            }
            None => Err(DiError::unknown(reg.id)),
        }
    }

    /// Remove a binding.
    pub fn remove(&self, id: ServiceId) -> Result<Arc<Binding>> {
        self.bindings
            .remove(&id)
            .map(|(_, binding)| binding)
            .ok_or(DiError::unknown(id))
    }

    /// Look up a binding (the shard guard is released before returning).
    #[inline]
    pub fn get(&self, id: ServiceId) -> Option<Arc<Binding>> {
        self.bindings.get(&id).map(|entry| Arc::clone(entry.value()))
    }

    #[inline]
    pub fn contains(&self, id: ServiceId) -> bool {
        self.bindings.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// All bound identifiers, sorted for stable output.
    pub fn ids(&self) -> Vec<ServiceId> {
        let mut ids: Vec<_> = self.bindings.iter().map(|r| *r.key()).collect();
        ids.sort();
        ids
    }

    /// Point-in-time copy of every binding, sorted by identifier.
    pub fn snapshot(&self) -> Vec<Arc<Binding>> {
        let mut bindings: Vec<_> = self
            .bindings
            .iter()
            .map(|r| Arc::clone(r.value()))
            .collect();
        bindings.sort_by_key(|b| b.id);
        bindings
    }
}

impl Default for BindingTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BindingTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingTable")
            .field("count", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PORT: ServiceId = ServiceId::symbol("Port");

    fn port(value: u16) -> Registration {
        Registration::new(PORT, Strategy::constant(value))
    }

    #[test]
    fn test_insert_and_get() {
        let table = BindingTable::new();
        table.insert_new(port(80)).unwrap();

        let binding = table.get(PORT).unwrap();
        assert_eq!(binding.id, PORT);
        assert!(!binding.is_constructed());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_insert_duplicate_fails() {
        let table = BindingTable::new();
        table.insert_new(port(80)).unwrap();

        let err = table.insert_new(port(81)).unwrap_err();
        assert!(matches!(err, DiError::DuplicateBinding { service } if service == PORT));
    }

    #[test]
    fn test_replace_requires_existing() {
        let table = BindingTable::new();
        assert!(table.replace(port(80)).unwrap_err().is_unknown_binding());

        table.insert_new(port(80)).unwrap();
        let previous = table.replace(port(81).in_singleton_scope()).unwrap();
        assert_eq!(previous.lifetime, Lifetime::Transient);
        assert_eq!(table.get(PORT).unwrap().lifetime, Lifetime::Singleton);
    }

    #[test]
    fn test_remove() {
        let table = BindingTable::new();
        table.insert_new(port(80)).unwrap();
        assert!(table.remove(PORT).is_ok());
        assert!(!table.contains(PORT));
        assert!(table.remove(PORT).unwrap_err().is_unknown_binding());
    }
}
