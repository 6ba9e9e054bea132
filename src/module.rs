//! Module batches and the conditional activation gate
//!
//! A [`RegistryModule`] is a named batch of registrations for one subsystem.
//! Batches are merged in the order given; a later batch may depend on
//! identifiers bound by an earlier one.

use crate::{Registration, Registry, Result};
use tracing::{debug, info};

/// Named batch of bindings for one subsystem.
#[derive(Debug, Clone)]
pub struct RegistryModule {
    name: &'static str,
    registrations: Vec<Registration>,
}

impl RegistryModule {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            registrations: Vec::new(),
        }
    }

    /// Append a registration to the batch.
    pub fn with(mut self, reg: Registration) -> Self {
        self.registrations.push(reg);
        self
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    pub fn registrations(&self) -> &[Registration] {
        &self.registrations
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl Extend<Registration> for RegistryModule {
    fn extend<I: IntoIterator<Item = Registration>>(&mut self, iter: I) {
        self.registrations.extend(iter);
    }
}

/// Boot-time switch for an optional module.
///
/// The flag is captured on construction and never re-read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivationGate {
    name: &'static str,
    enabled: bool,
}

impl ActivationGate {
    pub fn new(name: &'static str, enabled: bool) -> Self {
        Self { name, enabled }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl Registry {
    /// Merge one batch; fails on the first binding error.
    pub fn load_module(&self, module: &RegistryModule) -> Result<()> {
        debug!(
            target: "service_composer",
            module = module.name(),
            bindings = module.len(),
            "Loading module"
        );

        for reg in module.registrations() {
            self.bind(reg.clone())?;
        }
        Ok(())
    }

    /// Merge batches in sequence.
    pub fn load(&self, modules: &[RegistryModule]) -> Result<()> {
        modules.iter().try_for_each(|m| self.load_module(m))
    }

    /// Merge `modules` only if the gate is open. Returns whether they loaded.
    pub fn load_if(&self, gate: &ActivationGate, modules: &[RegistryModule]) -> Result<bool> {
        if !gate.is_enabled() {
            info!(
                target: "service_composer",
                gate = gate.name(),
                skipped = modules.len(),
                "Activation gate closed, skipping modules"
            );
            return Ok(false);
        }

        info!(
            target: "service_composer",
            gate = gate.name(),
            "Activation gate open, loading modules"
        );
        self.load(modules)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DiError, Inject, ServiceId, Strategy};

    const STORE: ServiceId = ServiceId::symbol("Store");
    const REPO: ServiceId = ServiceId::symbol("Repo");
    const X: ServiceId = ServiceId::symbol("X");
    const Y: ServiceId = ServiceId::symbol("Y");

    fn storage() -> RegistryModule {
        RegistryModule::new("storage").with(
            Registration::new(STORE, Strategy::constant("sqlite".to_string())).in_singleton_scope(),
        )
    }

    fn repositories() -> RegistryModule {
        RegistryModule::new("repositories").with(Registration::new(
            REPO,
            Strategy::with_deps(vec![Inject::new(STORE)], |deps| {
                Ok(format!("repo:{}", deps.get::<String>(STORE)?))
            }),
        ))
    }

    fn optional() -> RegistryModule {
        RegistryModule::new("pro")
            .with(Registration::new(X, Strategy::constant(1u8)))
            .with(Registration::new(Y, Strategy::constant(2u8)))
    }

    #[test]
    fn test_load_in_order() {
        let registry = Registry::new();
        registry.load(&[storage(), repositories()]).unwrap();

        assert_eq!(*registry.get::<String>(REPO).unwrap(), "repo:sqlite");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_load_stops_on_duplicate() {
        let registry = Registry::new();
        let err = registry.load(&[storage(), storage()]).unwrap_err();
        assert!(matches!(err, DiError::DuplicateBinding { .. }));
    }

    #[test]
    fn test_gate_closed_leaves_ids_unbound() {
        let registry = Registry::new();
        registry.load(&[storage(), repositories()]).unwrap();
        registry.get::<String>(REPO).unwrap();

        let gate = ActivationGate::new("pro", false);
        assert!(!registry.load_if(&gate, &[optional()]).unwrap());

        assert!(registry.resolve(X).unwrap_err().is_unknown_binding());
        assert!(registry.resolve(Y).unwrap_err().is_unknown_binding());
        assert!(registry.resolve(STORE).is_ok());
        assert!(registry.resolve(REPO).is_ok());
    }

    #[test]
    fn test_gate_open_loads() {
        let registry = Registry::new();
        let gate = ActivationGate::new("pro", true);
        assert!(registry.load_if(&gate, &[optional()]).unwrap());
        assert_eq!(*registry.get::<u8>(Y).unwrap(), 2);
    }

    #[test]
    fn test_extend() {
        let mut module = RegistryModule::new("batch");
        module.extend([
            Registration::new(X, Strategy::constant(1u8)),
            Registration::new(Y, Strategy::constant(2u8)),
        ]);
        assert_eq!(module.len(), 2);
        assert_eq!(module.registrations()[1].id(), Y);
    }
}
