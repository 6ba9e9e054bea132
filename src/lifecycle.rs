//! Boot-time lifecycle passes and shutdown
//!
//! After all modules and overrides are loaded, [`Registry::run_lifecycle_hooks`]
//! runs once: it verifies the dependency graph, arms teardown for disposable
//! singletons, forces eager bindings, and locks the registry.
//! [`Registry::shutdown`] later releases constructed singletons in reverse
//! construction order.

use crate::{DiError, Lifetime, Registry, Result, ServiceId, Strategy};
use std::sync::PoisonError;
use std::sync::atomic::Ordering;
use tracing::{debug, info, warn};

/// What the lifecycle passes did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LifecycleReport {
    /// Singleton bindings whose instances will be released at shutdown
    pub disposable: Vec<ServiceId>,
    /// Bindings constructed during boot
    pub eager: Vec<ServiceId>,
}

impl Registry {
    /// Check that every non-optional dependency of a concrete binding is bound.
    pub fn verify(&self) -> Result<()> {
        for binding in self.inner.table.snapshot() {
            for inject in binding.strategy.dependencies() {
                if !inject.is_optional() && !self.contains(inject.id()) {
                    return Err(DiError::MissingDependency {
                        service: binding.id,
                        dependency: inject.id(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Arm teardown for every singleton whose instances can be released.
    ///
    /// Hooks themselves are recorded as instances are constructed, so only
    /// singletons that were actually resolved are released at shutdown.
    pub fn apply_dispose_on_exit(&self) -> Vec<ServiceId> {
        let disposable: Vec<ServiceId> = self
            .inner
            .table
            .snapshot()
            .into_iter()
            .filter(|b| b.lifetime == Lifetime::Singleton)
            .filter(|b| matches!(&b.strategy, Strategy::Type(ctor) if ctor.releases()))
            .map(|b| b.id)
            .collect();

        for id in &disposable {
            debug!(
                target: "service_composer",
                service = %id,
                "Registered teardown on exit"
            );
        }

        self.inner
            .teardown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .armed = true;

        disposable
    }

    /// Resolve every binding flagged eager, plus `extra`.
    ///
    /// The first failure is returned; callers treat it as fatal.
    pub fn initialize_eager(&self, extra: &[ServiceId]) -> Result<Vec<ServiceId>> {
        let mut ids: Vec<ServiceId> = self
            .inner
            .table
            .snapshot()
            .into_iter()
            .filter(|b| b.eager)
            .map(|b| b.id)
            .collect();
        for id in extra {
            if !ids.contains(id) {
                ids.push(*id);
            }
        }

        for id in &ids {
            debug!(target: "service_composer", service = %id, "Eagerly initialising");
            self.resolve(*id)?;
        }
        Ok(ids)
    }

    /// Run the boot lifecycle passes, then lock the registry.
    ///
    /// Fails with `Locked` if called a second time.
    pub fn run_lifecycle_hooks(&self, eager: &[ServiceId]) -> Result<LifecycleReport> {
        if self.inner.hooks_applied.swap(true, Ordering::AcqRel) {
            return Err(DiError::Locked);
        }

        self.verify()?;
        let disposable = self.apply_dispose_on_exit();
        let eager = self.initialize_eager(eager)?;
        self.lock();

        info!(
            target: "service_composer",
            bindings = self.len(),
            disposable = disposable.len(),
            eager = eager.len(),
            "Lifecycle hooks applied"
        );

        Ok(LifecycleReport { disposable, eager })
    }

    /// Release constructed singletons, most recently constructed first.
    ///
    /// Hooks run one at a time; a hook that never completes blocks shutdown.
    /// Returns the number of hooks run. Subsequent calls run nothing.
    pub async fn shutdown(&self) -> usize {
        let (armed, hooks) = {
            let mut stack = self
                .inner
                .teardown
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            (stack.armed, std::mem::take(&mut stack.hooks))
        };

        if !armed {
            if !hooks.is_empty() {
                warn!(
                    target: "service_composer",
                    pending = hooks.len(),
                    "Shutdown before lifecycle hooks ran, skipping teardown"
                );
            }
            return 0;
        }

        let count = hooks.len();
        for (id, teardown) in hooks.into_iter().rev() {
            debug!(target: "service_composer", service = %id, "Releasing service");
            teardown().await;
        }

        info!(target: "service_composer", released = count, "Shutdown complete");
        count
    }

    /// Drive `work` to completion, then [`shutdown`](Self::shutdown).
    ///
    /// Teardown runs whether `work` succeeded or failed.
    pub async fn run_then_shutdown<T>(&self, work: impl Future<Output = T>) -> T {
        let output = work.await;
        self.shutdown().await;
        output
    }
}
