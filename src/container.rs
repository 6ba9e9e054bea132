//! Service registry
//!
//! The [`Registry`] owns the binding table and the singleton cache and is the
//! one composition root handed to the rest of the application. Bindings are
//! populated during boot; afterwards the registry is locked and only resolved.

use crate::context::{Frame, ResolutionContext};
use crate::factory::{AnyArc, Built, FactoryContext, Teardown, downcast, downcast_dyn};
use crate::storage::{Binding, BindingTable};
use crate::{Catalog, DiError, Inject, Lifetime, Registration, Result, ServiceId, Strategy};
use ahash::RandomState;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, ThreadId};
use tracing::{debug, info, trace};

/// Teardown hooks recorded in construction order.
#[derive(Default)]
pub(crate) struct TeardownStack {
    /// Set by the dispose-on-exit lifecycle pass
    pub armed: bool,
    pub hooks: Vec<(ServiceId, Teardown)>,
}

/// Singleton constructions in progress across all threads.
#[derive(Default)]
struct InFlight {
    owners: HashMap<ServiceId, ThreadId, RandomState>,
    /// The identifier each blocked thread is waiting on
    waiting: HashMap<ThreadId, ServiceId, RandomState>,
}

impl InFlight {
    /// Follow the wait-for graph from the owner of `id`.
    ///
    /// Returns the identifiers passed through if the walk ends at a
    /// construction owned by `me`, i.e. blocking on `id` would never finish.
    fn wait_cycle(&self, id: ServiceId, me: ThreadId) -> Option<Vec<ServiceId>> {
        let mut owner = *self.owners.get(&id)?;
        if owner == me {
            return Some(vec![id]);
        }

        let mut chain = Vec::new();
        for _ in 0..self.waiting.len() {
            let next = *self.waiting.get(&owner)?;
            chain.push(next);
            owner = *self.owners.get(&next)?;
            if owner == me {
                return Some(chain);
            }
        }
        None
    }
}

pub(crate) struct Inner {
    pub table: BindingTable,
    catalog: Option<Catalog>,
    locked: AtomicBool,
    pub hooks_applied: AtomicBool,
    pub teardown: Mutex<TeardownStack>,
    in_flight: Mutex<InFlight>,
    /// Signalled whenever a singleton construction ends
    constructed: Condvar,
}

impl Inner {
    fn in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

enum Claim<'a> {
    /// Another thread finished construction first
    Ready(AnyArc),
    /// The calling thread now owns construction
    Owned(ConstructionGuard<'a>),
}

/// Releases ownership of a singleton construction, even on unwind.
struct ConstructionGuard<'a> {
    inner: &'a Inner,
    id: ServiceId,
}

impl Drop for ConstructionGuard<'_> {
    fn drop(&mut self) {
        self.inner.in_flight().owners.remove(&self.id);
        self.inner.constructed.notify_all();
    }
}

/// Which path [`Registry::bind_or_replace`] took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOutcome {
    /// An existing binding was replaced
    Replaced,
    /// No binding existed; a new one was added
    Added,
}

/// Service-composition registry.
///
/// Cloning is cheap and yields a handle to the same registry.
///
/// # Examples
///
/// ```rust
/// use service_composer::{Registration, Registry, ServiceId, Strategy};
///
/// const PORT: ServiceId = ServiceId::symbol("Port");
///
/// let registry = Registry::new();
/// registry.bind(Registration::new(PORT, Strategy::constant(8080u16))).unwrap();
///
/// let port = registry.get::<u16>(PORT).unwrap();
/// assert_eq!(*port, 8080);
/// ```
#[derive(Clone)]
pub struct Registry {
    pub(crate) inner: Arc<Inner>,
}

impl Registry {
    /// Create an empty registry accepting any identifier.
    pub fn new() -> Self {
        debug!(target: "service_composer", "Creating new service registry");
        Self::build(None)
    }

    /// Create a registry restricted to a declared identifier set.
    pub fn with_catalog(catalog: Catalog) -> Self {
        debug!(
            target: "service_composer",
            declared = catalog.len(),
            "Creating service registry with identifier catalog"
        );
        Self::build(Some(catalog))
    }

    fn build(catalog: Option<Catalog>) -> Self {
        Self {
            inner: Arc::new(Inner {
                table: BindingTable::new(),
                catalog,
                locked: AtomicBool::new(false),
                hooks_applied: AtomicBool::new(false),
                teardown: Mutex::new(TeardownStack::default()),
                in_flight: Mutex::new(InFlight::default()),
                constructed: Condvar::new(),
            }),
        }
    }

    /// Weak handle, for providers that must not keep the registry alive.
    #[inline]
    pub fn downgrade(&self) -> WeakRegistry {
        WeakRegistry(Arc::downgrade(&self.inner))
    }

    // =========================================================================
    // Binding table
    // =========================================================================

    /// Add a binding; fails with `DuplicateBinding` if the identifier is bound.
    pub fn bind(&self, reg: Registration) -> Result<()> {
        self.check_mutable(reg.id)?;

        debug!(
            target: "service_composer",
            service = %reg.id,
            lifetime = ?reg.lifetime,
            strategy = reg.strategy.kind(),
            service_count = self.inner.table.len() + 1,
            "Binding service"
        );

        self.inner.table.insert_new(reg)
    }

    /// Replace a binding; fails with `UnknownBinding` if the identifier is unbound.
    pub fn rebind(&self, reg: Registration) -> Result<()> {
        self.check_mutable(reg.id)?;

        let id = reg.id;
        let lifetime = reg.lifetime;
        let strategy = reg.strategy.kind();
        let previous = self.inner.table.replace(reg)?;

        debug!(
            target: "service_composer",
            service = %id,
            lifetime = ?lifetime,
            strategy,
            previous_constructed = previous.is_constructed(),
            "Rebinding service"
        );
        Ok(())
    }

    /// Remove a binding; fails with `UnknownBinding` if the identifier is unbound.
    pub fn unbind(&self, id: ServiceId) -> Result<()> {
        self.check_mutable(id)?;
        self.inner.table.remove(id)?;
        debug!(target: "service_composer", service = %id, "Unbinding service");
        Ok(())
    }

    /// Rebind if bound, bind otherwise.
    ///
    /// After this call exactly one binding exists for the identifier, matching
    /// `reg`. Never fails with `DuplicateBinding`.
    pub fn bind_or_replace(&self, reg: Registration) -> Result<OverrideOutcome> {
        let id = reg.id;
        match self.rebind(reg.clone()) {
            Ok(()) => {
                info!(
                    target: "service_composer",
                    service = %id,
                    strategy = reg.strategy.kind(),
                    "Replaced existing binding"
                );
                Ok(OverrideOutcome::Replaced)
            }
            Err(err) if err.is_unknown_binding() => {
                self.bind(reg)?;
                info!(
                    target: "service_composer",
                    service = %id,
                    "Added new binding"
                );
                Ok(OverrideOutcome::Added)
            }
            Err(err) => Err(err),
        }
    }

    fn check_mutable(&self, id: ServiceId) -> Result<()> {
        if self.is_locked() {
            return Err(DiError::Locked);
        }
        match &self.inner.catalog {
            Some(catalog) => catalog.check(id),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Resolution
    // =========================================================================

    /// Resolve a type-erased instance.
    #[inline]
    pub fn resolve(&self, id: ServiceId) -> Result<AnyArc> {
        let mut ctx = ResolutionContext::new();
        self.resolve_frame(Frame::new(id), &mut ctx)
    }

    /// Resolve with a metadata tag attached to the root request.
    #[inline]
    pub fn resolve_tagged(&self, id: ServiceId, key: &str, value: &str) -> Result<AnyArc> {
        let mut ctx = ResolutionContext::new();
        self.resolve_frame(Frame::new(id).tagged(key, value), &mut ctx)
    }

    /// Resolve a concrete service.
    #[inline]
    pub fn get<T: Send + Sync + 'static>(&self, id: ServiceId) -> Result<Arc<T>> {
        downcast(id, self.resolve(id)?)
    }

    /// Resolve a service exposed as a trait object.
    #[inline]
    pub fn get_dyn<T: ?Sized + Send + Sync + 'static>(&self, id: ServiceId) -> Result<Arc<T>> {
        downcast_dyn(id, &self.resolve(id)?)
    }

    /// Tagged resolution of a concrete service.
    #[inline]
    pub fn get_tagged<T: Send + Sync + 'static>(
        &self,
        id: ServiceId,
        key: &str,
        value: &str,
    ) -> Result<Arc<T>> {
        downcast(id, self.resolve_tagged(id, key, value)?)
    }

    /// Tagged resolution of a trait-object service.
    #[inline]
    pub fn get_tagged_dyn<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: ServiceId,
        key: &str,
        value: &str,
    ) -> Result<Arc<T>> {
        downcast_dyn(id, &self.resolve_tagged(id, key, value)?)
    }

    /// Resolve, returning `None` on any failure.
    #[inline]
    pub fn try_get<T: Send + Sync + 'static>(&self, id: ServiceId) -> Option<Arc<T>> {
        self.get::<T>(id).ok()
    }

    /// Resolve an injection point inside an existing chain.
    pub(crate) fn resolve_in(&self, inject: &Inject, ctx: &mut ResolutionContext) -> Result<AnyArc> {
        let mut frame = Frame::new(inject.id());
        if let Some(name) = inject.name_annotation() {
            frame = frame.named(name);
        }
        self.resolve_frame(frame, ctx)
    }

    fn resolve_frame(&self, frame: Frame, ctx: &mut ResolutionContext) -> Result<AnyArc> {
        let id = frame.id();

        if ctx.contains(id) {
            let path = ctx.path_to(id);
            debug!(
                target: "service_composer",
                service = %id,
                path = %path,
                "Circular dependency detected"
            );
            return Err(DiError::CyclicDependency { service: id, path });
        }

        let Some(binding) = self.inner.table.get(id) else {
            debug!(
                target: "service_composer",
                service = %id,
                depth = ctx.depth(),
                "Service not bound"
            );
            return Err(DiError::unknown(id));
        };

        ctx.push(frame.with_default_tags(&binding.tags));
        let result = self.produce(&binding, ctx);
        ctx.pop();
        result
    }

    fn produce(&self, binding: &Arc<Binding>, ctx: &mut ResolutionContext) -> Result<AnyArc> {
        match (&binding.strategy, binding.lifetime) {
            (Strategy::Constant(value), _) => Ok(Arc::clone(value)),
            (Strategy::Dynamic(compute), _) => {
                trace!(
                    target: "service_composer",
                    service = %binding.id,
                    depth = ctx.depth(),
                    "Evaluating dynamic value"
                );
                compute(ctx)
            }
            (_, Lifetime::Singleton) => {
                if let Some(instance) = binding.instance.get() {
                    trace!(
                        target: "service_composer",
                        service = %binding.id,
                        "Singleton resolved from cache"
                    );
                    return Ok(Arc::clone(instance));
                }

                let _guard = match self.claim(binding, ctx)? {
                    Claim::Ready(instance) => return Ok(instance),
                    Claim::Owned(guard) => guard,
                };

                debug!(
                    target: "service_composer",
                    service = %binding.id,
                    depth = ctx.depth(),
                    "Constructing singleton on first access"
                );
                let Built { instance, teardown } = self.construct(binding, ctx)?;
                if let Some(teardown) = teardown {
                    self.record_teardown(binding.id, teardown);
                }
                Ok(Arc::clone(binding.instance.get_or_init(|| instance)))
            }
            (_, Lifetime::Transient) => {
                trace!(
                    target: "service_composer",
                    service = %binding.id,
                    "Creating new transient instance"
                );
                self.construct(binding, ctx).map(|built| built.instance)
            }
        }
    }

    /// Take ownership of a singleton's first construction, or wait for the
    /// thread that owns it.
    ///
    /// Fails with `CyclicDependency` instead of blocking when the owner is,
    /// directly or through other waiting threads, waiting on this thread.
    fn claim(&self, binding: &Binding, ctx: &ResolutionContext) -> Result<Claim<'_>> {
        let id = binding.id;
        let me = thread::current().id();
        let mut state = self.inner.in_flight();

        loop {
            if let Some(instance) = binding.instance.get() {
                return Ok(Claim::Ready(Arc::clone(instance)));
            }

            if !state.owners.contains_key(&id) {
                state.owners.insert(id, me);
                return Ok(Claim::Owned(ConstructionGuard {
                    inner: &self.inner,
                    id,
                }));
            }

            if let Some(chain) = state.wait_cycle(id, me) {
                let path = ctx
                    .frames()
                    .iter()
                    .map(|f| f.id())
                    .chain(chain)
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(" -> ");
                debug!(
                    target: "service_composer",
                    service = %id,
                    path = %path,
                    "Circular dependency detected between constructions in flight"
                );
                return Err(DiError::CyclicDependency { service: id, path });
            }

            trace!(
                target: "service_composer",
                service = %id,
                "Waiting for singleton constructed by another thread"
            );
            state.waiting.insert(me, id);
            state = self
                .inner
                .constructed
                .wait(state)
                .unwrap_or_else(PoisonError::into_inner);
            state.waiting.remove(&me);
        }
    }

    fn construct(&self, binding: &Binding, ctx: &mut ResolutionContext) -> Result<Built> {
        match &binding.strategy {
            Strategy::Type(ctor) => {
                let mut values = Vec::with_capacity(ctor.dependencies().len());
                for inject in ctor.dependencies() {
                    let value = match self.resolve_in(inject, ctx) {
                        Ok(value) => Some(value),
                        Err(DiError::UnknownBinding { service })
                            if inject.is_optional() && service == inject.id() =>
                        {
                            None
                        }
                        Err(err) => return Err(err),
                    };
                    values.push((inject.clone(), value));
                }
                ctor.build(&mut crate::Resolved::new(binding.id, values))
            }
            Strategy::Factory(factory) => {
                let instance = factory(&mut FactoryContext {
                    registry: self,
                    ctx,
                })?;
                Ok(Built {
                    instance,
                    teardown: None,
                })
            }
            Strategy::Dynamic(compute) => Ok(Built {
                instance: compute(ctx)?,
                teardown: None,
            }),
            Strategy::Constant(value) => Ok(Built {
                instance: Arc::clone(value),
                teardown: None,
            }),
        }
    }

    fn record_teardown(&self, id: ServiceId, teardown: Teardown) {
        let mut stack = self
            .inner
            .teardown
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        stack.hooks.push((id, teardown));
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    /// Check if an identifier is bound.
    #[inline]
    pub fn contains(&self, id: ServiceId) -> bool {
        self.inner.table.contains(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.table.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.table.is_empty()
    }

    /// All bound identifiers, sorted.
    pub fn ids(&self) -> Vec<ServiceId> {
        self.inner.table.ids()
    }

    /// Lifetime of a binding, if bound.
    pub fn lifetime_of(&self, id: ServiceId) -> Option<Lifetime> {
        self.inner.table.get(id).map(|b| b.lifetime)
    }

    /// Whether the singleton for `id` has been constructed.
    pub fn is_constructed(&self, id: ServiceId) -> bool {
        self.inner
            .table
            .get(id)
            .is_some_and(|b| b.is_constructed())
    }

    // =========================================================================
    // Locking
    // =========================================================================

    /// Lock the registry; further bind/rebind/unbind calls fail with `Locked`.
    pub fn lock(&self) {
        self.inner.locked.store(true, Ordering::Release);

        debug!(
            target: "service_composer",
            service_count = self.inner.table.len(),
            "Registry locked - no further binding changes allowed"
        );
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::Acquire)
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("service_count", &self.len())
            .field("has_catalog", &self.inner.catalog.is_some())
            .field("locked", &self.is_locked())
            .finish()
    }
}

/// Non-owning registry handle.
#[derive(Clone)]
pub struct WeakRegistry(Weak<Inner>);

impl WeakRegistry {
    /// Upgrade, failing with `RegistryDropped` once the registry is gone.
    pub fn upgrade(&self) -> Result<Registry> {
        self.0
            .upgrade()
            .map(|inner| Registry { inner })
            .ok_or(DiError::RegistryDropped)
    }
}

impl std::fmt::Debug for WeakRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeakRegistry")
            .field("alive", &(self.0.strong_count() > 0))
            .finish()
    }
}
