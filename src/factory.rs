//! Construction strategies
//!
//! A binding produces its value through one of four strategies:
//!
//! - [`Strategy::Type`] - a concrete [`Service`] whose declared dependencies
//!   are resolved and injected
//! - [`Strategy::Factory`] - a user function handed the live registry
//! - [`Strategy::Dynamic`] - a pure function of the [`ResolutionContext`]
//! - [`Strategy::Constant`] - a value computed once at bind time
//!
//! Strategies store type-erased `Arc<dyn Any>` values. Services exposed through
//! a trait object are stored as `Arc<Arc<dyn Trait>>` and read back with
//! [`Resolved::get_dyn`] / `Registry::get_dyn`.

use crate::{DiError, Registry, ResolutionContext, Result, ServiceId};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-erased service instance.
pub type AnyArc = Arc<dyn Any + Send + Sync>;

/// Deferred release of a constructed instance.
pub type Teardown = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

type BuildFn = Arc<dyn Fn(&mut Resolved) -> Result<Built> + Send + Sync>;
type FactoryFn = Arc<dyn Fn(&mut FactoryContext<'_>) -> Result<AnyArc> + Send + Sync>;
type DynamicFn = Arc<dyn Fn(&ResolutionContext) -> Result<AnyArc> + Send + Sync>;
type ExposeFn<S> = Arc<dyn Fn(Arc<S>) -> AnyArc + Send + Sync>;
type ReleaseFn<S> = Arc<dyn Fn(&Arc<S>) -> Teardown + Send + Sync>;

// =============================================================================
// Service / Dispose
// =============================================================================

/// A concrete service type that declares what it needs.
///
/// # Example
///
/// ```rust
/// use service_composer::{Inject, Resolved, Result, Service, ServiceId};
/// use std::sync::Arc;
///
/// const DATABASE: ServiceId = ServiceId::symbol("Database");
///
/// struct Database { url: String }
///
/// impl Service for Database {
///     fn create(_: &mut Resolved) -> Result<Self> {
///         Ok(Database { url: "postgres://localhost".into() })
///     }
/// }
///
/// struct UserRepository { db: Arc<Database> }
///
/// impl Service for UserRepository {
///     fn dependencies() -> Vec<Inject> {
///         vec![Inject::new(DATABASE)]
///     }
///
///     fn create(deps: &mut Resolved) -> Result<Self> {
///         Ok(UserRepository { db: deps.get(DATABASE)? })
///     }
/// }
/// ```
pub trait Service: Send + Sync + Sized + 'static {
    /// Identifiers injected into [`Service::create`].
    fn dependencies() -> Vec<Inject> {
        Vec::new()
    }

    /// Build the service from its resolved dependencies.
    fn create(deps: &mut Resolved) -> Result<Self>;
}

/// Release/close capability run at process teardown.
#[async_trait]
pub trait Dispose: Send + Sync + 'static {
    async fn dispose(&self);
}

// =============================================================================
// Injection points
// =============================================================================

/// A declared dependency of a concrete service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inject {
    id: ServiceId,
    named: Option<String>,
    optional: bool,
}

impl Inject {
    #[inline]
    pub fn new(id: ServiceId) -> Self {
        Self {
            id,
            named: None,
            optional: false,
        }
    }

    /// Dependency with an explicit name annotation.
    #[inline]
    pub fn named(id: ServiceId, name: impl Into<String>) -> Self {
        Self {
            id,
            named: Some(name.into()),
            optional: false,
        }
    }

    /// Resolve to `None` instead of failing when `id` is unbound.
    #[inline]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    #[inline]
    pub fn id(&self) -> ServiceId {
        self.id
    }

    #[inline]
    pub fn name_annotation(&self) -> Option<&str> {
        self.named.as_deref()
    }

    #[inline]
    pub fn is_optional(&self) -> bool {
        self.optional
    }
}

impl From<ServiceId> for Inject {
    fn from(id: ServiceId) -> Self {
        Self::new(id)
    }
}

/// Dependencies resolved for one construction.
pub struct Resolved {
    service: ServiceId,
    values: Vec<(Inject, Option<AnyArc>)>,
}

impl Resolved {
    pub(crate) fn new(service: ServiceId, values: Vec<(Inject, Option<AnyArc>)>) -> Self {
        Self { service, values }
    }

    /// The service being constructed.
    #[inline]
    pub fn service(&self) -> ServiceId {
        self.service
    }

    fn lookup(&self, id: ServiceId, named: Option<&str>) -> Result<Option<&AnyArc>> {
        self.values
            .iter()
            .find(|(inject, _)| {
                inject.id == id && (named.is_none() || inject.name_annotation() == named)
            })
            .map(|(_, value)| value.as_ref())
            .ok_or(DiError::UnknownBinding { service: id })
    }

    fn required(&self, id: ServiceId, named: Option<&str>) -> Result<&AnyArc> {
        self.lookup(id, named)?
            .ok_or(DiError::UnknownBinding { service: id })
    }

    /// Concrete dependency.
    pub fn get<T: Send + Sync + 'static>(&self, id: ServiceId) -> Result<Arc<T>> {
        downcast(id, Arc::clone(self.required(id, None)?))
    }

    /// Concrete dependency injected with a name annotation.
    pub fn get_named<T: Send + Sync + 'static>(&self, id: ServiceId, name: &str) -> Result<Arc<T>> {
        downcast(id, Arc::clone(self.required(id, Some(name))?))
    }

    /// Dependency exposed as a trait object.
    pub fn get_dyn<T: ?Sized + Send + Sync + 'static>(&self, id: ServiceId) -> Result<Arc<T>> {
        downcast_dyn(id, self.required(id, None)?)
    }

    /// Optional concrete dependency.
    pub fn optional<T: Send + Sync + 'static>(&self, id: ServiceId) -> Result<Option<Arc<T>>> {
        self.lookup(id, None)?
            .map(|any| downcast(id, Arc::clone(any)))
            .transpose()
    }

    /// Optional dependency exposed as a trait object.
    pub fn optional_dyn<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: ServiceId,
    ) -> Result<Option<Arc<T>>> {
        self.lookup(id, None)?
            .map(|any| downcast_dyn(id, any))
            .transpose()
    }
}

#[inline]
pub(crate) fn downcast<T: Send + Sync + 'static>(id: ServiceId, any: AnyArc) -> Result<Arc<T>> {
    any.downcast::<T>()
        .map_err(|_| DiError::type_mismatch::<T>(id))
}

#[inline]
pub(crate) fn downcast_dyn<T: ?Sized + Send + Sync + 'static>(
    id: ServiceId,
    any: &AnyArc,
) -> Result<Arc<T>> {
    any.downcast_ref::<Arc<T>>()
        .cloned()
        .ok_or_else(|| DiError::type_mismatch::<T>(id))
}

// =============================================================================
// Factory context
// =============================================================================

/// Handed to factory strategies: the live registry plus the current chain.
pub struct FactoryContext<'a> {
    pub(crate) registry: &'a Registry,
    pub(crate) ctx: &'a mut ResolutionContext,
}

impl FactoryContext<'_> {
    /// The registry the factory was resolved from.
    #[inline]
    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// The chain that led to this factory.
    #[inline]
    pub fn context(&self) -> &ResolutionContext {
        self.ctx
    }

    /// Resolve a concrete service as part of the current chain.
    pub fn get<T: Send + Sync + 'static>(&mut self, id: ServiceId) -> Result<Arc<T>> {
        let any = self.registry.resolve_in(&Inject::new(id), self.ctx)?;
        downcast(id, any)
    }

    /// Resolve a trait-object service as part of the current chain.
    pub fn get_dyn<T: ?Sized + Send + Sync + 'static>(&mut self, id: ServiceId) -> Result<Arc<T>> {
        let any = self.registry.resolve_in(&Inject::new(id), self.ctx)?;
        downcast_dyn(id, &any)
    }
}

// =============================================================================
// Concrete type strategy
// =============================================================================

/// Output of a concrete construction.
pub(crate) struct Built {
    pub instance: AnyArc,
    pub teardown: Option<Teardown>,
}

/// Type-erased concrete constructor: declared dependencies plus a build step.
#[derive(Clone)]
pub struct Constructor {
    type_name: &'static str,
    deps: Vec<Inject>,
    releases: bool,
    build: BuildFn,
}

impl Constructor {
    #[inline]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    #[inline]
    pub fn dependencies(&self) -> &[Inject] {
        &self.deps
    }

    /// Whether constructed instances carry a teardown hook.
    #[inline]
    pub fn releases(&self) -> bool {
        self.releases
    }

    #[inline]
    pub(crate) fn build(&self, deps: &mut Resolved) -> Result<Built> {
        (self.build)(deps)
    }
}

impl std::fmt::Debug for Constructor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Constructor")
            .field("type_name", &self.type_name)
            .field("deps", &self.deps)
            .field("releases", &self.releases)
            .finish()
    }
}

/// Typed builder for a [`Strategy::Type`].
///
/// ```rust
/// use service_composer::{Concrete, Resolved, Result, Service, Strategy};
/// use std::sync::Arc;
///
/// trait Greeter: Send + Sync { fn hello(&self) -> &'static str; }
///
/// struct English;
/// impl Greeter for English { fn hello(&self) -> &'static str { "hello" } }
/// impl Service for English {
///     fn create(_: &mut Resolved) -> Result<Self> { Ok(English) }
/// }
///
/// let strategy: Strategy = Concrete::<English>::new()
///     .exposed_as(|s| s as Arc<dyn Greeter>)
///     .into();
/// ```
pub struct Concrete<S: Service> {
    expose: Option<ExposeFn<S>>,
    release: Option<ReleaseFn<S>>,
    _service: PhantomData<fn() -> S>,
}

impl<S: Service> Concrete<S> {
    #[inline]
    pub fn new() -> Self {
        Self {
            expose: None,
            release: None,
            _service: PhantomData,
        }
    }

    /// Store the instance behind a trait object.
    pub fn exposed_as<T>(mut self, expose: fn(Arc<S>) -> Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        self.expose = Some(Arc::new(move |s| Arc::new(expose(s)) as AnyArc));
        self
    }
}

impl<S: Service + Dispose> Concrete<S> {
    /// Register [`Dispose::dispose`] as the instance's teardown hook.
    pub fn disposable(mut self) -> Self {
        self.release = Some(Arc::new(|s: &Arc<S>| {
            let s = Arc::clone(s);
            Box::new(move || Box::pin(async move { s.dispose().await }) as BoxFuture<'static, ()>)
                as Teardown
        }));
        self
    }
}

impl<S: Service> Default for Concrete<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Service> From<Concrete<S>> for Strategy {
    fn from(concrete: Concrete<S>) -> Self {
        let Concrete { expose, release, .. } = concrete;
        Strategy::Type(Constructor {
            type_name: std::any::type_name::<S>(),
            deps: S::dependencies(),
            releases: release.is_some(),
            build: Arc::new(move |deps| {
                let service = Arc::new(S::create(deps)?);
                let teardown = release.as_ref().map(|release| release(&service));
                let instance = match &expose {
                    Some(expose) => expose(service),
                    None => service as AnyArc,
                };
                Ok(Built { instance, teardown })
            }),
        })
    }
}

// =============================================================================
// Strategy
// =============================================================================

/// How a binding produces its value.
#[derive(Clone)]
pub enum Strategy {
    /// Construct via dependency injection
    Type(Constructor),
    /// Call a user function with the live registry
    Factory(FactoryFn),
    /// Compute from the resolution context, evaluated on every resolution
    Dynamic(DynamicFn),
    /// Fixed value
    Constant(AnyArc),
}

impl Strategy {
    /// Concrete service stored as itself.
    #[inline]
    pub fn to<S: Service>() -> Self {
        Concrete::<S>::new().into()
    }

    /// Concrete service stored behind a trait object.
    #[inline]
    pub fn to_as<S: Service, T>(expose: fn(Arc<S>) -> Arc<T>) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
    {
        Concrete::<S>::new().exposed_as(expose).into()
    }

    /// Ad hoc constructor with explicit dependencies.
    pub fn with_deps<T, F>(deps: Vec<Inject>, build: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Resolved) -> Result<T> + Send + Sync + 'static,
    {
        Strategy::Type(Constructor {
            type_name: std::any::type_name::<T>(),
            deps,
            releases: false,
            build: Arc::new(move |deps| {
                Ok(Built {
                    instance: Arc::new(build(deps)?) as AnyArc,
                    teardown: None,
                })
            }),
        })
    }

    /// Provider-style factory.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut FactoryContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        Strategy::Factory(Arc::new(move |cx| Ok(Arc::new(factory(cx)?) as AnyArc)))
    }

    /// Value computed from the resolution context.
    pub fn dynamic<T, F>(compute: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&ResolutionContext) -> T + Send + Sync + 'static,
    {
        Strategy::Dynamic(Arc::new(move |ctx| Ok(Arc::new(compute(ctx)) as AnyArc)))
    }

    /// Fixed value.
    #[inline]
    pub fn constant<T: Send + Sync + 'static>(value: T) -> Self {
        Strategy::Constant(Arc::new(value))
    }

    /// Fixed value exposed as a trait object.
    #[inline]
    pub fn constant_dyn<T: ?Sized + Send + Sync + 'static>(value: Arc<T>) -> Self {
        Strategy::Constant(Arc::new(value))
    }

    /// Short label for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Strategy::Type(_) => "type",
            Strategy::Factory(_) => "factory",
            Strategy::Dynamic(_) => "dynamic",
            Strategy::Constant(_) => "constant",
        }
    }

    /// Declared dependencies (concrete types only).
    pub fn dependencies(&self) -> &[Inject] {
        match self {
            Strategy::Type(ctor) => ctor.dependencies(),
            _ => &[],
        }
    }
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Strategy::Type(ctor) => f.debug_tuple("Type").field(ctor).finish(),
            other => f.write_str(other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const CONFIG: ServiceId = ServiceId::symbol("Config");
    const CACHE: ServiceId = ServiceId::symbol("Cache");

    struct Config {
        debug: bool,
    }

    impl Service for Config {
        fn create(_: &mut Resolved) -> Result<Self> {
            Ok(Config { debug: true })
        }
    }

    trait Named: Send + Sync {
        fn name(&self) -> &str;
    }

    impl Named for Config {
        fn name(&self) -> &str {
            "config"
        }
    }

    fn build(strategy: &Strategy, values: Vec<(Inject, Option<AnyArc>)>) -> Built {
        match strategy {
            Strategy::Type(ctor) => ctor
                .build(&mut Resolved::new(CONFIG, values))
                .unwrap(),
            other => panic!("not a concrete strategy: {other:?}"),
        }
    }

    #[test]
    fn test_concrete_builds_service() {
        let built = build(&Strategy::to::<Config>(), Vec::new());
        let config = downcast::<Config>(CONFIG, built.instance).unwrap();
        assert!(config.debug);
        assert!(built.teardown.is_none());
    }

    #[test]
    fn test_exposed_as_trait_object() {
        let strategy = Strategy::to_as::<Config, dyn Named>(|c| c as Arc<dyn Named>);
        let built = build(&strategy, Vec::new());
        let named = downcast_dyn::<dyn Named>(CONFIG, &built.instance).unwrap();
        assert_eq!(named.name(), "config");
    }

    #[test]
    fn test_disposable_produces_teardown() {
        static DISPOSED: AtomicU32 = AtomicU32::new(0);

        struct Pool;
        impl Service for Pool {
            fn create(_: &mut Resolved) -> Result<Self> {
                Ok(Pool)
            }
        }
        #[async_trait]
        impl Dispose for Pool {
            async fn dispose(&self) {
                DISPOSED.fetch_add(1, Ordering::SeqCst);
            }
        }

        let strategy: Strategy = Concrete::<Pool>::new().disposable().into();
        let built = build(&strategy, Vec::new());
        let teardown = built.teardown.expect("teardown registered");
        futures::executor::block_on(teardown());
        assert_eq!(DISPOSED.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_resolved_lookup() {
        let values = vec![
            (Inject::new(CACHE), Some(Arc::new(7u32) as AnyArc)),
            (Inject::new(CONFIG).optional(), None),
        ];
        let deps = Resolved::new(CONFIG, values);

        assert_eq!(*deps.get::<u32>(CACHE).unwrap(), 7);
        assert!(deps.optional::<Config>(CONFIG).unwrap().is_none());
        assert!(matches!(
            deps.get::<String>(CACHE),
            Err(DiError::TypeMismatch { .. })
        ));
        assert!(matches!(
            deps.get::<Config>(ServiceId::symbol("Other")),
            Err(DiError::UnknownBinding { .. })
        ));
    }

    #[test]
    fn test_with_deps_declares_dependencies() {
        let strategy = Strategy::with_deps(vec![Inject::new(CACHE)], |deps| {
            Ok(*deps.get::<u32>(CACHE)? + 1)
        });
        assert_eq!(strategy.dependencies(), &[Inject::new(CACHE)]);
        assert_eq!(strategy.kind(), "type");

        let built = build(&strategy, vec![(Inject::new(CACHE), Some(Arc::new(1u32) as AnyArc))]);
        assert_eq!(*downcast::<u32>(CACHE, built.instance).unwrap(), 2);
    }
}
