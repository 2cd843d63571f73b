//! The container and its resolving half.
//!
//! Bindings live in frames attached to execution contexts. A lookup starts at
//! the active context (or at the closest context carrying a requested scope
//! name) and walks up through its ancestors, so bindings of an outer flow are
//! visible to the flows it forks while inner bindings stay private.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::config::ContainerConfig;
use crate::error::DiResult;
use crate::internal::{HashMap, ResolutionGuard};
use crate::key::{Id, TypeKey};
use crate::lifetime::BindOptions;
use crate::metadata::{self, ClassRef, Injectable};
use crate::observer::{DiObserver, LoggingObserver, Observers};
use crate::registration::Registration;
use crate::traits::ResolverCore;
use crate::AnyArc;

pub mod scope;

pub use scope::Placement;
pub(crate) use scope::ScopeRegistry;

static NEXT_CONTAINER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AutoBindState {
    InProgress,
    Done,
}

/// Dependency container with execution-context scoped bindings.
///
/// A container is both the binder (see the `bind*` methods) and the resolver
/// ([`get`](Container::get), [`fill`](Container::fill) and the typed helpers of
/// [`Resolver`](crate::Resolver)). Containers are independent: two containers
/// never see each other's bindings, scope names or auto-bind state.
///
/// # Examples
///
/// ```
/// use contextual_di::{BindOptions, Container, ExecutionContext, Resolver};
///
/// let container = Container::new();
/// let request = ExecutionContext::current().fork();
///
/// request.run(|| {
///     container.alias_scope("request").unwrap();
///     container.set("user", "ada".to_string());
///
///     ExecutionContext::current().fork().run(|| {
///         // Visible from a nested flow
///         let user = container.get_as::<String>("user", None).unwrap().unwrap();
///         assert_eq!(user.as_str(), "ada");
///         assert_eq!(container.distance("user"), Some(1));
///     });
/// });
///
/// // Not visible outside the request flow
/// assert!(container.get("user", None).unwrap().is_none());
/// ```
pub struct Container {
    id: u64,
    pub(crate) scopes: ScopeRegistry,
    pub(crate) auto_binds: Mutex<HashMap<TypeId, AutoBindState>>,
    pub(crate) observers: Observers,
    config: ContainerConfig,
}

impl Container {
    /// Creates an empty container with default settings.
    pub fn new() -> Self {
        Self::with_config(ContainerConfig::default())
    }

    /// Creates an empty container with `config`.
    pub fn with_config(config: ContainerConfig) -> Self {
        let mut observers = Observers::new();
        if config.log_resolutions {
            observers.add(Arc::new(LoggingObserver::with_prefix(config.log_prefix.clone())));
        }
        Self {
            id: NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed),
            scopes: ScopeRegistry::new(),
            auto_binds: Mutex::new(HashMap::default()),
            observers,
            config,
        }
    }

    /// Creates an empty container configured from `CONTEXTUAL_DI_*` variables.
    pub fn from_env() -> Self {
        Self::with_config(ContainerConfig::from_env())
    }

    /// The container's settings.
    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Registers an observer notified of resolutions, bindings and scope changes.
    pub fn add_observer(&mut self, observer: Arc<dyn DiObserver>) -> &mut Self {
        self.observers.add(observer);
        self
    }

    /// Resolves `id`.
    ///
    /// With `from_scope` the lookup starts at the closest context carrying
    /// that scope name (falling back to the active context); otherwise it
    /// starts at the active context.
    ///
    /// For type identifiers that resolve to nothing, the type is auto-bound
    /// once and looked up again; a type that is already auto-bound and has a
    /// constructor is built ad hoc as a transient. Anything else that is not
    /// bound resolves to `Ok(None)`.
    pub fn get(&self, id: impl Into<Id>, from_scope: Option<&str>) -> DiResult<Option<AnyArc>> {
        self.resolve_id(&id.into(), from_scope)
    }

    /// Injects the declared properties of `target` that hold no value yet.
    pub fn fill<T: Injectable>(&self, target: &mut T, from_scope: Option<&str>) -> DiResult<()> {
        self.fill_any(target, &TypeKey::injectable::<T>(), from_scope)
    }

    /// Names the active execution context `name` and flushes bindings that
    /// were waiting for that scope, in the order they were made.
    ///
    /// Fails with [`ScopeCollision`](crate::DiError::ScopeCollision) when an
    /// ancestor context already carries `name`. Returns the number of flushed
    /// bindings.
    pub fn alias_scope(&self, name: &str) -> DiResult<usize> {
        let flushed = self.scopes.alias_scope(name)?;
        if self.observers.has_observers() {
            self.observers.scope_aliased(name, flushed);
        }
        Ok(flushed)
    }

    /// Returns true if the active context or one of its ancestors carries `name`.
    pub fn has_scope(&self, name: &str) -> bool {
        self.scopes.has_scope(name)
    }

    /// Number of context hops from the active context to the nearest frame
    /// binding `id`, or `None` when no visible frame binds it.
    pub fn distance(&self, id: impl Into<Id>) -> Option<usize> {
        self.scopes.distance(&id.into())
    }

    /// Returns true once `T`'s bind actions ran (or are running) in this container.
    pub fn is_auto_bound<T: ?Sized + 'static>(&self) -> bool {
        self.auto_binds.lock().contains_key(&TypeId::of::<T>())
    }

    fn resolve_id(&self, id: &Id, from_scope: Option<&str>) -> DiResult<Option<AnyArc>> {
        let max_depth = self.config.max_resolution_depth;
        let resolve = || {
            ResolutionGuard::enter(self.id, id, from_scope, max_depth)
                .and_then(|_guard| self.lookup(id, from_scope))
        };

        // Fast path: no observers registered
        if !self.observers.has_observers() {
            return resolve();
        }

        self.observers.resolving(id);
        let start = Instant::now();
        let result = resolve();
        match &result {
            Ok(_) => self.observers.resolved(id, start.elapsed()),
            Err(err) => self.observers.resolution_failed(id, err),
        }
        result
    }

    fn lookup(&self, id: &Id, from_scope: Option<&str>) -> DiResult<Option<AnyArc>> {
        if let Some(registration) = self.scopes.find(id, from_scope) {
            return registration.get_instance(self, from_scope);
        }
        let Id::Type(key) = id else {
            return Ok(None);
        };

        key.declare()?;
        // Undeclared types stay unmarked so a later declaring key still auto-binds
        let Some(meta) = metadata::lookup(key.type_id()) else {
            return Ok(None);
        };
        if !self.is_auto_bound_key(key) {
            self.auto_bind_key(key)?;
            if let Some(registration) = self.scopes.find(id, from_scope) {
                return registration.get_instance(self, from_scope);
            }
        }

        // Constructible but unbound: build a throwaway transient
        if meta.constructor.is_none() {
            return Ok(None);
        }
        let opts = BindOptions {
            scope: from_scope.map(str::to_string),
            ..BindOptions::transient()
        };
        Registration::class(ClassRef::from_key(*key), &opts).get_instance(self, from_scope)
    }

    fn is_auto_bound_key(&self, key: &TypeKey) -> bool {
        self.auto_binds.lock().contains_key(&key.type_id())
    }

    /// Dumps the active context chain with each frame's scope names and
    /// binding count, followed by bindings still waiting for their scope.
    #[cfg(feature = "diagnostics")]
    pub fn to_debug_string(&self) -> String {
        use crate::execution::ExecutionContext;

        let mut s = String::new();
        s.push_str("=== Container Debug ===\n");
        s.push_str("Contexts:\n");
        let current = ExecutionContext::current();
        for context in current.ancestors() {
            let names = self.scopes.map().names_of(context);
            s.push_str(&format!(
                "  #{} depth={} names={:?} bindings={}\n",
                context.id(),
                context.depth(),
                names,
                self.scopes.map().len_of(context)
            ));
        }
        s.push_str("Deferred:\n");
        for (name, ids) in self.scopes.pending() {
            s.push_str(&format!("  {}: {}\n", name, ids.join(", ")));
        }
        s
    }
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("id", &self.id)
            .field("config", &self.config)
            .field("auto_bound", &self.auto_binds.lock().len())
            .field("observers", &self.observers.has_observers())
            .finish()
    }
}

impl ResolverCore for Container {
    fn get_any(&self, id: &Id, scope: Option<&str>) -> DiResult<Option<AnyArc>> {
        self.resolve_id(id, scope)
    }

    fn fill_any(&self, target: &mut dyn Any, key: &TypeKey, scope: Option<&str>) -> DiResult<()> {
        key.declare()?;
        match metadata::lookup(key.type_id()) {
            Some(meta) => metadata::fill_properties(self, target, &meta, scope),
            None => Ok(()),
        }
    }
}
