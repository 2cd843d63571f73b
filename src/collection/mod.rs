//! The binding half of the container.
//!
//! Every bind operation creates a registration and places it by scope: in the
//! active context's frame when no scope is named or the active context
//! carries it, in the nearest ancestor carrying the name otherwise, and in a
//! queue flushed by [`Container::alias_scope`] when no visible context
//! carries it yet.
//!
//! Binding the same identifier again in the same frame replaces the earlier
//! registration.

use std::fmt;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{Id, TypeKey};
use crate::lifetime::{BindOptions, FactoryLifetime, Lifetime};
use crate::metadata::{self, ClassRef, Injectable};
use crate::provider::{AutoBindState, Container};
use crate::registration::{Producer, Registration};
use crate::traits::ResolverCore;
use crate::AnyArc;

/// Object producing instances of `T`.
///
/// # Examples
///
/// ```
/// use contextual_di::{BindOptions, Container, DiResult, Factory, FactorySource, Resolver};
///
/// struct Connection { port: u16 }
/// struct Dialer { port: u16 }
///
/// impl Factory<Connection> for Dialer {
///     fn create(&self) -> DiResult<Connection> {
///         Ok(Connection { port: self.port })
///     }
/// }
///
/// let container = Container::new();
/// container.bind_factory(FactorySource::<Connection>::instance(Dialer { port: 5432 }), BindOptions::singleton());
/// let conn = container.get_as::<Connection>(contextual_di::Id::of::<Connection>(), None).unwrap().unwrap();
/// assert_eq!(conn.port, 5432);
/// ```
pub trait Factory<T>: Send + Sync {
    /// Produces one instance.
    fn create(&self) -> DiResult<T>;
}

type Produce<T> = Arc<dyn Fn(AnyArc) -> DiResult<T> + Send + Sync>;

/// Where [`Container::bind_factory`] gets its factory from.
pub struct FactorySource<T> {
    kind: SourceKind<T>,
}

enum SourceKind<T> {
    /// A ready factory object
    Instance(Arc<dyn Factory<T>>),
    /// A factory type, itself bound as a class and resolved on demand
    Class { class: ClassRef, produce: Produce<T> },
}

impl<T: 'static> FactorySource<T> {
    /// Uses `factory` directly.
    pub fn instance(factory: impl Factory<T> + 'static) -> Self {
        Self {
            kind: SourceKind::Instance(Arc::new(factory)),
        }
    }

    /// Binds the factory type `F` as a class and asks it for each product.
    ///
    /// The factory object is a singleton unless the bind options say
    /// [`factory_transient`](BindOptions::factory_transient).
    pub fn of<F>() -> Self
    where
        F: Factory<T> + Injectable,
    {
        Self {
            kind: SourceKind::Class {
                class: ClassRef::of::<F>(),
                produce: Arc::new(|factory: AnyArc| {
                    factory
                        .downcast::<F>()
                        .map_err(|_| DiError::TypeMismatch(std::any::type_name::<F>()))?
                        .create()
                }),
            },
        }
    }
}

impl<T> Clone for FactorySource<T> {
    fn clone(&self) -> Self {
        let kind = match &self.kind {
            SourceKind::Instance(factory) => SourceKind::Instance(factory.clone()),
            SourceKind::Class { class, produce } => SourceKind::Class {
                class: class.clone(),
                produce: produce.clone(),
            },
        };
        Self { kind }
    }
}

impl<T> fmt::Debug for FactorySource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            SourceKind::Instance(_) => f.write_str("FactorySource::Instance"),
            SourceKind::Class { class, .. } => write!(f, "FactorySource::Class({})", class.key().name()),
        }
    }
}

impl Container {
    fn register(&self, id: Id, registration: Registration) -> &Self {
        let scope = registration.scope.clone();
        let placement = self.scopes.place(scope.as_deref(), id.clone(), Arc::new(registration));
        if self.observers.has_observers() {
            self.observers.bound(&id, &placement);
        }
        self
    }

    /// Binds a value in the active scope. Shorthand for [`bind_value`](Container::bind_value).
    pub fn set<T: Send + Sync + 'static>(&self, id: impl Into<Id>, value: T) -> &Self {
        self.bind_value(id, value, BindOptions::default())
    }

    /// Binds a pre-built value. Values are always singletons; only the scope
    /// of `opts` is used.
    pub fn bind_value<T: Send + Sync + 'static>(&self, id: impl Into<Id>, value: T, opts: BindOptions) -> &Self {
        self.bind_value_arc(id, Arc::new(value), opts)
    }

    /// Binds a shared value without re-wrapping it.
    pub fn bind_value_arc<T: Send + Sync + 'static>(
        &self,
        id: impl Into<Id>,
        value: Arc<T>,
        opts: BindOptions,
    ) -> &Self {
        self.register(id.into(), Registration::value(value as AnyArc, opts.scope))
    }

    /// Binds a closure producing instances on demand.
    ///
    /// The closure receives the container, so it can resolve its own
    /// dependencies.
    pub fn bind<T, F>(&self, id: impl Into<Id>, f: F, opts: BindOptions) -> &Self
    where
        T: Send + Sync + 'static,
        F: Fn(&dyn ResolverCore) -> DiResult<T> + Send + Sync + 'static,
    {
        let producer: Producer = Arc::new(move |resolver: &dyn ResolverCore| f(resolver).map(|value| Arc::new(value) as AnyArc));
        self.register(id.into(), Registration::factory(producer, &opts))
    }

    /// Binds `T` to the products of a factory.
    pub fn bind_factory<T: Send + Sync + 'static>(&self, source: FactorySource<T>, opts: BindOptions) -> &Self {
        let producer: Producer = match source.kind {
            SourceKind::Instance(factory) => {
                Arc::new(move |_: &dyn ResolverCore| factory.create().map(|value| Arc::new(value) as AnyArc))
            }
            SourceKind::Class { class, produce } => {
                let factory_id = Id::Type(*class.key());
                let factory_opts = BindOptions {
                    lifetime: match opts.factory_lifetime {
                        FactoryLifetime::Singleton => Lifetime::Singleton,
                        FactoryLifetime::Transient => Lifetime::Transient,
                    },
                    scope: opts.scope.clone(),
                    ..BindOptions::default()
                };
                self.bind_class_ref(factory_id.clone(), class, factory_opts);

                let scope = opts.scope.clone();
                Arc::new(move |resolver: &dyn ResolverCore| {
                    let factory = resolver
                        .get_any(&factory_id, scope.as_deref())?
                        .ok_or_else(|| DiError::NotFound(factory_id.to_string()))?;
                    produce(factory).map(|value| Arc::new(value) as AnyArc)
                })
            }
        };
        self.register(Id::of::<T>(), Registration::factory(producer, &opts))
    }

    /// Binds `T` under its own type identifier, ignoring its bind actions.
    pub fn bind_class<T: ?Sized + Injectable>(&self, opts: BindOptions) -> &Self {
        self.bind_class_ref(Id::injectable::<T>(), ClassRef::of::<T>(), opts)
    }

    /// Binds class `T` under `id`.
    pub fn bind_class_with_id<T: ?Sized + Injectable>(&self, id: impl Into<Id>, opts: BindOptions) -> &Self {
        self.bind_class_ref(id, ClassRef::of::<T>(), opts)
    }

    /// Binds an untyped class reference under `id`.
    pub fn bind_class_ref(&self, id: impl Into<Id>, class: ClassRef, opts: BindOptions) -> &Self {
        self.register(id.into(), Registration::class(class, &opts))
    }

    /// Makes `id` resolve whatever `to` resolves to.
    pub fn bind_alias(&self, id: impl Into<Id>, to: impl Into<Id>, opts: BindOptions) -> &Self {
        self.register(id.into(), Registration::alias(to.into(), opts.scope))
    }

    /// Runs `T`'s bind actions unless this container already did.
    pub fn auto_bind<T: ?Sized + Injectable>(&self) -> DiResult<&Self> {
        self.auto_bind_key(&TypeKey::injectable::<T>())
    }

    /// Runs the bind actions of the type keyed by `key` unless this container
    /// already did.
    ///
    /// The type is marked before its actions run, so an action that resolves
    /// or auto-binds the same type does not recurse. A type whose actions
    /// failed stays marked.
    pub fn auto_bind_key(&self, key: &TypeKey) -> DiResult<&Self> {
        {
            let mut states = self.auto_binds.lock();
            if states.contains_key(&key.type_id()) {
                return Ok(self);
            }
            states.insert(key.type_id(), AutoBindState::InProgress);
        }

        let result = self.run_bind_actions(key);
        self.auto_binds.lock().insert(key.type_id(), AutoBindState::Done);
        result?;

        if self.observers.has_observers() {
            self.observers.auto_bound(key.name());
        }
        Ok(self)
    }

    fn run_bind_actions(&self, key: &TypeKey) -> DiResult<()> {
        key.declare()?;
        let Some(meta) = metadata::lookup(key.type_id()) else {
            return Ok(());
        };
        for action in &meta.bind_actions {
            action(key, self)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionContext;

    #[test]
    fn rebinding_replaces_in_frame() {
        let container = Container::new();
        container.set("x", 1u8).set("x", 2u8);
        let value = container.get("x", None).unwrap().unwrap();
        assert_eq!(*value.downcast::<u8>().unwrap(), 2);
    }

    #[test]
    fn value_ignores_lifetime_option() {
        let container = Container::new();
        container.bind_value("v", 3u8, BindOptions::transient());
        let a = container.get("v", None).unwrap().unwrap();
        let b = container.get("v", None).unwrap().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn deferred_value_waits_for_scope() {
        let container = Container::new();
        ExecutionContext::root().fork().run(|| {
            container.bind_value("late", 9u8, BindOptions::default().in_scope("job"));
            assert!(container.get("late", None).unwrap().is_none());
            assert_eq!(container.alias_scope("job").unwrap(), 1);
            assert!(container.get("late", None).unwrap().is_some());
        });
    }
}
