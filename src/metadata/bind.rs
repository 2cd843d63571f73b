//! Declaration builder and class references.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use super::inject::{TraitSlot, ValueSlot};
use super::{Constructor, Inject, Injectable, PropertyEntry, TypeMeta};
use crate::collection::FactorySource;
use crate::error::{DiError, DiResult};
use crate::execution::ROOT_SCOPE;
use crate::key::{Id, TypeKey};
use crate::lifetime::BindOptions;
use crate::metadata::Args;
use crate::provider::Container;
use crate::AnyArc;

/// Callback run when a container auto-binds a type.
pub(crate) type BindAction = Arc<dyn Fn(&TypeKey, &Container) -> DiResult<()> + Send + Sync>;

/// Highest constructor parameter index a declaration accepts.
pub const MAX_PARAM_INDEX: usize = 63;

type Coerce = Arc<dyn Fn(AnyArc) -> DiResult<AnyArc> + Send + Sync>;

/// Untyped reference to a constructible type.
///
/// Optionally carries a coercion applied to each constructed instance, used
/// to bind a concrete type where an abstract one (a trait object) is
/// requested.
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use contextual_di::{BindOptions, Container, DiResult, Id, Resolver};
/// use contextual_di::metadata::{ClassRef, Declaration, Injectable};
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> String;
/// }
///
/// #[derive(Default)]
/// struct English;
/// impl Greeter for English {
///     fn greet(&self) -> String { "hello".into() }
/// }
/// impl Injectable for English {
///     fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
///         d.default_constructor();
///         Ok(())
///     }
/// }
///
/// let container = Container::new();
/// container.bind_class_ref(
///     Id::of::<dyn Greeter>(),
///     ClassRef::as_trait::<English, dyn Greeter>(|e| e as Arc<dyn Greeter>),
///     BindOptions::default(),
/// );
/// let greeter = container.get_trait::<dyn Greeter>(None).unwrap().unwrap();
/// assert_eq!(greeter.greet(), "hello");
/// ```
#[derive(Clone)]
pub struct ClassRef {
    key: TypeKey,
    coerce: Option<Coerce>,
}

impl ClassRef {
    /// Reference to `T` itself.
    pub fn of<T: ?Sized + Injectable>() -> Self {
        Self::from_key(TypeKey::injectable::<T>())
    }

    /// Reference to `I`, handing out instances as `Arc<A>`.
    ///
    /// Constructed values are stored as `Arc<Arc<A>>` so they can be fetched
    /// with [`Resolver::get_trait`](crate::Resolver::get_trait).
    pub fn as_trait<I, A>(upcast: fn(Arc<I>) -> Arc<A>) -> Self
    where
        I: Injectable + Send + Sync,
        A: ?Sized + Send + Sync + 'static,
    {
        Self {
            key: TypeKey::injectable::<I>(),
            coerce: Some(Arc::new(move |value: AnyArc| {
                let concrete = value
                    .downcast::<I>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<I>()))?;
                Ok(Arc::new(upcast(concrete)) as AnyArc)
            })),
        }
    }

    pub(crate) fn from_key(key: TypeKey) -> Self {
        Self { key, coerce: None }
    }

    /// Key of the referenced type.
    pub fn key(&self) -> &TypeKey {
        &self.key
    }

    pub(crate) fn coerce(&self, value: AnyArc) -> DiResult<AnyArc> {
        match &self.coerce {
            Some(coerce) => coerce(value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRef")
            .field("type", &self.key.name())
            .field("coerced", &self.coerce.is_some())
            .finish()
    }
}

/// Builder describing how `T` is constructed, injected and bound.
///
/// Obtained through [`Injectable::declare`] or [`metadata::declare`](super::declare).
pub struct Declaration<T: ?Sized> {
    meta: TypeMeta,
    // First invalid call, reported when the declaration is committed
    invalid: Option<DiError>,
    _marker: PhantomData<fn(&T)>,
}

impl<T: ?Sized + 'static> Declaration<T> {
    pub(crate) fn new() -> Self {
        Self {
            meta: TypeMeta::new(std::any::type_name::<T>()),
            invalid: None,
            _marker: PhantomData,
        }
    }

    pub(crate) fn into_meta(self) -> DiResult<TypeMeta> {
        match self.invalid {
            Some(err) => Err(err),
            None => Ok(self.meta),
        }
    }

    /// Resolves every dependency of `T` that names no scope of its own from `scope`.
    pub fn force_scope(&mut self, scope: impl Into<String>) -> &mut Self {
        self.meta.force_scope = Some(scope.into());
        self
    }

    /// Adds a custom bind action.
    pub fn bind_action<F>(&mut self, action: F) -> &mut Self
    where
        F: Fn(&TypeKey, &Container) -> DiResult<()> + Send + Sync + 'static,
    {
        self.meta.bind_actions.push(Arc::new(action));
        self
    }

    /// Binds `T` under its own type identifier.
    pub fn bind_self(&mut self, opts: BindOptions) -> &mut Self {
        self.bind_action(move |key, container| {
            container.bind_class_ref(*key, ClassRef::from_key(*key), opts.clone());
            Ok(())
        })
    }

    /// Binds `T` under another identifier.
    pub fn bind_as(&mut self, id: impl Into<Id>, opts: BindOptions) -> &mut Self {
        let id = id.into();
        self.bind_action(move |key, container| {
            container.bind_class_ref(id.clone(), ClassRef::from_key(*key), opts.clone());
            Ok(())
        })
    }

    /// Binds `T` as a singleton in the root scope, shared by every flow.
    pub fn singleton(&mut self) -> &mut Self {
        self.singleton_in(ROOT_SCOPE)
    }

    /// Binds `T` as a singleton in the named scope.
    pub fn singleton_in(&mut self, scope: impl Into<String>) -> &mut Self {
        self.bind_self(BindOptions::singleton().in_scope(scope))
    }

    /// Makes `id` an alias of `T`.
    pub fn alias(&mut self, id: impl Into<Id>) -> &mut Self {
        let id = id.into();
        self.bind_action(move |key, container| {
            container.bind_alias(id.clone(), *key, BindOptions::default());
            Ok(())
        })
    }

    /// Makes `id` an alias of `target` when `T` is auto-bound.
    pub fn alias_of(&mut self, id: impl Into<Id>, target: impl Into<Id>, opts: BindOptions) -> &mut Self {
        let id = id.into();
        let target = target.into();
        self.bind_action(move |_, container| {
            container.bind_alias(id.clone(), target.clone(), opts.clone());
            Ok(())
        })
    }

    /// Binds `T` to the class returned by `getter`.
    ///
    /// The getter runs at auto-bind time, so it may name types declared later.
    pub fn implement<G>(&mut self, getter: G, opts: BindOptions) -> &mut Self
    where
        G: Fn() -> ClassRef + Send + Sync + 'static,
    {
        self.bind_action(move |key, container| {
            container.bind_class_ref(*key, getter(), opts.clone());
            Ok(())
        })
    }
}

impl<T: Send + Sync + 'static> Declaration<T> {
    /// Sets the constructor.
    pub fn constructor<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&Args) -> DiResult<T> + Send + Sync + 'static,
    {
        let constructor: Constructor =
            Arc::new(move |args: &Args| f(args).map(|value| Box::new(value) as Box<dyn Any + Send + Sync>));
        self.meta.constructor = Some(constructor);
        self
    }

    /// Uses `T::default()` as the constructor.
    pub fn default_constructor(&mut self) -> &mut Self
    where
        T: Default,
    {
        self.constructor(|_| Ok(T::default()))
    }

    /// Declares constructor parameter `index`.
    ///
    /// Indices above [`MAX_PARAM_INDEX`] make the declaration fail with
    /// [`DiError::Declaration`].
    pub fn param(&mut self, index: usize, inject: Inject) -> &mut Self {
        if index > MAX_PARAM_INDEX {
            self.invalid.get_or_insert_with(|| {
                DiError::Declaration(format!(
                    "parameter index {} of {} exceeds {}",
                    index, self.meta.type_name, MAX_PARAM_INDEX
                ))
            });
            return self;
        }
        self.meta.params.insert(index, inject.into_resolver());
        self
    }

    /// Declares an injectable property holding a concrete dependency.
    pub fn property<D>(
        &mut self,
        name: impl Into<String>,
        accessor: fn(&mut T) -> &mut Option<Arc<D>>,
        inject: Inject,
    ) -> &mut Self
    where
        D: Send + Sync + 'static,
    {
        let slot = ValueSlot {
            accessor,
            _marker: PhantomData,
        };
        self.push_property(name.into(), inject, Arc::new(slot))
    }

    /// Declares an injectable property holding a trait object.
    ///
    /// The bound value must be an `Arc<D>`, as produced by
    /// [`ClassRef::as_trait`] or by binding an `Arc<dyn Trait>` value.
    pub fn property_trait<D>(
        &mut self,
        name: impl Into<String>,
        accessor: fn(&mut T) -> &mut Option<Arc<D>>,
        inject: Inject,
    ) -> &mut Self
    where
        D: ?Sized + Send + Sync + 'static,
    {
        let slot = TraitSlot {
            accessor,
            _marker: PhantomData,
        };
        self.push_property(name.into(), inject, Arc::new(slot))
    }

    /// Binds `T` to products of a factory when auto-bound.
    pub fn factory(&mut self, source: FactorySource<T>, opts: BindOptions) -> &mut Self {
        self.bind_action(move |_, container| {
            container.bind_factory(source.clone(), opts.clone());
            Ok(())
        })
    }

    fn push_property(
        &mut self,
        name: String,
        inject: Inject,
        slot: Arc<dyn super::PropertySlot>,
    ) -> &mut Self {
        let entry = PropertyEntry {
            resolver: inject.into_resolver(),
            slot,
        };
        match self.meta.props.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = entry,
            None => self.meta.props.push((name, entry)),
        }
        self
    }
}

impl<T: ?Sized> fmt::Debug for Declaration<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Declaration")
            .field("type", &self.meta.type_name)
            .field("params", &self.meta.params.keys().collect::<Vec<_>>())
            .field(
                "props",
                &self.meta.props.iter().map(|(n, _)| n.as_str()).collect::<Vec<_>>(),
            )
            .field("force_scope", &self.meta.force_scope)
            .field("bind_actions", &self.meta.bind_actions.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Holder {
        dep: Option<Arc<u8>>,
    }

    #[test]
    fn properties_replace_by_name() {
        let mut d = Declaration::<Holder>::new();
        d.property("dep", |h| &mut h.dep, Inject::id("a"))
            .property("dep", |h| &mut h.dep, Inject::id("b").optional())
            .bind_self(BindOptions::default())
            .alias("holder");
        let meta = d.into_meta().unwrap();
        assert_eq!(meta.props.len(), 1);
        assert!(!meta.props[0].1.resolver.required);
        assert_eq!(meta.bind_actions.len(), 2);
    }

    #[test]
    fn out_of_range_param_fails_declaration() {
        let mut d = Declaration::<Holder>::new();
        d.param(0, Inject::id("a")).param(usize::MAX, Inject::id("b"));
        assert!(matches!(d.into_meta(), Err(DiError::Declaration(_))));

        let mut d = Declaration::<Holder>::new();
        d.param(MAX_PARAM_INDEX, Inject::id("last"));
        assert_eq!(d.into_meta().unwrap().params.len(), 1);
    }

    #[test]
    fn params_are_ordered_by_index() {
        let mut d = Declaration::<Holder>::new();
        d.param(2, Inject::id("c")).param(0, Inject::id("a"));
        let meta = d.into_meta().unwrap();
        let order: Vec<usize> = meta.params.keys().copied().collect();
        assert_eq!(order, vec![0, 2]);
    }
}
