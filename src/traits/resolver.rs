//! Resolver traits for identifier and typed resolution.

use std::any::Any;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::{Id, TypeKey};
use crate::metadata::Injectable;
use crate::AnyArc;

/// Core resolver trait for object-safe resolution.
///
/// Declared dependencies and registrations receive the container as a
/// `&dyn ResolverCore`. Most callers use the generic helpers of [`Resolver`],
/// which every `ResolverCore` gets for free.
pub trait ResolverCore: Send + Sync {
    /// Resolves `id`, starting from the scope named `scope` when given.
    ///
    /// Returns `Ok(None)` when nothing is bound and the identifier names no
    /// constructible type.
    fn get_any(&self, id: &Id, scope: Option<&str>) -> DiResult<Option<AnyArc>>;

    /// Injects the declared properties of the type keyed by `key` into `target`.
    ///
    /// Properties already holding a value are left untouched.
    fn fill_any(&self, target: &mut dyn Any, key: &TypeKey, scope: Option<&str>) -> DiResult<()>;
}

/// Typed helpers built on [`ResolverCore`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use contextual_di::{BindOptions, Container, Resolver};
///
/// trait Logger: Send + Sync {
///     fn log(&self, msg: &str) -> String;
/// }
///
/// struct Console;
/// impl Logger for Console {
///     fn log(&self, msg: &str) -> String { format!("LOG: {}", msg) }
/// }
///
/// let container = Container::new();
/// container.set("answer", 42usize);
/// container.set("logger", Arc::new(Console) as Arc<dyn Logger>);
///
/// let answer = container.get_as::<usize>("answer", None).unwrap().unwrap();
/// assert_eq!(*answer, 42);
///
/// let logger = container.get_trait_by::<dyn Logger>("logger", None).unwrap().unwrap();
/// assert_eq!(logger.log("ready"), "LOG: ready");
/// ```
pub trait Resolver: ResolverCore {
    /// Resolves `id` and downcasts the instance to `T`.
    fn get_as<T: Send + Sync + 'static>(&self, id: impl Into<Id>, scope: Option<&str>) -> DiResult<Option<Arc<T>>> {
        match self.get_any(&id.into(), scope)? {
            Some(any) => any
                .downcast::<T>()
                .map(Some)
                .map_err(|_| DiError::TypeMismatch(std::any::type_name::<T>())),
            None => Ok(None),
        }
    }

    /// Resolves a trait object bound under `id`.
    ///
    /// Trait objects are stored as `Arc<Arc<T>>`.
    fn get_trait_by<T: ?Sized + Send + Sync + 'static>(
        &self,
        id: impl Into<Id>,
        scope: Option<&str>,
    ) -> DiResult<Option<Arc<T>>> {
        match self.get_any(&id.into(), scope)? {
            Some(any) => any
                .downcast_ref::<Arc<T>>()
                .cloned()
                .map(Some)
                .ok_or(DiError::TypeMismatch(std::any::type_name::<T>())),
            None => Ok(None),
        }
    }

    /// Resolves a trait object bound under its own type identifier.
    fn get_trait<T: ?Sized + Send + Sync + 'static>(&self, scope: Option<&str>) -> DiResult<Option<Arc<T>>> {
        self.get_trait_by::<T>(Id::of::<T>(), scope)
    }

    /// Resolves `T`, auto-binding and constructing it when nothing is bound.
    ///
    /// Fails with [`DiError::NotFound`] when `T` resolves to nothing.
    fn resolve<T: Injectable + Send + Sync>(&self, scope: Option<&str>) -> DiResult<Arc<T>> {
        self.get_as::<T>(Id::injectable::<T>(), scope)?
            .ok_or_else(|| DiError::NotFound(std::any::type_name::<T>().to_string()))
    }

    /// Resolves a trait object type that declares its own bindings, usually
    /// through [`Declaration::implement`](crate::Declaration::implement).
    ///
    /// Fails with [`DiError::NotFound`] when nothing is bound.
    fn resolve_trait<T: ?Sized + Injectable + Send + Sync>(&self, scope: Option<&str>) -> DiResult<Arc<T>> {
        self.get_trait_by::<T>(Id::injectable::<T>(), scope)?
            .ok_or_else(|| DiError::NotFound(std::any::type_name::<T>().to_string()))
    }

    /// Injects the declared properties of `target`.
    fn fill<T: Injectable>(&self, target: &mut T, scope: Option<&str>) -> DiResult<()> {
        self.fill_any(target, &TypeKey::injectable::<T>(), scope)
    }
}

impl<R: ResolverCore + ?Sized> Resolver for R {}
