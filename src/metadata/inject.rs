//! Dependency descriptions: how one constructor parameter or property resolves.

use std::any::{Any, TypeId};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::{DiError, DiResult};
use crate::key::Id;
use crate::metadata::Injectable;
use crate::traits::ResolverCore;
use crate::AnyArc;

type ResolveFn = Arc<dyn Fn(&dyn ResolverCore, Option<&str>) -> DiResult<Option<AnyArc>> + Send + Sync>;

/// Resolver of a single declared dependency.
#[derive(Clone)]
pub(crate) struct DependencyResolver {
    pub(crate) required: bool,
    pub(crate) scope: Option<String>,
    resolve: ResolveFn,
}

impl DependencyResolver {
    #[inline]
    pub(crate) fn resolve(&self, resolver: &dyn ResolverCore, scope: Option<&str>) -> DiResult<Option<AnyArc>> {
        (self.resolve)(resolver, scope)
    }
}

/// Describes how a dependency is resolved.
///
/// Dependencies are required unless marked [`optional`](Inject::optional): a
/// required dependency that resolves to nothing fails construction with
/// [`DiError::Required`].
///
/// # Examples
///
/// ```rust
/// use contextual_di::metadata::Inject;
///
/// struct Database;
///
/// let by_name = Inject::id("database").optional();
/// let by_type = Inject::of::<Database>().unwrap().scope("request");
///
/// // Built-in value types carry no identity worth injecting.
/// assert!(Inject::of::<u32>().is_err());
/// # let _ = (by_name, by_type);
/// ```
#[must_use]
pub struct Inject {
    required: bool,
    scope: Option<String>,
    resolve: ResolveFn,
}

impl Inject {
    /// Looks the dependency up by identifier.
    pub fn id(id: impl Into<Id>) -> Self {
        let id = id.into();
        Self::raw(move |resolver, scope| resolver.get_any(&id, scope))
    }

    /// Looks the dependency up by its type.
    ///
    /// Fails for built-in value types such as integers, `bool` or `String`.
    pub fn of<D: ?Sized + 'static>() -> DiResult<Self> {
        reject_builtin::<D>()?;
        Ok(Self::id(Id::of::<D>()))
    }

    /// Looks the dependency up by its type, declaring its metadata on first use.
    pub fn injectable<D: ?Sized + Injectable>() -> DiResult<Self> {
        reject_builtin::<D>()?;
        Ok(Self::id(Id::injectable::<D>()))
    }

    /// Resolves the dependency with a custom function.
    ///
    /// The function receives the container and the scope the dependency
    /// resolves from.
    pub fn raw<F>(f: F) -> Self
    where
        F: Fn(&dyn ResolverCore, Option<&str>) -> DiResult<Option<AnyArc>> + Send + Sync + 'static,
    {
        Self {
            required: true,
            scope: None,
            resolve: Arc::new(f),
        }
    }

    /// Injects nothing instead of failing when the dependency is unresolved.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    /// Fails construction when the dependency is unresolved. The default.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Resolves the dependency from the named scope.
    pub fn scope(mut self, name: impl Into<String>) -> Self {
        self.scope = Some(name.into());
        self
    }

    pub(crate) fn into_resolver(self) -> DependencyResolver {
        DependencyResolver {
            required: self.required,
            scope: self.scope,
            resolve: self.resolve,
        }
    }
}

fn reject_builtin<D: ?Sized + 'static>() -> DiResult<()> {
    let id = TypeId::of::<D>();
    let builtin = [
        TypeId::of::<i8>(),
        TypeId::of::<i16>(),
        TypeId::of::<i32>(),
        TypeId::of::<i64>(),
        TypeId::of::<i128>(),
        TypeId::of::<isize>(),
        TypeId::of::<u8>(),
        TypeId::of::<u16>(),
        TypeId::of::<u32>(),
        TypeId::of::<u64>(),
        TypeId::of::<u128>(),
        TypeId::of::<usize>(),
        TypeId::of::<f32>(),
        TypeId::of::<f64>(),
        TypeId::of::<bool>(),
        TypeId::of::<char>(),
        TypeId::of::<()>(),
        TypeId::of::<str>(),
        TypeId::of::<&'static str>(),
        TypeId::of::<String>(),
    ];
    if builtin.contains(&id) {
        return Err(DiError::Declaration(format!(
            "cannot infer a dependency of built-in type {}",
            std::any::type_name::<D>()
        )));
    }
    Ok(())
}

/// Positional constructor arguments resolved from parameter declarations.
///
/// Undeclared indices, and optional dependencies that resolved to nothing,
/// hold `None`.
pub struct Args {
    target: &'static str,
    values: Vec<Option<AnyArc>>,
}

impl Args {
    pub(crate) fn new(target: &'static str, values: Vec<Option<AnyArc>>) -> Self {
        Self { target, values }
    }

    /// Number of positions, up to the highest declared index.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The untyped value at `index`.
    pub fn raw(&self, index: usize) -> Option<&AnyArc> {
        self.values.get(index).and_then(Option::as_ref)
    }

    /// The value at `index` downcast to `D`.
    pub fn get<D: Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<D>>> {
        self.raw(index)
            .map(|value| {
                value
                    .clone()
                    .downcast::<D>()
                    .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))
            })
            .transpose()
    }

    /// The value at `index` as a trait object, stored as `Arc<Arc<D>>`.
    pub fn get_trait<D: ?Sized + Send + Sync + 'static>(&self, index: usize) -> DiResult<Option<Arc<D>>> {
        self.raw(index)
            .map(|value| {
                value
                    .downcast_ref::<Arc<D>>()
                    .cloned()
                    .ok_or(DiError::TypeMismatch(std::any::type_name::<D>()))
            })
            .transpose()
    }

    /// Like [`get`](Args::get), failing when the position is empty.
    pub fn require<D: Send + Sync + 'static>(&self, index: usize) -> DiResult<Arc<D>> {
        self.get::<D>(index)?.ok_or_else(|| DiError::Required {
            target: self.target,
            slot: format!("constructor param[{}]", index),
        })
    }
}

/// Type-erased access to one `Option<Arc<_>>` field of an instance.
pub(crate) trait PropertySlot: Send + Sync {
    fn is_set(&self, target: &mut dyn Any) -> DiResult<bool>;
    fn assign(&self, target: &mut dyn Any, value: AnyArc) -> DiResult<()>;
}

/// Field holding a concrete dependency.
pub(crate) struct ValueSlot<T, D> {
    pub(crate) accessor: fn(&mut T) -> &mut Option<Arc<D>>,
    pub(crate) _marker: PhantomData<fn(&D)>,
}

/// Field holding a trait-object dependency.
pub(crate) struct TraitSlot<T, D: ?Sized> {
    pub(crate) accessor: fn(&mut T) -> &mut Option<Arc<D>>,
    pub(crate) _marker: PhantomData<fn(&D)>,
}

fn target_of<T: 'static>(target: &mut dyn Any) -> DiResult<&mut T> {
    target
        .downcast_mut::<T>()
        .ok_or(DiError::TypeMismatch(std::any::type_name::<T>()))
}

impl<T: 'static, D: Send + Sync + 'static> PropertySlot for ValueSlot<T, D> {
    fn is_set(&self, target: &mut dyn Any) -> DiResult<bool> {
        Ok((self.accessor)(target_of::<T>(target)?).is_some())
    }

    fn assign(&self, target: &mut dyn Any, value: AnyArc) -> DiResult<()> {
        let value = value
            .downcast::<D>()
            .map_err(|_| DiError::TypeMismatch(std::any::type_name::<D>()))?;
        *(self.accessor)(target_of::<T>(target)?) = Some(value);
        Ok(())
    }
}

impl<T: 'static, D: ?Sized + Send + Sync + 'static> PropertySlot for TraitSlot<T, D> {
    fn is_set(&self, target: &mut dyn Any) -> DiResult<bool> {
        Ok((self.accessor)(target_of::<T>(target)?).is_some())
    }

    fn assign(&self, target: &mut dyn Any, value: AnyArc) -> DiResult<()> {
        let value = value
            .downcast_ref::<Arc<D>>()
            .cloned()
            .ok_or(DiError::TypeMismatch(std::any::type_name::<D>()))?;
        *(self.accessor)(target_of::<T>(target)?) = Some(value);
        Ok(())
    }
}
