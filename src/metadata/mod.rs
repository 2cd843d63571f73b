//! Process-wide injection metadata.
//!
//! Types describe how they are built and bound through a [`Declaration`]:
//! the constructor and its parameter resolvers, injectable properties, a
//! forced resolution scope, and bind actions run when a container auto-binds
//! the type.
//!
//! Declarations are additive. Declaring the same parameter index or property
//! name again replaces only that entry, and bind actions accumulate in call
//! order.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use contextual_di::{Container, DiResult, Resolver};
//! use contextual_di::metadata::{Declaration, Inject, Injectable};
//!
//! struct Repo;
//! struct Service {
//!     repo: Option<Arc<Repo>>,
//! }
//!
//! impl Injectable for Repo {
//!     fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
//!         d.constructor(|_| Ok(Repo)).singleton();
//!         Ok(())
//!     }
//! }
//!
//! impl Injectable for Service {
//!     fn declare(d: &mut Declaration<Self>) -> DiResult<()> {
//!         d.constructor(|_| Ok(Service { repo: None }))
//!             .property("repo", |s| &mut s.repo, Inject::injectable::<Repo>()?);
//!         Ok(())
//!     }
//! }
//!
//! let container = Container::new();
//! let service = container.resolve::<Service>(None).unwrap();
//! assert!(service.repo.is_some());
//! ```

use std::any::{Any, TypeId};
use std::collections::BTreeMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::{Mutex, ReentrantMutex, RwLock};

use crate::error::{DiError, DiResult};
use crate::internal::HashMap;
use crate::traits::ResolverCore;

mod bind;
mod inject;

pub use bind::{ClassRef, Declaration, MAX_PARAM_INDEX};
pub use inject::{Args, Inject};

pub(crate) use bind::BindAction;
pub(crate) use inject::{DependencyResolver, PropertySlot};

/// Type whose injection metadata is declared on first use.
///
/// `declare` runs at most once per process, the first time a container looks
/// the type up through a key built with [`Id::injectable`](crate::Id::injectable)
/// (the typed helpers on [`Resolver`](crate::Resolver) always do).
pub trait Injectable: 'static {
    /// Describes how the type is constructed, injected and bound.
    fn declare(d: &mut Declaration<Self>) -> DiResult<()>;
}

pub(crate) type Constructor =
    Arc<dyn Fn(&Args) -> DiResult<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Injection metadata of one type.
#[derive(Clone)]
pub(crate) struct TypeMeta {
    pub(crate) type_name: &'static str,
    pub(crate) force_scope: Option<String>,
    pub(crate) params: BTreeMap<usize, DependencyResolver>,
    pub(crate) props: Vec<(String, PropertyEntry)>,
    pub(crate) constructor: Option<Constructor>,
    pub(crate) bind_actions: Vec<BindAction>,
}

#[derive(Clone)]
pub(crate) struct PropertyEntry {
    pub(crate) resolver: DependencyResolver,
    pub(crate) slot: Arc<dyn PropertySlot>,
}

impl TypeMeta {
    fn new(type_name: &'static str) -> Self {
        Self {
            type_name,
            force_scope: None,
            params: BTreeMap::new(),
            props: Vec::new(),
            constructor: None,
            bind_actions: Vec::new(),
        }
    }

    fn merge(&mut self, other: TypeMeta) {
        if other.force_scope.is_some() {
            self.force_scope = other.force_scope;
        }
        if other.constructor.is_some() {
            self.constructor = other.constructor;
        }
        self.params.extend(other.params);
        for (name, entry) in other.props {
            match self.props.iter_mut().find(|(n, _)| *n == name) {
                Some((_, existing)) => *existing = entry,
                None => self.props.push((name, entry)),
            }
        }
        self.bind_actions.extend(other.bind_actions);
    }

    /// Scope a dependency resolves from: its own, else the type's forced
    /// scope, else the caller's.
    pub(crate) fn effective_scope<'a>(
        &'a self,
        resolver: &'a DependencyResolver,
        from_scope: Option<&'a str>,
    ) -> Option<&'a str> {
        resolver
            .scope
            .as_deref()
            .or(self.force_scope.as_deref())
            .or(from_scope)
    }
}

static STORE: Lazy<RwLock<HashMap<TypeId, Arc<TypeMeta>>>> =
    Lazy::new(|| RwLock::new(HashMap::default()));

#[derive(Clone, Copy, PartialEq, Eq)]
enum DeclareState {
    InProgress,
    Done,
}

static DECLARE_STATES: Lazy<Mutex<HashMap<TypeId, DeclareState>>> =
    Lazy::new(|| Mutex::new(HashMap::default()));

// Serializes Injectable::declare calls; reentrant so a declaration may touch
// other injectable types.
static DECLARING: Lazy<ReentrantMutex<()>> = Lazy::new(|| ReentrantMutex::new(()));

/// Adds metadata for `T` through a declaration closure.
///
/// Works for any type, including ones that do not implement [`Injectable`].
pub fn declare<T, F>(f: F) -> DiResult<()>
where
    T: ?Sized + 'static,
    F: FnOnce(&mut Declaration<T>) -> DiResult<()>,
{
    let mut declaration = Declaration::new();
    f(&mut declaration)?;
    let partial = declaration.into_meta()?;

    let mut store = STORE.write();
    let entry = store
        .entry(TypeId::of::<T>())
        .or_insert_with(|| Arc::new(TypeMeta::new(partial.type_name)));
    Arc::make_mut(entry).merge(partial);
    Ok(())
}

/// Runs `T::declare` unless it already ran (or is running) in this process.
///
/// A failed declaration leaves nothing behind and is attempted again on the
/// next use.
pub fn ensure_declared<T: ?Sized + Injectable>() -> DiResult<()> {
    let type_id = TypeId::of::<T>();
    if DECLARE_STATES.lock().get(&type_id) == Some(&DeclareState::Done) {
        return Ok(());
    }

    let _serial = DECLARING.lock();
    {
        let mut states = DECLARE_STATES.lock();
        if states.contains_key(&type_id) {
            return Ok(());
        }
        states.insert(type_id, DeclareState::InProgress);
    }

    let result = declare::<T, _>(T::declare);

    let mut states = DECLARE_STATES.lock();
    match result {
        Ok(()) => {
            states.insert(type_id, DeclareState::Done);
            Ok(())
        }
        Err(err) => {
            states.remove(&type_id);
            Err(err)
        }
    }
}

/// Returns true if metadata was recorded for `T`.
pub fn has_metadata<T: ?Sized + 'static>() -> bool {
    STORE.read().contains_key(&TypeId::of::<T>())
}

pub(crate) fn lookup(type_id: TypeId) -> Option<Arc<TypeMeta>> {
    STORE.read().get(&type_id).cloned()
}

/// Injects declared properties into `target`, skipping slots already set.
pub(crate) fn fill_properties(
    resolver: &dyn ResolverCore,
    target: &mut dyn Any,
    meta: &TypeMeta,
    from_scope: Option<&str>,
) -> DiResult<()> {
    for (name, entry) in &meta.props {
        if entry.slot.is_set(target)? {
            continue;
        }
        let scope = meta.effective_scope(&entry.resolver, from_scope);
        match entry.resolver.resolve(resolver, scope)? {
            Some(value) => entry.slot.assign(target, value)?,
            None if entry.resolver.required => {
                return Err(DiError::Required {
                    target: meta.type_name,
                    slot: format!("property `{}`", name),
                })
            }
            None => {}
        }
    }
    Ok(())
}

/// Resolves declared constructor parameters into positional arguments.
pub(crate) fn resolve_args(
    resolver: &dyn ResolverCore,
    meta: &TypeMeta,
    from_scope: Option<&str>,
) -> DiResult<Args> {
    let len = meta.params.keys().next_back().map_or(0, |last| last + 1);
    let mut values = vec![None; len];
    for (&index, param) in &meta.params {
        let scope = meta.effective_scope(param, from_scope);
        let value = param.resolve(resolver, scope)?;
        if value.is_none() && param.required {
            return Err(DiError::Required {
                target: meta.type_name,
                slot: format!("constructor param[{}]", index),
            });
        }
        values[index] = value;
    }
    Ok(Args::new(meta.type_name, values))
}
