//! Binding registrations.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::error::{DiError, DiResult};
use crate::key::Id;
use crate::lifetime::{BindOptions, Lifetime};
use crate::metadata::{self, ClassRef};
use crate::traits::ResolverCore;
use crate::AnyArc;

/// Produces instances for factory registrations.
pub(crate) type Producer = Arc<dyn Fn(&dyn ResolverCore) -> DiResult<AnyArc> + Send + Sync>;

/// How a registration obtains its instance
pub(crate) enum RegistrationKind {
    /// Pre-supplied instance
    Value,
    /// Constructed from declared metadata
    Class(ClassRef),
    /// Produced by a closure or factory object
    Factory(Producer),
    /// Forwarded to another identifier
    Alias(Id),
}

/// One binding of an identifier within a frame.
pub(crate) struct Registration {
    pub(crate) lifetime: Lifetime,
    pub(crate) scope: Option<String>,
    pub(crate) kind: RegistrationKind,
    // Filled once for singletons; the first stored value wins
    instance: OnceCell<AnyArc>,
}

impl Registration {
    pub(crate) fn value(value: AnyArc, scope: Option<String>) -> Self {
        Self {
            lifetime: Lifetime::Singleton,
            scope,
            kind: RegistrationKind::Value,
            instance: OnceCell::with_value(value),
        }
    }

    pub(crate) fn class(class: ClassRef, opts: &BindOptions) -> Self {
        Self::with_kind(RegistrationKind::Class(class), opts)
    }

    pub(crate) fn factory(producer: Producer, opts: &BindOptions) -> Self {
        Self::with_kind(RegistrationKind::Factory(producer), opts)
    }

    pub(crate) fn alias(target: Id, scope: Option<String>) -> Self {
        Self {
            lifetime: Lifetime::Transient,
            scope,
            kind: RegistrationKind::Alias(target),
            instance: OnceCell::new(),
        }
    }

    fn with_kind(kind: RegistrationKind, opts: &BindOptions) -> Self {
        Self {
            lifetime: opts.lifetime,
            scope: opts.scope.clone(),
            kind,
            instance: OnceCell::new(),
        }
    }

    /// Returns the cached instance or creates one, caching it for singletons.
    ///
    /// Aliases never cache; they forward to their target with `scope`.
    pub(crate) fn get_instance(
        &self,
        resolver: &dyn ResolverCore,
        scope: Option<&str>,
    ) -> DiResult<Option<AnyArc>> {
        if let RegistrationKind::Alias(target) = &self.kind {
            return resolver.get_any(target, scope);
        }
        if let Some(instance) = self.instance.get() {
            return Ok(Some(instance.clone()));
        }

        // The cell is not locked while user code runs, so a racing thread may
        // build a second instance; only the first one is kept.
        let created = self.create(resolver)?;
        match self.lifetime {
            Lifetime::Singleton => Ok(Some(self.instance.get_or_init(|| created).clone())),
            Lifetime::Transient => Ok(Some(created)),
        }
    }

    fn create(&self, resolver: &dyn ResolverCore) -> DiResult<AnyArc> {
        match &self.kind {
            RegistrationKind::Class(class) => self.construct(class, resolver),
            RegistrationKind::Factory(producer) => producer(resolver),
            RegistrationKind::Value => Err(DiError::InvalidRegistration("value registrations are never created")),
            RegistrationKind::Alias(_) => Err(DiError::InvalidRegistration("alias registrations are never created")),
        }
    }

    fn construct(&self, class: &ClassRef, resolver: &dyn ResolverCore) -> DiResult<AnyArc> {
        let key = class.key();
        key.declare()?;
        let meta = metadata::lookup(key.type_id()).ok_or(DiError::NotConstructible(key.name()))?;
        let constructor = meta
            .constructor
            .as_ref()
            .ok_or(DiError::NotConstructible(key.name()))?;

        let scope = self.scope.as_deref();
        let args = metadata::resolve_args(resolver, &meta, scope)?;
        let mut instance = constructor(&args)?;
        metadata::fill_properties(resolver, &mut *instance, &meta, scope)?;
        class.coerce(Arc::from(instance))
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("lifetime", &self.lifetime)
            .field("scope", &self.scope)
            .field("cached", &self.instance.get().is_some())
            .finish()
    }
}
