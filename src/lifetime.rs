//! Binding lifetimes and bind options.

/// Lifetime of a binding, controlling instance caching.
///
/// # Examples
///
/// ```rust
/// use contextual_di::{Container, BindOptions};
///
/// struct Counter(u32);
///
/// let container = Container::new();
/// container.bind("single", |_| Ok(Counter(1)), BindOptions::singleton());
/// container.bind("fresh", |_| Ok(Counter(2)), BindOptions::transient());
///
/// let a = container.get("single", None).unwrap().unwrap();
/// let b = container.get("single", None).unwrap().unwrap();
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
///
/// let c = container.get("fresh", None).unwrap().unwrap();
/// let d = container.get("fresh", None).unwrap().unwrap();
/// assert!(!std::sync::Arc::ptr_eq(&c, &d));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// Created once per registration and cached for the registration's life.
    ///
    /// Registrations live in the frame of the scope they were placed in, so a
    /// singleton is shared by every lookup that reaches that frame.
    Singleton,
    /// New instance per resolution, never cached
    #[default]
    Transient,
}

/// Options accepted by bind operations.
///
/// `scope` names the scope the binding is placed in; when that scope does not
/// exist yet the binding is queued until the scope is aliased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindOptions {
    pub lifetime: Lifetime,
    pub scope: Option<String>,
    /// Lifetime of the factory object registered by `bind_factory` with a factory type.
    pub factory_lifetime: FactoryLifetime,
}

/// Lifetime of a factory type registered by `bind_factory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactoryLifetime {
    #[default]
    Singleton,
    Transient,
}

impl BindOptions {
    /// Transient binding in the active scope.
    pub fn transient() -> Self {
        Self::default()
    }

    /// Singleton binding in the active scope.
    pub fn singleton() -> Self {
        Self {
            lifetime: Lifetime::Singleton,
            ..Self::default()
        }
    }

    /// Places the binding in the named scope.
    pub fn in_scope(mut self, scope: impl Into<String>) -> Self {
        self.scope = Some(scope.into());
        self
    }

    /// Creates a new factory object for every product.
    pub fn factory_transient(mut self) -> Self {
        self.factory_lifetime = FactoryLifetime::Transient;
        self
    }
}
