//! Scope registry: context-partitioned registrations and the lazy-bind queue.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{DiError, DiResult};
use crate::execution::ContextMap;
use crate::internal::HashMap;
use crate::key::Id;
use crate::registration::Registration;

/// Where a binding ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    /// The active context's frame
    Active,
    /// The frame of the nearest ancestor carrying the named scope
    Ancestor(String),
    /// Queued until the named scope is aliased
    Deferred(String),
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Active => f.write_str("active scope"),
            Placement::Ancestor(name) => write!(f, "ancestor scope {}", name),
            Placement::Deferred(name) => write!(f, "deferred until scope {}", name),
        }
    }
}

type Queue = Vec<(Id, Arc<Registration>)>;

pub(crate) struct ScopeRegistry {
    map: ContextMap<Id, Arc<Registration>>,
    lazy: Mutex<HashMap<String, Queue>>,
}

impl ScopeRegistry {
    pub(crate) fn new() -> Self {
        Self {
            map: ContextMap::new(),
            lazy: Mutex::new(HashMap::default()),
        }
    }

    /// Stores `registration` for `id` according to `scope`.
    pub(crate) fn place(&self, scope: Option<&str>, id: Id, registration: Arc<Registration>) -> Placement {
        // Decided under the queue lock so a concurrent alias_scope flush
        // cannot miss the entry.
        let mut lazy = self.lazy.lock();
        let Some(name) = scope else {
            self.map.set(id, registration);
            return Placement::Active;
        };
        if self.map.has_name(name) {
            self.map.set(id, registration);
            return Placement::Active;
        }
        if let Some(ancestor) = self.map.parent(name) {
            ancestor.set(id, registration);
            return Placement::Ancestor(name.to_string());
        }

        let queue = lazy.entry(name.to_string()).or_default();
        match queue.iter_mut().find(|(queued, _)| *queued == id) {
            Some((_, existing)) => *existing = registration,
            None => queue.push((id, registration)),
        }
        Placement::Deferred(name.to_string())
    }

    /// Names the active context `name` and flushes bindings queued for it.
    ///
    /// Returns the number of flushed bindings.
    pub(crate) fn alias_scope(&self, name: &str) -> DiResult<usize> {
        let mut lazy = self.lazy.lock();
        if self.map.parent(name).is_some() {
            return Err(DiError::ScopeCollision(name.to_string()));
        }
        self.map.alias(name);

        let queued = lazy.remove(name).unwrap_or_default();
        let flushed = queued.len();
        let active = self.map.active();
        for (id, registration) in queued {
            active.set(id, registration);
        }
        Ok(flushed)
    }

    pub(crate) fn has_scope(&self, name: &str) -> bool {
        self.map.has_name(name) || self.map.parent(name).is_some()
    }

    pub(crate) fn distance(&self, id: &Id) -> Option<usize> {
        self.map.distance(id)
    }

    /// Finds the registration for `id`, starting at the closest context named
    /// `from_scope` or at the active context.
    pub(crate) fn find(&self, id: &Id, from_scope: Option<&str>) -> Option<Arc<Registration>> {
        match from_scope {
            Some(name) => self.map.closest(name).get(id),
            None => self.map.get(id),
        }
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn map(&self) -> &ContextMap<Id, Arc<Registration>> {
        &self.map
    }

    #[cfg_attr(not(feature = "diagnostics"), allow(dead_code))]
    pub(crate) fn pending(&self) -> Vec<(String, Vec<String>)> {
        let mut pending: Vec<(String, Vec<String>)> = self
            .lazy
            .lock()
            .iter()
            .map(|(name, queue)| (name.clone(), queue.iter().map(|(id, _)| id.to_string()).collect()))
            .collect();
        pending.sort();
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionContext;

    fn value(n: u32) -> Arc<Registration> {
        Arc::new(Registration::value(Arc::new(n), None))
    }

    #[test]
    fn deferred_bindings_flush_once_in_order() {
        let registry = ScopeRegistry::new();
        ExecutionContext::root().fork().run(|| {
            assert_eq!(registry.place(Some("job"), "a".into(), value(1)), Placement::Deferred("job".into()));
            registry.place(Some("job"), "b".into(), value(2));
            registry.place(Some("job"), "a".into(), value(3));
            assert_eq!(registry.pending(), vec![("job".to_string(), vec!["a".to_string(), "b".to_string()])]);

            assert_eq!(registry.alias_scope("job").unwrap(), 2);
            assert!(registry.pending().is_empty());
            assert!(registry.find(&"a".into(), None).is_some());
            assert_eq!(registry.alias_scope("job").unwrap(), 0);
        });
    }

    #[test]
    fn ancestor_placement() {
        let registry = ScopeRegistry::new();
        let outer = ExecutionContext::root().fork();
        outer.run(|| {
            registry.alias_scope("outer").unwrap();
            outer.fork().run(|| {
                let placed = registry.place(Some("outer"), "x".into(), value(1));
                assert_eq!(placed, Placement::Ancestor("outer".into()));
                assert_eq!(registry.distance(&"x".into()), Some(1));
                assert!(matches!(registry.alias_scope("outer"), Err(DiError::ScopeCollision(_))));
            });
        });
    }
}
