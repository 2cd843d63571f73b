//! Associative storage partitioned by execution context.

use std::hash::Hash;

use parking_lot::RwLock;

use super::{ExecutionContext, WeakContext};
use crate::internal::HashMap;

const MIN_PRUNE_AT: usize = 64;

/// Scope name carried by the root context's frame in every map.
pub const ROOT_SCOPE: &str = "root";

/// Map whose entries belong to execution contexts.
///
/// Each context owns a *frame*: the entries written while it was active and
/// the scope names it was aliased to. Lookups start at a context and walk up
/// through its ancestors, so the nearest frame holding a key wins.
///
/// The root context's frame is named [`ROOT_SCOPE`] from the start. Frames of
/// contexts that no longer exist are unreachable and are pruned as the map
/// grows.
///
/// # Examples
///
/// ```
/// use contextual_di::{ContextMap, ExecutionContext};
///
/// let map: ContextMap<&'static str, u32> = ContextMap::new();
/// let outer = ExecutionContext::current().fork();
/// outer.run(|| {
///     map.alias("outer");
///     map.set("x", 1);
///     ExecutionContext::current().fork().run(|| {
///         map.set("x", 2);
///         assert_eq!(map.get(&"x"), Some(2));
///         assert_eq!(map.closest("outer").get(&"x"), Some(1));
///         assert_eq!(map.distance(&"x"), Some(0));
///     });
///     assert_eq!(map.get(&"x"), Some(1));
/// });
/// ```
pub struct ContextMap<K, V> {
    frames: RwLock<Frames<K, V>>,
}

struct Frames<K, V> {
    by_context: HashMap<u64, Frame<K, V>>,
    prune_at: usize,
}

struct Frame<K, V> {
    owner: WeakContext,
    names: Vec<String>,
    entries: HashMap<K, V>,
}

impl<K, V> Frame<K, V> {
    fn new(owner: &ExecutionContext) -> Self {
        Self {
            owner: owner.downgrade(),
            names: Vec::new(),
            entries: HashMap::default(),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> ContextMap<K, V> {
    /// Creates an empty map.
    pub fn new() -> Self {
        let root = ExecutionContext::root();
        let mut root_frame = Frame::new(&root);
        root_frame.names.push(ROOT_SCOPE.to_string());

        let mut by_context = HashMap::default();
        by_context.insert(root.id(), root_frame);
        Self {
            frames: RwLock::new(Frames {
                by_context,
                prune_at: MIN_PRUNE_AT,
            }),
        }
    }

    /// View of the active context's frame.
    pub fn active(&self) -> MapRef<'_, K, V> {
        MapRef {
            map: self,
            context: ExecutionContext::current(),
        }
    }

    /// Looks `key` up from the active context.
    pub fn get(&self, key: &K) -> Option<V> {
        self.get_from(&ExecutionContext::current(), key)
    }

    /// Writes `key` into the active context's frame.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.set_in(&ExecutionContext::current(), key, value)
    }

    /// Returns true if the active context itself carries `name`.
    pub fn has_name(&self, name: &str) -> bool {
        let context = ExecutionContext::current();
        let frames = self.frames.read();
        frames
            .by_context
            .get(&context.id())
            .is_some_and(|frame| frame.names.iter().any(|n| n == name))
    }

    /// Nearest strict ancestor of the active context carrying `name`.
    pub fn parent(&self, name: &str) -> Option<MapRef<'_, K, V>> {
        let context = ExecutionContext::current();
        let frames = self.frames.read();
        context
            .ancestors()
            .skip(1)
            .find(|ctx| {
                frames
                    .by_context
                    .get(&ctx.id())
                    .is_some_and(|frame| frame.names.iter().any(|n| n == name))
            })
            .map(|ctx| MapRef {
                map: self,
                context: ctx.clone(),
            })
    }

    /// Attaches `name` to the active context.
    pub fn alias(&self, name: &str) {
        let context = ExecutionContext::current();
        let mut frames = self.frames.write();
        let frame = Self::frame_mut(&mut frames, &context);
        if !frame.names.iter().any(|n| n == name) {
            frame.names.push(name.to_string());
        }
    }

    /// The active context when it carries `name`, else the nearest ancestor
    /// carrying it, else the active context.
    pub fn closest(&self, name: &str) -> MapRef<'_, K, V> {
        if self.has_name(name) {
            return self.active();
        }
        self.parent(name).unwrap_or_else(|| self.active())
    }

    /// Number of hops from the active context to the nearest frame holding `key`.
    pub fn distance(&self, key: &K) -> Option<usize> {
        let context = ExecutionContext::current();
        let frames = self.frames.read();
        context.ancestors().position(|ctx| {
            frames
                .by_context
                .get(&ctx.id())
                .is_some_and(|frame| frame.entries.contains_key(key))
        })
    }

    /// Scope names carried by `context`'s own frame.
    pub fn names_of(&self, context: &ExecutionContext) -> Vec<String> {
        self.frames
            .read()
            .by_context
            .get(&context.id())
            .map(|frame| frame.names.clone())
            .unwrap_or_default()
    }

    /// Number of entries in `context`'s own frame.
    pub fn len_of(&self, context: &ExecutionContext) -> usize {
        self.frames
            .read()
            .by_context
            .get(&context.id())
            .map_or(0, |frame| frame.entries.len())
    }

    pub(crate) fn get_from(&self, context: &ExecutionContext, key: &K) -> Option<V> {
        let frames = self.frames.read();
        context.ancestors().find_map(|ctx| {
            frames
                .by_context
                .get(&ctx.id())
                .and_then(|frame| frame.entries.get(key))
                .cloned()
        })
    }

    pub(crate) fn set_in(&self, context: &ExecutionContext, key: K, value: V) -> Option<V> {
        let mut frames = self.frames.write();
        Self::frame_mut(&mut frames, context).entries.insert(key, value)
    }

    fn frame_mut<'f>(frames: &'f mut Frames<K, V>, context: &ExecutionContext) -> &'f mut Frame<K, V> {
        if !frames.by_context.contains_key(&context.id()) && frames.by_context.len() >= frames.prune_at {
            frames.by_context.retain(|_, frame| frame.owner.is_alive());
            frames.prune_at = (frames.by_context.len() * 2).max(MIN_PRUNE_AT);
        }
        frames
            .by_context
            .entry(context.id())
            .or_insert_with(|| Frame::new(context))
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Default for ContextMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

/// A [`ContextMap`] seen from one execution context.
pub struct MapRef<'a, K, V> {
    map: &'a ContextMap<K, V>,
    context: ExecutionContext,
}

impl<'a, K: Eq + Hash + Clone, V: Clone> MapRef<'a, K, V> {
    /// Looks `key` up starting at this view's context.
    pub fn get(&self, key: &K) -> Option<V> {
        self.map.get_from(&self.context, key)
    }

    /// Writes `key` into this view's context frame.
    pub fn set(&self, key: K, value: V) -> Option<V> {
        self.map.set_in(&self.context, key, value)
    }

    /// The context this view starts from.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}
