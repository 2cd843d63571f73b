//! Execution contexts for scope propagation.
//!
//! An [`ExecutionContext`] is a node in the tree of logical execution flows.
//! Every context records the context it was forked from, so bindings written
//! in an outer flow stay visible to the flows it spawns while bindings made in
//! an inner flow stay private to it.
//!
//! The active context follows the calling thread. [`ExecutionContext::enter`]
//! and [`ExecutionContext::run`] switch it for a synchronous section, and
//! [`ExecutionContext::attach`] wraps a future so the context is re-entered on
//! every poll, surviving `.await` points and moves between worker threads.
//!
//! # Examples
//!
//! ```
//! use contextual_di::ExecutionContext;
//!
//! let outer = ExecutionContext::current().fork();
//! outer.run(|| {
//!     let inner = ExecutionContext::current().fork();
//!     assert_eq!(inner.parent().map(|p| p.id()), Some(outer.id()));
//!     assert_eq!(inner.depth(), outer.depth() + 1);
//! });
//! ```

use std::cell::RefCell;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use once_cell::sync::Lazy;

pub mod map;

pub use map::{ContextMap, MapRef, ROOT_SCOPE};

static NEXT_CONTEXT: AtomicU64 = AtomicU64::new(1);

static ROOT: Lazy<ExecutionContext> = Lazy::new(|| ExecutionContext::new_node(None));

thread_local! {
    static ACTIVE: RefCell<Vec<ExecutionContext>> = const { RefCell::new(Vec::new()) };
}

/// Handle to a node of the execution-context tree.
///
/// Cloning is cheap; clones refer to the same node.
#[derive(Clone)]
pub struct ExecutionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    id: u64,
    parent: Option<ExecutionContext>,
    depth: usize,
}

impl ExecutionContext {
    fn new_node(parent: Option<ExecutionContext>) -> Self {
        let depth = parent.as_ref().map_or(0, |p| p.depth() + 1);
        Self {
            inner: Arc::new(ContextInner {
                id: NEXT_CONTEXT.fetch_add(1, Ordering::Relaxed),
                parent,
                depth,
            }),
        }
    }

    /// The process-wide root context, active whenever nothing else was entered.
    pub fn root() -> Self {
        ROOT.clone()
    }

    /// The context active on the calling thread.
    pub fn current() -> Self {
        ACTIVE
            .with(|active| active.borrow().last().cloned())
            .unwrap_or_else(Self::root)
    }

    /// Creates a child of this context.
    pub fn fork(&self) -> Self {
        Self::new_node(Some(self.clone()))
    }

    /// Unique id of this node.
    #[inline]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Number of edges between this node and the root.
    #[inline]
    pub fn depth(&self) -> usize {
        self.inner.depth
    }

    /// The context this one was forked from.
    pub fn parent(&self) -> Option<&ExecutionContext> {
        self.inner.parent.as_ref()
    }

    /// Returns true for the root context.
    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Iterates from this context up to the root, this context first.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Makes this context active on the calling thread until the guard drops.
    pub fn enter(&self) -> ContextGuard {
        let restore_len = ACTIVE.with(|active| {
            let mut active = active.borrow_mut();
            let len = active.len();
            active.push(self.clone());
            len
        });
        ContextGuard {
            restore_len,
            _not_send: PhantomData,
        }
    }

    /// Runs `f` with this context active.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = self.enter();
        f()
    }

    /// Wraps `future` so this context is active whenever it is polled.
    pub fn attach<F: Future>(&self, future: F) -> Contextual<F> {
        Contextual {
            context: self.clone(),
            inner: Box::pin(future),
        }
    }

    pub(crate) fn downgrade(&self) -> WeakContext {
        WeakContext {
            inner: Arc::downgrade(&self.inner),
        }
    }
}

impl PartialEq for ExecutionContext {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for ExecutionContext {}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("id", &self.inner.id)
            .field("depth", &self.inner.depth)
            .finish()
    }
}

/// Iterator over a context and its ancestors.
pub struct Ancestors<'a> {
    next: Option<&'a ExecutionContext>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a ExecutionContext;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Restores the previously active context when dropped.
#[must_use = "the context is only active while the guard is alive"]
pub struct ContextGuard {
    restore_len: usize,
    _not_send: PhantomData<*const ()>,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        ACTIVE.with(|active| active.borrow_mut().truncate(self.restore_len));
    }
}

#[derive(Clone)]
pub(crate) struct WeakContext {
    inner: Weak<ContextInner>,
}

impl WeakContext {
    pub(crate) fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }
}

/// Future that runs inside an [`ExecutionContext`].
///
/// Created by [`ExecutionContext::attach`].
pub struct Contextual<F> {
    context: ExecutionContext,
    inner: Pin<Box<F>>,
}

impl<F> Contextual<F> {
    /// The context the future runs in.
    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }
}

impl<F: Future> Future for Contextual<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _guard = this.context.enter();
        this.inner.as_mut().poll(cx)
    }
}

/// Spawns `future` on the tokio runtime inside a fresh child of the current context.
///
/// This is the async boundary of the context tree: the spawned task sees
/// every binding of the spawning flow, and the spawning flow never sees the
/// task's own bindings.
#[cfg(feature = "async")]
pub fn spawn<F>(future: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    tokio::spawn(ExecutionContext::current().fork().attach(future))
}
