//! Cycle and depth detection for nested resolutions.

use std::cell::RefCell;
use std::marker::PhantomData;

use crate::error::{DiError, DiResult};
use crate::key::Id;

// Thread-local stack of (container, identifier, scope) frames under resolution
thread_local! {
    static RESOLUTION_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

#[derive(Clone, PartialEq, Eq)]
struct Frame {
    container: u64,
    id: Id,
    scope: Option<String>,
}

/// Marks one resolution as in progress on the calling thread.
///
/// Entering the same identifier with the same scope in the same container
/// while it is still on the stack is a cycle. Containers share the stack but
/// never each other's frames, and the depth limit counts only the entering
/// container's frames. The frame is popped when the guard drops, including on
/// early returns through `?`.
pub(crate) struct ResolutionGuard {
    _not_send: PhantomData<*const ()>,
}

impl ResolutionGuard {
    pub(crate) fn enter(container: u64, id: &Id, scope: Option<&str>, max_depth: usize) -> DiResult<Self> {
        RESOLUTION_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            let frame = Frame {
                container,
                id: id.clone(),
                scope: scope.map(str::to_string),
            };

            // Cycle check before pushing the new frame
            if let Some(start) = stack.iter().position(|f| *f == frame) {
                let mut path: Vec<String> = stack[start..]
                    .iter()
                    .filter(|f| f.container == container)
                    .map(|f| f.id.to_string())
                    .collect();
                path.push(frame.id.to_string());
                return Err(DiError::Circular(path));
            }

            let depth = stack.iter().filter(|f| f.container == container).count();
            if depth >= max_depth {
                return Err(DiError::DepthExceeded(depth));
            }

            stack.push(frame);
            Ok(Self {
                _not_send: PhantomData,
            })
        })
    }

    /// Current nesting depth on this thread.
    #[cfg(test)]
    pub(crate) fn depth() -> usize {
        RESOLUTION_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ResolutionGuard {
    fn drop(&mut self) {
        RESOLUTION_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}
