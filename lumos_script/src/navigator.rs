use std::ops::{Deref, DerefMut};

use crate::diagnostics::{DiagnosticLog, ResolveError};
use crate::path::ScriptPath;
use crate::stack::ScriptStack;

/// Scoped region of the evaluation stack. Whatever is pushed through the
/// scope is popped again when it drops, on success and early return alike.
pub(crate) struct StackScope<'s, S: ScriptStack> {
    stack: &'s mut S,
    base: usize,
}

impl<'s, S: ScriptStack> StackScope<'s, S> {
    pub(crate) fn open(stack: &'s mut S) -> Self {
        let base = stack.depth();
        Self { stack, base }
    }

    /// Frames pushed since the scope opened.
    pub(crate) fn pushed(&self) -> usize {
        self.stack.depth().saturating_sub(self.base)
    }
}

impl<S: ScriptStack> Deref for StackScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.stack
    }
}

impl<S: ScriptStack> DerefMut for StackScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.stack
    }
}

impl<S: ScriptStack> Drop for StackScope<'_, S> {
    fn drop(&mut self) {
        let pushed = self.pushed();
        if pushed > 0 {
            self.stack.pop(pushed);
        }
        debug_assert_eq!(self.stack.depth(), self.base);
    }
}

/// A successful walk: the target value sits on top of the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Traversal {
    /// Container frames pushed beneath the target.
    pub(crate) depth: usize,
}

impl Traversal {
    /// Frames to pop to undo the walk: the containers plus the target.
    pub(crate) fn frames(&self) -> usize {
        self.depth + 1
    }
}

/// Walks `path` one segment at a time, leaving the named value on top of the
/// stack. Emits at most one diagnostic; frames pushed before a failure are
/// left for the enclosing scope to release.
pub(crate) fn navigate<S: ScriptStack>(
    scope: &mut StackScope<'_, S>,
    path: &ScriptPath<'_>,
    diagnostics: &mut DiagnosticLog,
) -> Option<Traversal> {
    let mut depth = 0;
    for (index, segment) in path.segments().enumerate() {
        let pushed = if index == 0 {
            scope.push_global(segment)
        } else {
            depth += 1;
            scope.push_field(segment)
        };
        if let Err(err) = pushed {
            diagnostics.record(
                path.as_str(),
                ResolveError::LookupFailed {
                    segment: segment.to_string(),
                    message: err.to_string(),
                },
            );
            return None;
        }
        if scope.is_undefined(-1) {
            diagnostics.record(
                path.as_str(),
                ResolveError::Undefined {
                    segment: segment.to_string(),
                    prefix: path.prefix(index).to_string(),
                },
            );
            return None;
        }
    }
    let traversal = Traversal { depth };
    debug_assert_eq!(scope.pushed(), traversal.frames());
    Some(traversal)
}
