//! Native stack growth for nested drivers
//!
//! Statements never recurse natively, but a function called from inside an
//! expression starts a nested driver loop, and expressions themselves are
//! evaluated recursively. Both paths go through [`ensure_sufficient_stack`].

/// Grow the stack when less than this remains
const RED_ZONE: usize = 100 * 1024;

/// Stack space to allocate when growing
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
