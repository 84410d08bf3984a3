//! Stack growth for deeply nested expressions.
//!
//! Expression building recurses once per nesting level, and default-value
//! resolution re-enters expression building, so nesting depth is only bounded
//! by the input.

/// Keep at least this much stack available (100KB).
const RED_ZONE: usize = 100 * 1024;

/// Grow by this much when below the red zone (1MB).
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub(crate) fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
