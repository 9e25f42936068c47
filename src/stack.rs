//! Stack safety for the recursive stages.
//!
//! The parser, resolver and evaluator recurse once per nesting level of the
//! program being processed. Wrapping those entry points in
//! [`ensure_sufficient_stack`] grows the host stack on demand, so the only
//! bound on evaluated recursion is the configured call depth.

/// If less than this remains, grow the stack.
const RED_ZONE: usize = 100 * 1024;

/// Size of each new stack segment.
const STACK_PER_RECURSION: usize = 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, f)
}
