//! Stack growth for the recursive parts of the interpreter.
//!
//! Parsing and evaluation recurse once per nesting level of the program.
//! Each recursive entry point goes through [`ensure_sufficient_stack`], which
//! moves onto a freshly allocated segment when the current one runs low, so
//! deep programs hit the interpreter's own limits instead of the thread's.

/// Grow when less than this much stack remains.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated stack segment.
const STACK_PER_SEGMENT: usize = 2 * 1024 * 1024;

#[inline]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, STACK_PER_SEGMENT, f)
}
