//! Resource limits.
//!
//! The only way a Willow program can exhaust host resources is unbounded
//! recursion: there is no `while`/`for` loop construct, so any
//! non-terminating program must recurse, and native stack overflow is the
//! failure mode. A small `ResourceTracker`-shaped struct is enough to guard
//! the one axis this language needs, rather than a general resource budget.

/// Host-configurable ceilings passed to the evaluator at construction.
/// `None` means unlimited — a permissive default for embedding contexts
/// that trust their own programs.
#[derive(Debug, Clone, Copy, Default)]
pub struct Limits {
    /// Maximum number of nested function-scope invocations.
    pub max_call_depth: Option<usize>,
    /// Maximum number of statements the evaluator will execute in one run,
    /// for embedding contexts that want a hard ceiling on work done.
    pub max_steps: Option<usize>,
}

impl Limits {
    pub const fn unlimited() -> Self {
        Self { max_call_depth: None, max_steps: None }
    }

    /// A sane default for untrusted or exploratory programs: deep enough
    /// for realistic recursive algorithms, shallow enough to fail with a
    /// `RecursionError`-shaped diagnostic well before the native stack
    /// actually overflows.
    pub const fn default_bounded() -> Self {
        Self { max_call_depth: Some(1000), max_steps: None }
    }
}
