//! Execution tracing.
//!
//! Willow carries no `log`/`tracing` crate dependency: instead it exposes a
//! zero-cost [`EvalTracer`] trait with default no-op methods, monomorphized
//! away in the production path via a `NoopTracer` implementation.
//! [`RecordingTracer`] is the debugging/test counterpart, collecting an
//! event log so tests can assert on capture-finalization and call ordering
//! without reaching into evaluator internals.

use crate::span::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    ScopeEnter { scope_id: u32, is_function: bool },
    ScopeExit { scope_id: u32 },
    CallEnter { callee: String, call_site: Span },
    CallExit { callee: String },
    CaptureFinalized { function_id: u32, names: Vec<String> },
}

/// Hook trait observing scope/call/capture events as the evaluator walks
/// the AST. Every method has a no-op default so implementations only
/// override what they care about.
pub trait EvalTracer {
    fn scope_enter(&mut self, _scope_id: u32, _is_function: bool) {}
    fn scope_exit(&mut self, _scope_id: u32) {}
    fn call_enter(&mut self, _callee: &str, _call_site: Span) {}
    fn call_exit(&mut self, _callee: &str) {}
    fn capture_finalized(&mut self, _function_id: u32, _names: &[String]) {}
}

/// Production default: every hook compiles away.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl EvalTracer for NoopTracer {}

/// Collects every event in order, for tests asserting ordering invariants
/// (captures finalized before bindings are released, etc.).
#[derive(Debug, Default)]
pub struct RecordingTracer {
    pub events: Vec<TraceEvent>,
}

impl RecordingTracer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EvalTracer for RecordingTracer {
    fn scope_enter(&mut self, scope_id: u32, is_function: bool) {
        self.events.push(TraceEvent::ScopeEnter { scope_id, is_function });
    }

    fn scope_exit(&mut self, scope_id: u32) {
        self.events.push(TraceEvent::ScopeExit { scope_id });
    }

    fn call_enter(&mut self, callee: &str, call_site: Span) {
        self.events.push(TraceEvent::CallEnter { callee: callee.to_owned(), call_site });
    }

    fn call_exit(&mut self, callee: &str) {
        self.events.push(TraceEvent::CallExit { callee: callee.to_owned() });
    }

    fn capture_finalized(&mut self, function_id: u32, names: &[String]) {
        self.events.push(TraceEvent::CaptureFinalized { function_id, names: names.to_vec() });
    }
}
