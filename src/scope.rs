//! The scope stack: variable lifetime, name resolution, and closure-capture
//! finalization.
//!
//! Bindings live in one flat map keyed by `(scope id, name)` rather than a
//! hash map per scope, backed by an [`indexmap::IndexMap`] with an `ahash`
//! hasher for fast, deterministic iteration order — the same combination
//! reached for anywhere this crate needs an ordered, hashed table.

use ahash::RandomState;
use indexmap::IndexMap;

use crate::error::StackFrameInfo;
use crate::function::FunctionHandle;
use crate::heap::Heap;
use crate::span::Span;
use crate::tracer::EvalTracer;
use crate::value::Value;

type VarMap<'a> = IndexMap<(u32, String), Value<'a>, RandomState>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeErrorKind {
    Duplicate,
    NotFound,
    Immutable,
}

#[derive(Debug, Clone)]
pub struct ScopeError {
    pub kind: ScopeErrorKind,
    pub name: String,
}

impl ScopeError {
    pub fn message(&self) -> String {
        match self.kind {
            ScopeErrorKind::Duplicate => format!("'{}' is already declared in this scope", self.name),
            ScopeErrorKind::NotFound => format!("Identifier '{}' not found", self.name),
            ScopeErrorKind::Immutable => format!("Variable '{}' is immutable or doesn't exist", self.name),
        }
    }
}

/// One entry in a scope's pending-capture list: a closure instance awaiting
/// capture finalization, paired with the free-variable names (from the
/// parser's capture-name list) it needs resolved against the still-live
/// scope stack.
struct PendingCapture<'a> {
    handle: FunctionHandle<'a>,
    names: &'a [&'a str],
}

enum ScopeKind<'a> {
    Block,
    /// `handle` is the function currently executing in this scope — its
    /// capture-lock and captures map are what name resolution consults
    /// once locked.
    Function { handle: FunctionHandle<'a> },
}

struct Scope<'a> {
    id: u32,
    kind: ScopeKind<'a>,
    locals: Vec<String>,
    pending: Vec<PendingCapture<'a>>,
}

pub struct ScopeStack<'a> {
    scopes: Vec<Scope<'a>>,
    vars: VarMap<'a>,
    /// The call stack, innermost-last; callers render
    /// innermost-first when formatting a diagnostic.
    call_stack: Vec<StackFrameInfo>,
    next_id: u32,
}

impl<'a> ScopeStack<'a> {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            vars: IndexMap::with_hasher(RandomState::new()),
            call_stack: Vec::new(),
            next_id: 0,
        }
    }

    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    pub fn call_stack(&self) -> &[StackFrameInfo] {
        &self.call_stack
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Pushes a plain block scope.
    pub fn scope_in_block<T: EvalTracer>(&mut self, tracer: &mut T) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.scopes.push(Scope { id, kind: ScopeKind::Block, locals: Vec::new(), pending: Vec::new() });
        tracer.scope_enter(id, false);
        id
    }

    /// Pushes a function-call scope and its call-stack frame.
    pub fn scope_in_function<T: EvalTracer>(
        &mut self,
        handle: FunctionHandle<'a>,
        callee_name: String,
        call_site: Option<Span>,
        tracer: &mut T,
    ) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.call_stack.push(StackFrameInfo { name: callee_name, call_site });
        self.scopes.push(Scope { id, kind: ScopeKind::Function { handle }, locals: Vec::new(), pending: Vec::new() });
        tracer.scope_enter(id, true);
        id
    }

    /// Registers a just-evaluated function literal in the current scope's
    /// pending-capture list.
    pub fn defer_capture(&mut self, handle: FunctionHandle<'a>, names: &'a [&'a str]) {
        let scope = self.scopes.last_mut().expect("defer_capture called with an empty scope stack");
        scope.pending.push(PendingCapture { handle, names });
    }

    /// Finalizes captures for every pending closure defined in the scope
    /// being exited, releases its local bindings, and pops it. Capture
    /// finalization happens *before* the scope is popped or its bindings
    /// released — both because resolution must still see names declared
    /// directly in the exiting scope (a closure can capture a sibling `let`
    /// from its own defining block), and because a function captured at
    /// scope exit must never observe a binding that's already been freed.
    pub fn scope_out<T: EvalTracer>(&mut self, heap: &mut Heap<'a>, tracer: &mut T) {
        let pending = std::mem::take(
            &mut self.scopes.last_mut().expect("scope_out called with an empty scope stack").pending,
        );
        for item in &pending {
            let mut captures = Vec::with_capacity(item.names.len());
            let mut captured_names = Vec::with_capacity(item.names.len());
            for &name in item.names {
                if let Some(value) = self.lookup(name) {
                    let copied = value.deep_copy(heap);
                    captures.push((name.to_owned(), copied));
                    captured_names.push(name.to_owned());
                }
            }
            item.handle.lock_with_captures(captures);
            tracer.capture_finalized(item.handle.ast_id(), &captured_names);
        }

        let scope = self.scopes.pop().expect("scope_out called with an empty scope stack");
        for name in &scope.locals {
            if let Some(value) = self.vars.shift_remove(&(scope.id, name.clone())) {
                value.release(heap);
            }
        }

        if matches!(scope.kind, ScopeKind::Function { .. }) {
            self.call_stack.pop();
        }

        tracer.scope_exit(scope.id);
    }

    /// Declares `name` in the current scope.
    /// Fails if the name already exists in the current scope or any
    /// enclosing Block scope up to and including the nearest enclosing
    /// Function scope — a Function scope's own bindings (its parameters)
    /// are the stopping point, and anything beyond it may be shadowed.
    pub fn declare(&mut self, name: &str, value: Value<'a>) -> Result<(), ScopeError> {
        for scope in self.scopes.iter().rev() {
            if self.vars.contains_key(&(scope.id, name.to_owned())) {
                return Err(ScopeError { kind: ScopeErrorKind::Duplicate, name: name.to_owned() });
            }
            if matches!(scope.kind, ScopeKind::Function { .. }) {
                break;
            }
        }
        let scope = self.scopes.last_mut().expect("declare called with an empty scope stack");
        scope.locals.push(name.to_owned());
        self.vars.insert((scope.id, name.to_owned()), value);
        Ok(())
    }

    /// Name resolution, walking innermost to outermost.
    pub fn lookup(&self, name: &str) -> Option<Value<'a>> {
        for scope in self.scopes.iter().rev() {
            if let Some(v) = self.vars.get(&(scope.id, name.to_owned())) {
                return Some(v.clone());
            }
            match &scope.kind {
                ScopeKind::Block => continue,
                ScopeKind::Function { handle, .. } => {
                    if !handle.is_locked() {
                        continue;
                    }
                    return handle.get_capture(name);
                }
            }
        }
        None
    }

    pub fn lookup_or_err(&self, name: &str) -> Result<Value<'a>, ScopeError> {
        self.lookup(name).ok_or_else(|| ScopeError { kind: ScopeErrorKind::NotFound, name: name.to_owned() })
    }

    /// Mutable lookup for assignment: a locked Function
    /// scope blocks all outward traversal and captures are never written.
    pub fn reassign(&mut self, name: &str, new_value: Value<'a>, heap: &mut Heap<'a>) -> Result<(), ScopeError> {
        for scope in self.scopes.iter().rev() {
            let key = (scope.id, name.to_owned());
            if self.vars.contains_key(&key) {
                if let Some(old) = self.vars.insert(key, new_value) {
                    old.release(heap);
                }
                return Ok(());
            }
            match &scope.kind {
                ScopeKind::Block => continue,
                ScopeKind::Function { handle, .. } => {
                    if handle.is_locked() {
                        return Err(ScopeError { kind: ScopeErrorKind::Immutable, name: name.to_owned() });
                    }
                    continue;
                }
            }
        }
        Err(ScopeError { kind: ScopeErrorKind::Immutable, name: name.to_owned() })
    }
}

impl Default for ScopeStack<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracer::NoopTracer;

    #[test]
    fn declare_then_lookup_round_trips() {
        let mut stack = ScopeStack::new();
        stack.scope_in_block(&mut NoopTracer);
        stack.declare("x", Value::Int(1)).unwrap();
        assert!(matches!(stack.lookup("x"), Some(Value::Int(1))));
        stack.scope_out(&mut Heap::new(), &mut NoopTracer);
    }

    #[test]
    fn redeclaring_in_the_same_scope_is_an_error() {
        let mut stack = ScopeStack::new();
        stack.scope_in_block(&mut NoopTracer);
        stack.declare("x", Value::Int(1)).unwrap();
        let err = stack.declare("x", Value::Int(2)).unwrap_err();
        assert_eq!(err.kind, ScopeErrorKind::Duplicate);
        stack.scope_out(&mut Heap::new(), &mut NoopTracer);
    }

    #[test]
    fn inner_block_shadows_outer_binding_and_unwinds_on_exit() {
        let mut heap = Heap::new();
        let mut stack = ScopeStack::new();
        stack.scope_in_block(&mut NoopTracer);
        stack.declare("x", Value::Int(1)).unwrap();
        stack.scope_in_block(&mut NoopTracer);
        stack.declare("x", Value::Int(2)).unwrap();
        assert!(matches!(stack.lookup("x"), Some(Value::Int(2))));
        stack.scope_out(&mut heap, &mut NoopTracer);
        assert!(matches!(stack.lookup("x"), Some(Value::Int(1))));
        stack.scope_out(&mut heap, &mut NoopTracer);
    }

    #[test]
    fn reassigning_an_unknown_name_is_immutable_error() {
        let mut heap = Heap::new();
        let mut stack = ScopeStack::new();
        stack.scope_in_block(&mut NoopTracer);
        let err = stack.reassign("ghost", Value::Int(1), &mut heap).unwrap_err();
        assert_eq!(err.kind, ScopeErrorKind::Immutable);
        stack.scope_out(&mut heap, &mut NoopTracer);
    }

    #[test]
    fn lookup_of_an_unbound_name_is_none() {
        let mut stack = ScopeStack::new();
        stack.scope_in_block(&mut NoopTracer);
        assert!(stack.lookup("nope").is_none());
        stack.scope_out(&mut Heap::new(), &mut NoopTracer);
    }
}
