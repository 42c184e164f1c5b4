//! Statement execution and expression evaluation.
//!
//! The evaluator is generic over an [`ErrorSink`], an [`Output`] channel and
//! an [`EvalTracer`] — three swappable ambient collaborators threaded
//! through by type parameter rather than trait objects, so the hot path
//! monomorphizes away the indirection.
//!
//! ## Refcount discipline
//!
//! A freshly produced heap-backed `Value` (from [`crate::heap::Heap::allocate`]
//! — i.e. any literal, `deep_copy`, or compound-building binary op) starts
//! owned at refcount 1. Moving it directly into its one destination (an
//! array/dict slot being built, a `let` binding, a reassignment target, a
//! `return` payload, a capture-map entry, a function parameter) is a plain
//! Rust move and needs no further refcount traffic. The only add_ref/release
//! calls this module makes explicitly are for releasing a transient value
//! that was evaluated purely as an operand — a binary op's operands, an
//! index's collection and key, an `if` condition, a `!` operand, a call's
//! callee, a call's arguments after they've been re-copied into parameter
//! bindings, and a call result discarded by an expression statement — since
//! nothing else will ever release those. Teardown releases (`scope_out`'s
//! locals, `reassign`'s old value, the heap's own recursive child release)
//! live in [`crate::scope`] and [`crate::heap`].

use crate::ast::{BinaryOp, Expr, Stmt};
use crate::builtins::{self, BuiltinId};
use crate::error::{ErrorSink, EvalError, EvalResult};
use crate::function::FunctionHandle;
use crate::heap::{Heap, HeapData};
use crate::io::Output;
use crate::limits::Limits;
use crate::scope::ScopeStack;
use crate::span::Span;
use crate::tracer::EvalTracer;
use crate::value::{dict_find, Value};

/// Call-argument buffer. Most calls in practice pass a handful of
/// arguments, so this stays on the stack instead of allocating — the same
/// small-vector inlining the builtin-tuple paths use for their own
/// short-lived argument lists.
pub(crate) type ArgVec<'a> = smallvec::SmallVec<[Value<'a>; 4]>;

/// The three-way outcome of executing a statement or a statement list:
/// whether a `return` was hit, and with what payload.
#[derive(Debug)]
pub enum ReturnAction<'a> {
    DidntReturn,
    ReturnedVoid,
    ReturnedValue(Value<'a>),
}

pub struct Evaluator<'a, S: ErrorSink, O: Output, T: EvalTracer> {
    pub heap: Heap<'a>,
    pub scopes: ScopeStack<'a>,
    sink: S,
    output: O,
    tracer: T,
    limits: Limits,
    steps: usize,
}

impl<'a, S: ErrorSink, O: Output, T: EvalTracer> Evaluator<'a, S, O, T> {
    pub fn new(sink: S, output: O, tracer: T, limits: Limits) -> Self {
        Self { heap: Heap::new(), scopes: ScopeStack::new(), sink, output, tracer, limits, steps: 0 }
    }

    pub fn heap(&self) -> &Heap<'a> {
        &self.heap
    }

    pub fn heap_mut(&mut self) -> &mut Heap<'a> {
        &mut self.heap
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn output_mut(&mut self) -> &mut O {
        &mut self.output
    }

    /// Consumes the evaluator, handing back its sink and output channel.
    /// Used by [`crate::runner`] once a program has finished running, since
    /// the heap and scope stack (and every `Value` they hold) are tied to
    /// the arena's lifetime and cannot outlive it, but the sink/output
    /// carry no such borrow and are exactly what a caller wants back.
    pub fn into_parts(self) -> (S, O) {
        (self.sink, self.output)
    }

    /// Looks up a builtin's own parameter, already bound in the current
    /// (builtin call) scope. Not a read-through boundary in the name
    /// resolution sense — builtins peek at their arguments without claiming
    /// a new durable owner, so callers must not release the value this
    /// returns.
    pub fn param(&self, name: &str) -> Value<'a> {
        self.scopes.lookup(name).expect("builtin parameter always bound by its own synthetic body")
    }

    pub(crate) fn fail(&mut self, span: Span, message: String) -> EvalError {
        let stack = self.scopes.call_stack().to_vec();
        self.sink.fail_ranged(span, message, &stack);
        EvalError
    }

    /// Runs a whole program: installs the host builtins in the bottom
    /// scope, executes every top-level statement, then tears that scope
    /// down.
    pub fn run(&mut self, program: &'a [&'a Stmt<'a>]) -> EvalResult<()> {
        self.scopes.scope_in_block(&mut self.tracer);
        builtins::install(&mut self.scopes);
        let result = self.exec_stmts(program);
        self.scopes.scope_out(&mut self.heap, &mut self.tracer);
        result.map(|_| ())
    }

    fn exec_block(&mut self, body: &'a [&'a Stmt<'a>]) -> EvalResult<ReturnAction<'a>> {
        self.scopes.scope_in_block(&mut self.tracer);
        let result = self.exec_stmts(body);
        self.scopes.scope_out(&mut self.heap, &mut self.tracer);
        result
    }

    fn exec_stmts(&mut self, body: &'a [&'a Stmt<'a>]) -> EvalResult<ReturnAction<'a>> {
        for stmt in body {
            match self.exec_stmt(stmt)? {
                ReturnAction::DidntReturn => continue,
                other => return Ok(other),
            }
        }
        Ok(ReturnAction::DidntReturn)
    }

    fn exec_stmt(&mut self, stmt: &'a Stmt<'a>) -> EvalResult<ReturnAction<'a>> {
        self.steps += 1;
        if let Some(max) = self.limits.max_steps {
            if self.steps > max {
                return Err(self.fail(stmt.span(), "Step limit exceeded".to_owned()));
            }
        }

        match stmt {
            Stmt::Block { body, .. } => self.exec_block(body),
            Stmt::ExprStmt { expr, span } => {
                if !expr.is_call() {
                    return Err(self.fail(*span, "Only call expressions may appear as statements".to_owned()));
                }
                if let Some(discarded) = self.eval_expr(expr, true)? {
                    discarded.release(&mut self.heap);
                }
                Ok(ReturnAction::DidntReturn)
            }
            // A block's final bare expression (no trailing `;`): its value
            // becomes the enclosing block's `ReturnAction`, propagated the
            // same way an explicit `return` would be.
            Stmt::TailExpr { expr, .. } => match self.eval_expr(expr, true)? {
                Some(v) => Ok(ReturnAction::ReturnedValue(v)),
                None => Ok(ReturnAction::ReturnedVoid),
            },
            Stmt::Let { name, value, span } => {
                let v = self.eval_value(value)?;
                if matches!(value, Expr::Function(_)) {
                    if let Value::Function(handle) = &v {
                        handle.name_if_unset(name);
                    }
                }
                self.scopes.declare(name, v).map_err(|e| self.fail(*span, e.message()))?;
                Ok(ReturnAction::DidntReturn)
            }
            Stmt::Reassign { name, value, span } => {
                let v = self.eval_value(value)?;
                self.scopes.reassign(name, v, &mut self.heap).map_err(|e| self.fail(*span, e.message()))?;
                Ok(ReturnAction::DidntReturn)
            }
            Stmt::Return { value, .. } => match value {
                None => Ok(ReturnAction::ReturnedVoid),
                Some(expr) => Ok(ReturnAction::ReturnedValue(self.eval_value(expr)?)),
            },
            Stmt::If { cond, then_block, else_block, span } => {
                let c = self.eval_value(cond)?;
                let Value::Bool(b) = c else {
                    return Err(self.fail(*span, format!("Expected boolean condition, got {}", c.type_name())));
                };
                self.scopes.scope_in_block(&mut self.tracer);
                let result = if b {
                    self.exec_stmts(then_block)
                } else if let Some(else_block) = else_block {
                    self.exec_stmts(else_block)
                } else {
                    Ok(ReturnAction::DidntReturn)
                };
                self.scopes.scope_out(&mut self.heap, &mut self.tracer);
                result
            }
            Stmt::ExternalInvocation { id, span } => builtins::dispatch(self, *id, *span),
        }
    }

    /// Evaluates an expression. `allow_void` permits a `Call` that didn't
    /// return a value to yield `None` instead of failing — the only
    /// legitimate source of `None`.
    fn eval_expr(&mut self, expr: &'a Expr<'a>, allow_void: bool) -> EvalResult<Option<Value<'a>>> {
        match expr {
            Expr::Int(n, _) => Ok(Some(Value::Int(*n))),
            Expr::Bool(b, _) => Ok(Some(Value::Bool(*b))),
            Expr::Str(s, _) => Ok(Some(Value::Str(self.heap.allocate(HeapData::Str((*s).to_owned()))))),
            Expr::Var(name, span) => match self.scopes.lookup_or_err(name) {
                Ok(v) => Ok(Some(v.deep_copy(&mut self.heap))),
                Err(e) => Err(self.fail(*span, e.message())),
            },
            Expr::Paren(inner, _) => self.eval_expr(inner, allow_void),
            Expr::Not(inner, span) => {
                let v = self.eval_value(inner)?;
                let result = match v {
                    Value::Bool(b) => Ok(Value::Bool(!b)),
                    ref other => Err(self.fail(*span, format!("Cannot negate {}", other.type_name()))),
                };
                v.release(&mut self.heap);
                result.map(Some)
            }
            Expr::Function(fexpr) => {
                let handle = FunctionHandle::new(fexpr);
                self.scopes.defer_capture(handle.clone(), fexpr.captures);
                Ok(Some(Value::Function(handle)))
            }
            Expr::Call { callee, args, span } => {
                let target = self.eval_value(callee)?;
                let mut arg_values = ArgVec::with_capacity(args.len());
                for a in *args {
                    arg_values.push(self.eval_value(a)?);
                }
                match self.invoke(target, arg_values, *span)? {
                    ReturnAction::ReturnedValue(v) => Ok(Some(v)),
                    ReturnAction::ReturnedVoid | ReturnAction::DidntReturn => {
                        if allow_void {
                            Ok(None)
                        } else {
                            Err(self.fail(*span, "Function didn't return a value".to_owned()))
                        }
                    }
                }
            }
            Expr::Index { collection, index, span } => {
                let c = self.eval_value(collection)?;
                let i = self.eval_value(index)?;
                let result = self.index_value(&c, &i, *span);
                c.release(&mut self.heap);
                i.release(&mut self.heap);
                result.map(Some)
            }
            Expr::Binary { op, lhs, rhs, span } => {
                let l = self.eval_value(lhs)?;
                let r = self.eval_value(rhs)?;
                let result = self.binary_op(*op, &l, &r, *span);
                l.release(&mut self.heap);
                r.release(&mut self.heap);
                result.map(Some)
            }
            Expr::Array(items, _) => {
                let mut values = Vec::with_capacity(items.len());
                for it in *items {
                    values.push(self.eval_value(it)?);
                }
                Ok(Some(Value::Array(self.heap.allocate(HeapData::Array(values)))))
            }
            Expr::Dict(entries, span) => {
                let mut out: Vec<(Value<'a>, Value<'a>)> = Vec::with_capacity(entries.len());
                for (k_expr, v_expr) in *entries {
                    let k = self.eval_value(k_expr)?;
                    let v = self.eval_value(v_expr)?;
                    if dict_find(&out, &k, &self.heap).is_some() {
                        return Err(self.fail(*span, "Duplicate key in dict literal".to_owned()));
                    }
                    out.push((k, v));
                }
                Ok(Some(Value::Dict(self.heap.allocate(HeapData::Dict(out)))))
            }
        }
    }

    /// Evaluates an expression in a context that requires a value (anywhere
    /// but the top of an `ExpressionStatement`).
    fn eval_value(&mut self, expr: &'a Expr<'a>) -> EvalResult<Value<'a>> {
        match self.eval_expr(expr, false)? {
            Some(v) => Ok(v),
            None => unreachable!("eval_expr(_, false) never yields a void result"),
        }
    }

    fn index_value(&mut self, collection: &Value<'a>, index: &Value<'a>, span: Span) -> EvalResult<Value<'a>> {
        match collection {
            Value::Array(id) => {
                let Value::Int(i) = index else {
                    return Err(self.fail(span, format!("Array index must be an integer, got {}", index.type_name())));
                };
                let items = self.heap.get(*id).as_array();
                let Ok(i) = usize::try_from(*i) else {
                    return Err(self.fail(span, "Index out of range".to_owned()));
                };
                match items.get(i) {
                    Some(v) => Ok(v.deep_copy(&mut self.heap)),
                    None => Err(self.fail(span, "Index out of range".to_owned())),
                }
            }
            Value::Dict(id) => {
                let entries = self.heap.get(*id).as_dict();
                match dict_find(entries, index, &self.heap) {
                    Some(i) => Ok(self.heap.get(*id).as_dict()[i].1.deep_copy(&mut self.heap)),
                    None => Err(self.fail(span, "Key not found".to_owned())),
                }
            }
            other => Err(self.fail(span, format!("Cannot use index operator on {}", other.type_name()))),
        }
    }

    fn binary_op(&mut self, op: BinaryOp, l: &Value<'a>, r: &Value<'a>, span: Span) -> EvalResult<Value<'a>> {
        use BinaryOp::*;
        match op {
            Add => self.eval_add(l, r, span),
            Sub => self.int_arith(l, r, span, "-", i64::checked_sub),
            Mul => self.int_arith(l, r, span, "*", i64::checked_mul),
            Div => match (l, r) {
                (Value::Int(_), Value::Int(0)) => Err(self.fail(span, "Division by zero".to_owned())),
                (Value::Int(a), Value::Int(b)) => match a.checked_div(*b) {
                    Some(n) => Ok(Value::Int(n)),
                    None => Err(self.fail(span, "Division overflow".to_owned())),
                },
                _ => Err(self.fail(span, format!("Cannot divide {} by {}", l.type_name(), r.type_name()))),
            },
            Eq => Ok(Value::Bool(l.structural_eq(r, &self.heap))),
            NotEq => Ok(Value::Bool(!l.structural_eq(r, &self.heap))),
            Lt => match (l, r) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a < b)),
                _ => Err(self.fail(span, format!("Cannot compare {} and {}", l.type_name(), r.type_name()))),
            },
            Gt => match (l, r) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Bool(a > b)),
                _ => Err(self.fail(span, format!("Cannot compare {} and {}", l.type_name(), r.type_name()))),
            },
            And => match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a && *b)),
                _ => Err(self.fail(span, format!("Cannot apply && to {} and {}", l.type_name(), r.type_name()))),
            },
            Or => match (l, r) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(*a || *b)),
                _ => Err(self.fail(span, format!("Cannot apply || to {} and {}", l.type_name(), r.type_name()))),
            },
        }
    }

    fn int_arith(
        &mut self,
        l: &Value<'a>,
        r: &Value<'a>,
        span: Span,
        symbol: &str,
        op: fn(i64, i64) -> Option<i64>,
    ) -> EvalResult<Value<'a>> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => match op(*a, *b) {
                Some(n) => Ok(Value::Int(n)),
                None => Err(self.fail(span, format!("Integer overflow in {a} {symbol} {b}"))),
            },
            _ => Err(self.fail(span, format!("Cannot apply {symbol} to {} and {}", l.type_name(), r.type_name()))),
        }
    }

    /// `+`: integer addition, dict/array
    /// merge-with-deep-copied-contents, or string concatenation against any
    /// type's rendered form.
    fn eval_add(&mut self, l: &Value<'a>, r: &Value<'a>, span: Span) -> EvalResult<Value<'a>> {
        match (l, r) {
            (Value::Int(a), Value::Int(b)) => match a.checked_add(*b) {
                Some(n) => Ok(Value::Int(n)),
                None => Err(self.fail(span, format!("Integer overflow in {a} + {b}"))),
            },
            (Value::Str(_), other) => {
                let mut s = l.render_top(&self.heap);
                s.push_str(&other.render_top(&self.heap));
                Ok(Value::Str(self.heap.allocate(HeapData::Str(s))))
            }
            (Value::Array(a), Value::Array(b)) => {
                let lhs: Vec<Value<'a>> = self.heap.get(*a).as_array().to_vec();
                let rhs: Vec<Value<'a>> = self.heap.get(*b).as_array().to_vec();
                let mut merged = Vec::with_capacity(lhs.len() + rhs.len());
                merged.extend(lhs.iter().map(|v| v.deep_copy(&mut self.heap)));
                merged.extend(rhs.iter().map(|v| v.deep_copy(&mut self.heap)));
                Ok(Value::Array(self.heap.allocate(HeapData::Array(merged))))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                let lhs: Vec<(Value<'a>, Value<'a>)> = self.heap.get(*a).as_dict().to_vec();
                let rhs: Vec<(Value<'a>, Value<'a>)> = self.heap.get(*b).as_dict().to_vec();
                let mut merged: Vec<(Value<'a>, Value<'a>)> = Vec::with_capacity(lhs.len() + rhs.len());
                for (k, v) in &lhs {
                    merged.push((k.deep_copy(&mut self.heap), v.deep_copy(&mut self.heap)));
                }
                for (k, v) in &rhs {
                    if dict_find(&merged, k, &self.heap).is_some() {
                        return Err(self.fail(span, "Duplicate key merging dicts with +".to_owned()));
                    }
                    merged.push((k.deep_copy(&mut self.heap), v.deep_copy(&mut self.heap)));
                }
                Ok(Value::Dict(self.heap.allocate(HeapData::Dict(merged))))
            }
            _ => Err(self.fail(span, format!("Cannot apply + to {} and {}", l.type_name(), r.type_name()))),
        }
    }

    /// Invokes a function value with already-evaluated arguments. Takes
    /// ownership of `target` and `args`; every argument is deep-copied again
    /// into its parameter binding (a second read-through boundary beyond
    /// however it was produced) and the original transient is released once
    /// that copy is made.
    pub(crate) fn invoke(
        &mut self,
        target: Value<'a>,
        args: ArgVec<'a>,
        span: Span,
    ) -> EvalResult<ReturnAction<'a>> {
        let Value::Function(handle) = &target else {
            let result = Err(self.fail(span, format!("Unable to invoke {}", target.type_name())));
            target.release(&mut self.heap);
            for a in args {
                a.release(&mut self.heap);
            }
            return result;
        };

        if handle.arity() != args.len() {
            let result = Err(self.fail(
                span,
                format!("Expected {} argument(s), got {}", handle.arity(), args.len()),
            ));
            for a in args {
                a.release(&mut self.heap);
            }
            return result;
        }

        if let Some(max_depth) = self.limits.max_call_depth {
            if self.scopes.depth() >= max_depth {
                for a in args {
                    a.release(&mut self.heap);
                }
                return Err(self.fail(span, "Maximum call depth exceeded".to_owned()));
            }
        }

        let callee_name = handle.name();
        self.scopes.scope_in_function(handle.clone(), callee_name.clone(), Some(span), &mut self.tracer);
        self.tracer.call_enter(&callee_name, span);

        for (param, arg) in handle.def.params.iter().zip(args) {
            let copied = arg.deep_copy(&mut self.heap);
            arg.release(&mut self.heap);
            self.scopes.declare(param, copied).expect("fresh function scope cannot already bind a parameter name");
        }

        let result = self.exec_block(handle.def.body);

        self.tracer.call_exit(&callee_name);
        self.scopes.scope_out(&mut self.heap, &mut self.tracer);

        result
    }
}
