//! Function values and closure capture.
//!
//! A [`FunctionHandle`] pairs a direct reference to the defining
//! `FunctionExpression` AST node (owned by the [`crate::arena::Arena`]) with
//! an `Rc<RefCell<_>>` holding the auxiliary state allocated the first time
//! the function literal is evaluated: the captures map and the
//! capture-lock flag. Two handles produced by evaluating the *same* literal
//! share an AST node but own independent capture state — `mk("World")`
//! called twice produces two closures, each with its own frozen `who`,
//! which is exactly what distinct `Rc`s give us for free.
//!
//! Equality is by AST-node identity only: compare `ast_id()`, never the
//! captures.

use std::cell::RefCell;
use std::rc::Rc;

use crate::ast::FunctionExpr;
use crate::value::Value;

#[derive(Debug)]
struct FunctionInner<'a> {
    locked: bool,
    captures: Vec<(String, Value<'a>)>,
    /// Set once, the first time this particular closure instance is bound
    /// by a `let` whose initializer is the function literal itself. Unrelated closures from the same literal keep their own
    /// name independently since each owns a distinct `Rc`.
    name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FunctionHandle<'a> {
    pub def: &'a FunctionExpr<'a>,
    inner: Rc<RefCell<FunctionInner<'a>>>,
}

impl<'a> FunctionHandle<'a> {
    pub fn new(def: &'a FunctionExpr<'a>) -> Self {
        Self { def, inner: Rc::new(RefCell::new(FunctionInner { locked: false, captures: Vec::new(), name: None })) }
    }

    pub fn ast_id(&self) -> u32 {
        self.def.id
    }

    pub fn arity(&self) -> usize {
        self.def.params.len()
    }

    pub fn is_locked(&self) -> bool {
        self.inner.borrow().locked
    }

    /// Finalizes captures: called exactly once, when the
    /// defining scope exits.
    pub fn lock_with_captures(&self, captures: Vec<(String, Value<'a>)>) {
        let mut inner = self.inner.borrow_mut();
        debug_assert!(!inner.locked, "captures finalized twice for the same closure instance");
        inner.captures = captures;
        inner.locked = true;
    }

    pub fn get_capture(&self, name: &str) -> Option<Value<'a>> {
        let inner = self.inner.borrow();
        inner.captures.iter().find(|(n, _)| n == name).map(|(_, v)| v.clone())
    }

    /// Names this closure instance if it has not already been named, used
    /// when a `let name = fn(...){...}` binds a freshly-evaluated function
    /// literal directly.
    pub fn name_if_unset(&self, name: &str) {
        let mut inner = self.inner.borrow_mut();
        if inner.name.is_none() {
            inner.name = Some(name.to_owned());
        }
    }

    pub fn render(&self) -> String {
        let inner = self.inner.borrow();
        let name = inner.name.as_deref().unwrap_or("");
        format!("function {name}({})", self.def.params.join(", "))
    }

    /// The closure's bound name, if any, for call-stack frames — shorter
    /// than [`Self::render`]'s full `function name(params)` form.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone().unwrap_or_else(|| "<anonymous>".to_owned())
    }
}
