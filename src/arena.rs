//! The bump arena owning AST nodes and parser-lifetime identifier strings.
//!
//! Grounded in the example corpus's own use of `typed_arena::Arena` to own
//! node-shaped data for the lifetime of a single pass (see
//! `typst-library::routines::Arenas`, which owns `Content`/`Styles` the same
//! way). The arena is alive for the whole evaluator lifetime and is dropped
//! in bulk once evaluation completes — individual AST nodes are never freed
//! early.

use typed_arena::Arena as TypedArena;

use crate::ast::{Expr, Stmt};

/// Owns every `Stmt`/`Expr` node and every identifier string produced while
/// parsing one program, plus the program's interned string literals. Nodes
/// are allocated once and referenced by `&'a` lifetime for the rest of the
/// parse + evaluation pipeline.
///
/// `'a` is the arena's own lifetime: callers hold `&'a Arena<'a>` and every
/// `alloc_*` call hands back a reference borrowed for that same `'a`, which
/// is what lets an `Expr<'a>` hold `&'a Expr<'a>` children.
#[derive(Default)]
pub struct Arena<'a> {
    stmts: TypedArena<Stmt<'a>>,
    exprs: TypedArena<Expr<'a>>,
    strings: TypedArena<String>,
    stmt_refs: TypedArena<&'a Stmt<'a>>,
    expr_refs: TypedArena<&'a Expr<'a>>,
    dict_entries: TypedArena<(&'a Expr<'a>, &'a Expr<'a>)>,
    str_refs: TypedArena<&'a str>,
}

impl<'a> Arena<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc_stmt(&'a self, stmt: Stmt<'a>) -> &'a Stmt<'a> {
        self.stmts.alloc(stmt)
    }

    pub fn alloc_expr(&'a self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.exprs.alloc(expr)
    }

    /// Interns an identifier or string-literal payload, returning a
    /// `'a`-lived `&str` so AST nodes can borrow text without an owned
    /// `String` per node.
    pub fn alloc_str(&'a self, s: impl Into<String>) -> &'a str {
        self.strings.alloc(s.into())
    }

    /// Allocates a statement list (a block's body, `if`'s branches, a whole
    /// program) as one contiguous `'a`-lived slice.
    pub fn alloc_stmt_slice(&'a self, items: Vec<&'a Stmt<'a>>) -> &'a [&'a Stmt<'a>] {
        self.stmt_refs.alloc_extend(items)
    }

    /// Allocates an expression list (call arguments, array-literal items).
    pub fn alloc_expr_slice(&'a self, items: Vec<&'a Expr<'a>>) -> &'a [&'a Expr<'a>] {
        self.expr_refs.alloc_extend(items)
    }

    /// Allocates a dict literal's key/value entry list.
    pub fn alloc_dict_entries(
        &'a self,
        items: Vec<(&'a Expr<'a>, &'a Expr<'a>)>,
    ) -> &'a [(&'a Expr<'a>, &'a Expr<'a>)] {
        self.dict_entries.alloc_extend(items)
    }

    /// Allocates an identifier list (a function literal's parameters or
    /// computed capture-name list).
    pub fn alloc_str_slice(&'a self, items: Vec<&'a str>) -> &'a [&'a str] {
        self.str_refs.alloc_extend(items)
    }
}
