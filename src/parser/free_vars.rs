//! Computes a function literal's capture-name list: every identifier
//! referenced free inside its body (read or reassigned, not a parameter and
//! not declared by a `let` that's in scope at the point of use), in
//! first-use order, deduplicated.
//!
//! Called once per `fn` literal, right after its body is parsed. Nested
//! function literals are handled by re-using the capture list *they*
//! already computed (parsing is bottom-up, so a nested literal's own
//! `captures` field is populated before its enclosing literal's body
//! finishes parsing) rather than re-walking their bodies: a name in a
//! nested literal's capture list is free for the nested closure, and is
//! therefore also free for any enclosing function that doesn't bind it
//! somewhere in its own scope chain up to that point.

use std::collections::HashSet;

use crate::ast::{Expr, Stmt};

/// A stack of bound-name sets, innermost last, mirroring the block nesting
/// the evaluator's own scope stack will walk at runtime. A name is "bound"
/// if it appears in any frame.
struct Collector<'a> {
    bound: Vec<HashSet<&'a str>>,
    seen: HashSet<&'a str>,
    order: Vec<&'a str>,
}

impl<'a> Collector<'a> {
    fn is_bound(&self, name: &str) -> bool {
        self.bound.iter().any(|frame| frame.contains(name))
    }

    fn note_free(&mut self, name: &'a str) {
        if !self.is_bound(name) && self.seen.insert(name) {
            self.order.push(name);
        }
    }

    fn push_scope(&mut self) {
        self.bound.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.bound.pop();
    }

    fn bind(&mut self, name: &'a str) {
        self.bound.last_mut().expect("collector always has an active scope").insert(name);
    }

    fn walk_stmts(&mut self, stmts: &'a [&'a Stmt<'a>]) {
        for stmt in stmts {
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &'a Stmt<'a>) {
        match stmt {
            Stmt::Let { name, value, .. } => {
                self.walk_expr(value);
                self.bind(name);
            }
            Stmt::Reassign { name, value, .. } => {
                self.walk_expr(value);
                self.note_free(name);
            }
            Stmt::Return { value, .. } => {
                if let Some(e) = value {
                    self.walk_expr(e);
                }
            }
            Stmt::ExprStmt { expr, .. } | Stmt::TailExpr { expr, .. } => self.walk_expr(expr),
            Stmt::Block { body, .. } => {
                self.push_scope();
                self.walk_stmts(body);
                self.pop_scope();
            }
            Stmt::If { cond, then_block, else_block, .. } => {
                self.walk_expr(cond);
                self.push_scope();
                self.walk_stmts(then_block);
                self.pop_scope();
                if let Some(else_block) = else_block {
                    self.push_scope();
                    self.walk_stmts(else_block);
                    self.pop_scope();
                }
            }
            Stmt::ExternalInvocation { .. } => {}
        }
    }

    fn walk_expr(&mut self, expr: &'a Expr<'a>) {
        match expr {
            Expr::Int(..) | Expr::Str(..) | Expr::Bool(..) => {}
            Expr::Var(name, _) => self.note_free(name),
            Expr::Paren(inner, _) | Expr::Not(inner, _) => self.walk_expr(inner),
            Expr::Function(fexpr) => {
                for &name in fexpr.captures {
                    self.note_free(name);
                }
            }
            Expr::Call { callee, args, .. } => {
                self.walk_expr(callee);
                for a in *args {
                    self.walk_expr(a);
                }
            }
            Expr::Index { collection, index, .. } => {
                self.walk_expr(collection);
                self.walk_expr(index);
            }
            Expr::Binary { lhs, rhs, .. } => {
                self.walk_expr(lhs);
                self.walk_expr(rhs);
            }
            Expr::Array(items, _) => {
                for it in *items {
                    self.walk_expr(it);
                }
            }
            Expr::Dict(entries, _) => {
                for (k, v) in *entries {
                    self.walk_expr(k);
                    self.walk_expr(v);
                }
            }
        }
    }
}

/// Computes the capture-name list for a function literal with the given
/// `params` and `body`. `params` forms the outermost bound scope; the body
/// is then walked as the function's top-level block.
pub fn collect_captures<'a>(params: &'a [&'a str], body: &'a [&'a Stmt<'a>]) -> Vec<&'a str> {
    let mut collector =
        Collector { bound: vec![params.iter().copied().collect()], seen: HashSet::new(), order: Vec::new() };
    collector.walk_stmts(body);
    collector.order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::lexer::Lexer;
    use crate::parser::Parser;

    fn captures_of_last_fn(src: &str) -> Vec<String> {
        let arena = Arena::new();
        let tokens = Lexer::new(src, &arena).tokenize().expect("lex");
        let program = Parser::new(tokens, &arena).parse_program().expect("parse");

        fn find<'a>(stmts: &'a [&'a Stmt<'a>]) -> Option<&'a [&'a str]> {
            for stmt in stmts.iter().rev() {
                if let Stmt::Let { value: Expr::Function(f), .. } = stmt {
                    return Some(f.captures);
                }
            }
            None
        }
        find(program).expect("expected a let-bound fn literal").iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn captures_outer_let_binding() {
        let caps = captures_of_last_fn(r#"let who = "World"; let greet = fn(){ "Hello, " + who };"#);
        assert_eq!(caps, vec!["who"]);
    }

    #[test]
    fn params_are_not_captured() {
        let caps = captures_of_last_fn(r#"let add = fn(a, b) { a + b };"#);
        assert!(caps.is_empty());
    }

    #[test]
    fn locally_declared_names_are_not_captured() {
        let caps = captures_of_last_fn(r#"let outer = 1; let f = fn() { let outer = 2; outer };"#);
        assert!(caps.is_empty());
    }

    #[test]
    fn reassignment_target_counts_as_free() {
        let caps = captures_of_last_fn(r#"let counter = 0; let bump = fn() { counter = counter + 1; };"#);
        assert_eq!(caps, vec!["counter"]);
    }

    #[test]
    fn nested_function_captures_bubble_up() {
        let caps = captures_of_last_fn(r#"let who = "World"; let mk = fn() { fn() { "Hello, " + who } };"#);
        assert_eq!(caps, vec!["who"]);
    }

    #[test]
    fn first_use_order_is_preserved_and_deduped() {
        let caps = captures_of_last_fn(r#"let a = 1; let b = 2; let f = fn() { b + a + b };"#);
        assert_eq!(caps, vec!["b", "a"]);
    }

    #[test]
    fn if_branches_do_not_leak_their_bindings() {
        let caps =
            captures_of_last_fn(r#"let flag = true; let f = fn() { if (flag) { let x = 1; x } else { 0 } };"#);
        assert_eq!(caps, vec!["flag"]);
    }
}
