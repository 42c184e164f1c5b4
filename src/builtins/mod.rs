//! The builtin registry: host-implemented functions exposed to
//! the program as ordinary first-class function values.
//!
//! One file per builtin, dispatched through an enum of builtin ids — this
//! language only needs a four-builtin contract. Each builtin is wired into
//! the program as a `Function` value
//! whose body is a single synthetic [`crate::ast::Stmt::ExternalInvocation`]
//! referring back to this registry by id, so a builtin is indistinguishable
//! from an ordinary function value anywhere it's bound, passed, or rendered.

mod assert_builtin;
mod len;
mod map;
mod puts;

use std::sync::OnceLock;

use strum::Display;

use crate::ast::{FunctionExpr, Stmt};
use crate::error::{ErrorSink, EvalResult};
use crate::evaluator::{Evaluator, ReturnAction};
use crate::function::FunctionHandle;
use crate::io::Output;
use crate::scope::ScopeStack;
use crate::span::Span;
use crate::tracer::EvalTracer;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum BuiltinId {
    Puts,
    Map,
    Assert,
    Len,
}

impl BuiltinId {
    const ALL: [BuiltinId; 4] = [Self::Puts, Self::Map, Self::Assert, Self::Len];

    fn params(self) -> &'static [&'static str] {
        match self {
            Self::Puts => &["value"],
            Self::Map => &["target", "func"],
            Self::Assert => &["condition"],
            Self::Len => &["value"],
        }
    }

    /// A stable AST-identity id for this builtin's synthetic function
    /// literal, carved out of a range no parsed program can ever produce
    /// (the parser's own ids start at zero and count up).
    fn ast_id(self) -> u32 {
        0xFFFF_0000 + self as u32
    }
}

/// Builds (once per process, cached) the synthetic `FunctionExpr` each
/// builtin is exposed through. These never appear in any parsed source —
/// they exist purely so a builtin can be stored, passed around, and
/// rendered exactly like any other `Value::Function`.
fn synthetic_defs() -> &'static [(BuiltinId, &'static FunctionExpr<'static>)] {
    static DEFS: OnceLock<Vec<(BuiltinId, &'static FunctionExpr<'static>)>> = OnceLock::new();
    DEFS.get_or_init(|| {
        BuiltinId::ALL
            .iter()
            .map(|&id| {
                let body: &'static [&'static Stmt<'static>] =
                    Box::leak(vec![&*Box::leak(Box::new(Stmt::ExternalInvocation { id, span: Span::synthetic() }))].into_boxed_slice());
                let def = Box::leak(Box::new(FunctionExpr {
                    id: id.ast_id(),
                    params: id.params(),
                    body,
                    captures: &[],
                    span: Span::synthetic(),
                }));
                (id, &*def)
            })
            .collect()
    })
}

/// Declares every builtin in the current (bottom-of-stack) scope, as
/// pre-locked function values with no captures — they are defined at the
/// true global level, so there is nothing for them to capture.
pub(crate) fn install<'a>(scopes: &mut ScopeStack<'a>) {
    for &(id, def) in synthetic_defs() {
        let handle = FunctionHandle::new(def);
        handle.name_if_unset(&id.to_string());
        handle.lock_with_captures(Vec::new());
        scopes.declare(&id.to_string(), crate::value::Value::Function(handle)).expect("builtin names are unique and the bottom scope is fresh");
    }
}

pub(crate) fn dispatch<'a, S: ErrorSink, O: Output, T: EvalTracer>(
    eval: &mut Evaluator<'a, S, O, T>,
    id: BuiltinId,
    span: Span,
) -> EvalResult<ReturnAction<'a>> {
    match id {
        BuiltinId::Puts => puts::call(eval, span),
        BuiltinId::Map => map::call(eval, span),
        BuiltinId::Assert => assert_builtin::call(eval, span),
        BuiltinId::Len => len::call(eval, span),
    }
}
