use crate::error::{ErrorSink, EvalResult};
use crate::evaluator::{Evaluator, ReturnAction};
use crate::io::Output;
use crate::span::Span;
use crate::tracer::EvalTracer;
use crate::value::Value;

/// `assert(condition)`: fails the program when `condition` is `false`.
pub(crate) fn call<'a, S: ErrorSink, O: Output, T: EvalTracer>(
    eval: &mut Evaluator<'a, S, O, T>,
    span: Span,
) -> EvalResult<ReturnAction<'a>> {
    match eval.param("condition") {
        Value::Bool(true) => Ok(ReturnAction::ReturnedVoid),
        Value::Bool(false) => Err(eval.fail(span, "Assertion failed".to_owned())),
        other => Err(eval.fail(span, format!("Expected a boolean condition, got {}", other.type_name()))),
    }
}
