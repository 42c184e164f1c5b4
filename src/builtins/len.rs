use crate::error::{ErrorSink, EvalResult};
use crate::evaluator::{Evaluator, ReturnAction};
use crate::io::Output;
use crate::span::Span;
use crate::tracer::EvalTracer;
use crate::value::Value;

/// `len(value)`: element count for a string (by Unicode scalar, not byte),
/// array, or dict.
pub(crate) fn call<'a, S: ErrorSink, O: Output, T: EvalTracer>(
    eval: &mut Evaluator<'a, S, O, T>,
    span: Span,
) -> EvalResult<ReturnAction<'a>> {
    let value = eval.param("value");
    let n = match &value {
        Value::Str(id) => eval.heap().get(*id).as_str().chars().count() as i64,
        Value::Array(id) => eval.heap().get(*id).as_array().len() as i64,
        Value::Dict(id) => eval.heap().get(*id).as_dict().len() as i64,
        other => return Err(eval.fail(span, format!("Cannot take the length of {}", other.type_name()))),
    };
    Ok(ReturnAction::ReturnedValue(Value::Int(n)))
}
