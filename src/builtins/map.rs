use crate::error::{ErrorSink, EvalResult};
use crate::evaluator::{Evaluator, ReturnAction};
use crate::io::Output;
use crate::span::Span;
use crate::tracer::EvalTracer;
use crate::value::Value;

/// `map(target, func)`: calls `func` once per element of an array (the
/// element) or dict (the key, then the value), in order, for side effects.
/// `func`'s own return value, if any, is discarded.
pub(crate) fn call<'a, S: ErrorSink, O: Output, T: EvalTracer>(
    eval: &mut Evaluator<'a, S, O, T>,
    span: Span,
) -> EvalResult<ReturnAction<'a>> {
    let target = eval.param("target");
    let func = eval.param("func");

    match &target {
        Value::Array(id) => {
            let items: Vec<Value<'a>> = eval.heap().get(*id).as_array().to_vec();
            for item in items {
                let arg = item.deep_copy(eval.heap_mut());
                let result = eval.invoke(func.clone(), smallvec::smallvec![arg], span)?;
                if let ReturnAction::ReturnedValue(v) = result {
                    v.release(eval.heap_mut());
                }
            }
        }
        Value::Dict(id) => {
            let entries: Vec<(Value<'a>, Value<'a>)> = eval.heap().get(*id).as_dict().to_vec();
            for (k, v) in entries {
                let ak = k.deep_copy(eval.heap_mut());
                let av = v.deep_copy(eval.heap_mut());
                let result = eval.invoke(func.clone(), smallvec::smallvec![ak, av], span)?;
                if let ReturnAction::ReturnedValue(v) = result {
                    v.release(eval.heap_mut());
                }
            }
        }
        other => return Err(eval.fail(span, format!("Cannot map over {}", other.type_name()))),
    }
    Ok(ReturnAction::ReturnedVoid)
}
