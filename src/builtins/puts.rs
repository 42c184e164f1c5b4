use crate::error::{ErrorSink, EvalResult};
use crate::evaluator::{Evaluator, ReturnAction};
use crate::io::Output;
use crate::span::Span;
use crate::tracer::EvalTracer;

/// `puts(value)`: writes the value's top-level rendering followed by a
/// newline, returning nothing.
pub(crate) fn call<'a, S: ErrorSink, O: Output, T: EvalTracer>(
    eval: &mut Evaluator<'a, S, O, T>,
    _span: Span,
) -> EvalResult<ReturnAction<'a>> {
    let value = eval.param("value");
    let line = value.render_top(eval.heap());
    eval.output_mut().write_line(&line);
    Ok(ReturnAction::ReturnedVoid)
}
