//! Ties the lexer, parser and evaluator together for one-shot execution and
//! host embedding.
//!
//! A [`Runner`] owns the arena for a single program's lifetime: lexing,
//! parsing and evaluation all happen inside [`Runner::run`], since the
//! parsed AST — and every `Value` the evaluator produces while walking it —
//! borrows the arena and cannot outlive this call. What comes back out
//! (the sink and the output channel, via [`Evaluator::into_parts`]) carries
//! no such borrow, which is exactly what a caller needs to inspect results
//! once the arena is gone.

use crate::arena::Arena;
use crate::error::ErrorSink;
use crate::evaluator::Evaluator;
use crate::io::Output;
use crate::lexer::Lexer;
use crate::limits::Limits;
use crate::parser::Parser;
use crate::tracer::EvalTracer;

/// Whether a run completed without any reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

/// A one-shot interpreter session: lex, parse, and evaluate a single
/// program against a chosen error sink, output channel and tracer.
///
/// # Example
///
/// ```
/// use willow::{CollectOutput, CollectingSink, Limits, NoopTracer, Runner};
///
/// let (sink, output, outcome) = Runner::new("test.wil", Limits::default_bounded())
///     .run(r#"puts("hello");"#, CollectingSink::new(), CollectOutput::new(), NoopTracer);
/// assert!(outcome.is_success());
/// assert_eq!(output.lines, vec!["hello".to_owned()]);
/// assert!(sink.diagnostics.is_empty());
/// ```
pub struct Runner {
    origin: &'static str,
    limits: Limits,
}

impl Runner {
    pub fn new(origin: &'static str, limits: Limits) -> Self {
        Self { origin, limits }
    }

    /// Runs `source` to completion. Lexer and parser failures are reported
    /// through `sink` at a point location (no call stack yet exists), the
    /// same as any evaluator-reported failure; the three are
    /// indistinguishable to the caller by design.
    pub fn run<S: ErrorSink, O: Output, T: EvalTracer>(
        &self,
        source: &str,
        mut sink: S,
        output: O,
        tracer: T,
    ) -> (S, O, Outcome) {
        sink.set_origin(self.origin);
        let arena = Arena::new();

        let tokens = match Lexer::new(source, &arena).tokenize() {
            Ok(tokens) => tokens,
            Err(err) => {
                sink.fail_point(err.loc, err.message(), &[]);
                return (sink, output, Outcome::Failure);
            }
        };

        let program = match Parser::new(tokens, &arena).parse_program() {
            Ok(program) => program,
            Err(err) => {
                sink.fail_point(err.span.start, err.message, &[]);
                return (sink, output, Outcome::Failure);
            }
        };

        let mut evaluator = Evaluator::new(sink, output, tracer, self.limits);
        let result = evaluator.run(program);
        let outcome = if result.is_ok() { Outcome::Success } else { Outcome::Failure };
        let (sink, output) = evaluator.into_parts();
        (sink, output, outcome)
    }
}
