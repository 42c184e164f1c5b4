//! Diagnostics: the error sink and its two provided implementations.
//!
//! The sink is an abstract interface, not a `Result` payload: evaluator
//! methods report a failure to the sink (which knows how to format and
//! render it, call-stack and all) and then return a bare [`EvalError`]
//! marker so every caller up the chain still performs its deferred
//! `scope_out()` before propagating. This splits an internal propagation
//! signal (`EvalError`) from a separately-formatted presentation value
//! (`Diagnostic`), behind a sink trait the host can swap out the same way
//! [`crate::io::Output`] and [`crate::tracer::EvalTracer`] are swappable.

use std::fmt;

use crate::span::{CodeLoc, Span};

/// Marker error: the *content* of the failure already went to the
/// [`ErrorSink`]. Propagating this (rather than a message-carrying error
/// type) keeps every evaluator function's `?`-based unwind uniform while
/// letting the sink own presentation concerns (color, stack rendering).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalError;

pub type EvalResult<T> = Result<T, EvalError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARNING"),
        }
    }
}

/// Where a diagnostic points, if anywhere — matches the three `fail`
/// severities (ranged, point, context-free).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Ranged(Span),
    Point(CodeLoc),
    None,
}

/// One rendered frame of the call stack, innermost-first, as shown in a
/// failure report.
#[derive(Debug, Clone)]
pub struct StackFrameInfo {
    pub name: String,
    pub call_site: Option<Span>,
}

/// A single reported failure or warning, fully formed and ready to render.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Location,
    /// Empty for warnings.
    pub stack: Vec<StackFrameInfo>,
    pub origin: &'static str,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)?;
        match self.location {
            Location::Ranged(span) => write!(f, " at {} in {}", span.start, self.origin)?,
            Location::Point(loc) => write!(f, " at {loc} in {}", self.origin)?,
            Location::None => write!(f, " in {}", self.origin)?,
        }
        for frame in self.stack.iter().rev() {
            write!(f, "\n  > in {}", frame.name)?;
        }
        Ok(())
    }
}

/// Abstract sink for evaluator failures/warnings.
///
/// Installed once at evaluator construction. Every `fail_*` call is expected
/// to have the evaluator unwind immediately afterward; `warn_*` does not
/// affect control flow.
pub trait ErrorSink {
    fn fail_ranged(&mut self, span: Span, message: String, stack: &[StackFrameInfo]);
    fn fail_point(&mut self, loc: CodeLoc, message: String, stack: &[StackFrameInfo]);
    fn fail(&mut self, message: String, stack: &[StackFrameInfo]);

    fn warn_ranged(&mut self, span: Span, message: String);
    fn warn_point(&mut self, loc: CodeLoc, message: String);
    fn warn(&mut self, message: String);

    /// Sets the name every subsequent diagnostic is reported against.
    /// [`crate::runner::Runner`] calls this once up front so a sink
    /// constructed with [`Default`] still reports under the right name.
    fn set_origin(&mut self, origin: &'static str);
}

/// Production default: renders diagnostics to stderr, deterministically and
/// without color (the CLI's sink).
#[derive(Default)]
pub struct ConsoleSink {
    origin: &'static str,
    pub had_error: bool,
}

impl ConsoleSink {
    pub fn new(origin: &'static str) -> Self {
        Self { origin, had_error: false }
    }

    fn emit(&self, diag: &Diagnostic) {
        eprintln!("{diag}");
    }
}

impl ErrorSink for ConsoleSink {
    fn fail_ranged(&mut self, span: Span, message: String, stack: &[StackFrameInfo]) {
        self.had_error = true;
        self.emit(&Diagnostic {
            severity: Severity::Error,
            message,
            location: Location::Ranged(span),
            stack: stack.to_vec(),
            origin: self.origin,
        });
    }

    fn fail_point(&mut self, loc: CodeLoc, message: String, stack: &[StackFrameInfo]) {
        self.had_error = true;
        self.emit(&Diagnostic {
            severity: Severity::Error,
            message,
            location: Location::Point(loc),
            stack: stack.to_vec(),
            origin: self.origin,
        });
    }

    fn fail(&mut self, message: String, stack: &[StackFrameInfo]) {
        self.had_error = true;
        self.emit(&Diagnostic {
            severity: Severity::Error,
            message,
            location: Location::None,
            stack: stack.to_vec(),
            origin: self.origin,
        });
    }

    fn warn_ranged(&mut self, span: Span, message: String) {
        self.emit(&Diagnostic {
            severity: Severity::Warning,
            message,
            location: Location::Ranged(span),
            stack: Vec::new(),
            origin: self.origin,
        });
    }

    fn warn_point(&mut self, loc: CodeLoc, message: String) {
        self.emit(&Diagnostic {
            severity: Severity::Warning,
            message,
            location: Location::Point(loc),
            stack: Vec::new(),
            origin: self.origin,
        });
    }

    fn warn(&mut self, message: String) {
        self.emit(&Diagnostic {
            severity: Severity::Warning,
            message,
            location: Location::None,
            stack: Vec::new(),
            origin: self.origin,
        });
    }

    fn set_origin(&mut self, origin: &'static str) {
        self.origin = origin;
    }
}

/// Test/embedding sink: buffers every diagnostic instead of printing it, so
/// callers can assert on exact messages.
#[derive(Default)]
pub struct CollectingSink {
    pub diagnostics: Vec<Diagnostic>,
    origin: &'static str,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self { diagnostics: Vec::new(), origin: "<program>" }
    }

    /// The message of the first reported failure, if any — the common case
    /// tests want to assert against.
    pub fn first_error_message(&self) -> Option<&str> {
        self.diagnostics.iter().find(|d| d.severity == Severity::Error).map(|d| d.message.as_str())
    }
}

impl ErrorSink for CollectingSink {
    fn fail_ranged(&mut self, span: Span, message: String, stack: &[StackFrameInfo]) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            location: Location::Ranged(span),
            stack: stack.to_vec(),
            origin: self.origin,
        });
    }

    fn fail_point(&mut self, loc: CodeLoc, message: String, stack: &[StackFrameInfo]) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            location: Location::Point(loc),
            stack: stack.to_vec(),
            origin: self.origin,
        });
    }

    fn fail(&mut self, message: String, stack: &[StackFrameInfo]) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Error,
            message,
            location: Location::None,
            stack: stack.to_vec(),
            origin: self.origin,
        });
    }

    fn warn_ranged(&mut self, span: Span, message: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            location: Location::Ranged(span),
            stack: Vec::new(),
            origin: self.origin,
        });
    }

    fn warn_point(&mut self, loc: CodeLoc, message: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            location: Location::Point(loc),
            stack: Vec::new(),
            origin: self.origin,
        });
    }

    fn warn(&mut self, message: String) {
        self.diagnostics.push(Diagnostic {
            severity: Severity::Warning,
            message,
            location: Location::None,
            stack: Vec::new(),
            origin: self.origin,
        });
    }

    fn set_origin(&mut self, origin: &'static str) {
        self.origin = origin;
    }
}

/// Lexer failure kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    UnexpectedChar(char),
    UnterminatedString,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub loc: CodeLoc,
}

impl LexError {
    /// The bare failure message, with no severity prefix or location
    /// suffix — what [`ErrorSink::fail_point`] wants, since the sink adds
    /// its own location and severity formatting.
    pub fn message(&self) -> String {
        match &self.kind {
            LexErrorKind::UnexpectedChar(c) => format!("Unexpected character '{c}'"),
            LexErrorKind::UnterminatedString => "Unterminated string literal".to_owned(),
        }
    }
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR: {} at {}", self.message(), self.loc)
    }
}

impl std::error::Error for LexError {}

/// Parser failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ERROR: {} at {}", self.message, self.span.start)
    }
}

impl std::error::Error for ParseError {}
