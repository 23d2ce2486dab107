//! Failure taxonomy for script evaluation.
//!
//! Every fallible library operation returns `Result<_, RadError>`.  The
//! interpreter attaches source spans with [`RadError::at`] as failures
//! bubble out of expressions and statements, and the top level turns the
//! result into a diagnostic with [`RadError::render`].

use std::backtrace::Backtrace;
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

use crate::script::ast::Span;
use crate::script::value::ErrorValue;

/// Stable classification of a failure, carried by script-level error values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    TypeMismatch,
    ArityMismatch,
    KeyNotFound,
    IndexOutOfBounds,
    DivideByZero,
    UnknownIdentifier,
    UnknownFunction,
    TrieTraversal,
    ShellNonZeroExit,
    Fetch,
    Parse,
    User,
    InternalBug,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::TypeMismatch => "type-mismatch",
            ErrorCode::ArityMismatch => "arity-mismatch",
            ErrorCode::KeyNotFound => "key-not-found",
            ErrorCode::IndexOutOfBounds => "index-out-of-bounds",
            ErrorCode::DivideByZero => "divide-by-zero",
            ErrorCode::UnknownIdentifier => "unknown-identifier",
            ErrorCode::UnknownFunction => "unknown-function",
            ErrorCode::TrieTraversal => "trie-traversal",
            ErrorCode::ShellNonZeroExit => "shell-non-zero-exit",
            ErrorCode::Fetch => "fetch",
            ErrorCode::Parse => "parse",
            ErrorCode::User => "user",
            ErrorCode::InternalBug => "internal-bug",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failure raised while evaluating a script.
#[derive(Debug, Error)]
pub enum RadError {
    #[error("{0}")]
    TypeMismatch(String),

    #[error("{0}")]
    ArityMismatch(String),

    #[error("key not found: {key}")]
    KeyNotFound { key: String },

    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("divide by zero")]
    DivideByZero,

    #[error("undefined variable '{name}'{}", did_you_mean(.suggestions))]
    UnknownIdentifier { name: String, suggestions: Vec<String> },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("cannot traverse '{path}': {reason}")]
    TrieTraversal { path: String, reason: String },

    #[error("command failed with exit code {code}: {command}")]
    ShellNonZeroExit { command: String, code: i32 },

    #[error("fetching {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("{0}")]
    Parse(String),

    /// An error value raised by the script itself.
    #[error("{}", .0.message)]
    User(Rc<ErrorValue>),

    #[error("bug: {message}")]
    /// `trace` is the call stack captured where the bug was detected.
    InternalBug { message: String, trace: String },

    /// `exit(code)` unwinding to the top level.  Never rendered.
    #[error("exit {code}")]
    Exit { code: i32 },

    #[error("{source}")]
    At { span: Span, source: Box<RadError> },
}

fn did_you_mean(suggestions: &[String]) -> String {
    match suggestions {
        [] => String::new(),
        [one] => format!(" (did you mean '{one}'?)"),
        many => {
            let quoted: Vec<String> = many.iter().map(|s| format!("'{s}'")).collect();
            format!(" (did you mean one of {}?)", quoted.join(", "))
        }
    }
}

impl RadError {
    pub fn type_mismatch(msg: impl Into<String>) -> Self {
        RadError::TypeMismatch(msg.into())
    }

    pub fn arity(msg: impl Into<String>) -> Self {
        RadError::ArityMismatch(msg.into())
    }

    /// `expected <expected>, got <actual>` type failure.
    pub fn expected(expected: impl fmt::Display, actual: &str) -> Self {
        RadError::TypeMismatch(format!("expected {expected}, got {actual}"))
    }

    pub fn bug(message: impl Into<String>) -> Self {
        RadError::InternalBug {
            message: message.into(),
            trace: Backtrace::force_capture().to_string(),
        }
    }

    /// Attach a source span.  Failures that already carry one keep the
    /// innermost span, and exits are left bare.
    pub fn at(self, span: Option<Span>) -> Self {
        match (self, span) {
            (e @ (RadError::At { .. } | RadError::Exit { .. }), _) => e,
            (e, None) => e,
            (e, Some(span)) => RadError::At { span, source: Box::new(e) },
        }
    }

    /// The failure with any span wrappers removed.
    pub fn innermost(&self) -> &RadError {
        match self {
            RadError::At { source, .. } => source.innermost(),
            other => other,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            RadError::At { span, .. } => Some(*span),
            _ => None,
        }
    }

    /// The exit code if this is an `exit()` unwind.
    pub fn exit_code(&self) -> Option<i32> {
        match self.innermost() {
            RadError::Exit { code } => Some(*code),
            _ => None,
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self.innermost() {
            RadError::TypeMismatch(_) => ErrorCode::TypeMismatch,
            RadError::ArityMismatch(_) => ErrorCode::ArityMismatch,
            RadError::KeyNotFound { .. } => ErrorCode::KeyNotFound,
            RadError::IndexOutOfBounds { .. } => ErrorCode::IndexOutOfBounds,
            RadError::DivideByZero => ErrorCode::DivideByZero,
            RadError::UnknownIdentifier { .. } => ErrorCode::UnknownIdentifier,
            RadError::UnknownFunction { .. } => ErrorCode::UnknownFunction,
            RadError::TrieTraversal { .. } => ErrorCode::TrieTraversal,
            RadError::ShellNonZeroExit { .. } => ErrorCode::ShellNonZeroExit,
            RadError::Fetch { .. } => ErrorCode::Fetch,
            RadError::Parse(_) => ErrorCode::Parse,
            RadError::User(v) => v.code,
            RadError::InternalBug { .. } | RadError::Exit { .. } | RadError::At { .. } => {
                ErrorCode::InternalBug
            }
        }
    }

    /// Convert into a script-level error value.
    pub fn to_error_value(&self) -> Rc<ErrorValue> {
        match self.innermost() {
            RadError::User(v) => v.clone(),
            other => Rc::new(ErrorValue::new(self.code(), other.to_string())),
        }
    }

    /// Format as a diagnostic.  With the script source available, the
    /// message is followed by `line:col` and the offending line with a
    /// caret under the span.
    pub fn render(&self, source: Option<&str>) -> String {
        let mut out = format!("error[{}]: {}", self.code(), self);
        if let RadError::InternalBug { trace, .. } = self.innermost() {
            out.push_str(&format!("\n{trace}"));
        }
        let (Some(span), Some(src)) = (self.span(), source) else {
            return out;
        };
        let (line_no, col, line) = locate(src, span.start);
        let width = span.end.saturating_sub(span.start).max(1);
        let width = width.min(line.chars().count().saturating_sub(col - 1).max(1));
        let gutter = line_no.to_string().len();
        out.push_str(&format!("\n{:>gutter$}--> {line_no}:{col}", ""));
        out.push_str(&format!("\n{:>gutter$} |", ""));
        out.push_str(&format!("\n{line_no} | {line}"));
        out.push_str(&format!(
            "\n{:>gutter$} | {}{}",
            "",
            " ".repeat(col - 1),
            "^".repeat(width)
        ));
        out
    }
}

/// 1-based line and column (in characters) of byte offset `pos`, plus the
/// text of that line.
fn locate(src: &str, pos: usize) -> (usize, usize, &str) {
    let pos = pos.min(src.len());
    let line_start = src[..pos].rfind('\n').map_or(0, |i| i + 1);
    let line_end = src[pos..].find('\n').map_or(src.len(), |i| pos + i);
    let line_no = src[..line_start].matches('\n').count() + 1;
    let col = src[line_start..pos].chars().count() + 1;
    (line_no, col, &src[line_start..line_end])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_keeps_innermost_span() {
        let inner = Span::new(4, 5);
        let outer = Span::new(0, 10);
        let err = RadError::DivideByZero.at(Some(inner)).at(Some(outer));
        assert_eq!(err.span(), Some(inner));
        assert_eq!(err.code(), ErrorCode::DivideByZero);
    }

    #[test]
    fn exit_is_never_wrapped() {
        let err = RadError::Exit { code: 3 }.at(Some(Span::new(0, 1)));
        assert!(matches!(err, RadError::Exit { code: 3 }));
        assert_eq!(err.exit_code(), Some(3));
    }

    #[test]
    fn unknown_identifier_suggestions() {
        let err = RadError::UnknownIdentifier {
            name: "nmae".into(),
            suggestions: vec!["name".into()],
        };
        assert_eq!(err.to_string(), "undefined variable 'nmae' (did you mean 'name'?)");
    }

    #[test]
    fn render_points_at_span() {
        let src = "a = 1\nb = a - \"x\"\n";
        let start = 10;
        let err = RadError::type_mismatch("invalid operand types for '-': int and str")
            .at(Some(Span::new(start, start + 7)));
        let out = err.render(Some(src));
        assert!(out.contains("2:5"), "{out}");
        assert!(out.contains("b = a - \"x\""), "{out}");
        assert!(out.contains("    ^^^^^^^"), "{out}");
    }

    #[test]
    fn render_without_source_is_one_line() {
        let err = RadError::DivideByZero.at(Some(Span::new(0, 1)));
        assert_eq!(err.render(None), "error[divide-by-zero]: divide by zero");
    }

    #[test]
    fn user_error_value_round_trips() {
        let v = Rc::new(ErrorValue::new(ErrorCode::User, "boom".into()));
        let err = RadError::User(v.clone());
        assert!(Rc::ptr_eq(&err.to_error_value(), &v));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn bug_carries_its_trace() {
        let err = RadError::bug("loop signal escaped");
        assert_eq!(err.code(), ErrorCode::InternalBug);
        assert_eq!(err.to_string(), "bug: loop signal escaped");
        let RadError::InternalBug { trace, .. } = &err else {
            panic!("expected an internal bug");
        };
        assert!(err.render(None).ends_with(trace.as_str()));
    }
}
