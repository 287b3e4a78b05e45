//! Compile errors with position and a highlighted source excerpt.

use std::fmt;

use thiserror::Error;

use crate::lexer::Position;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

const EXCERPT_RADIUS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The token stream does not match the grammar
    Syntax,
    /// Well-formed input that resolves to nothing
    Semantic,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::Syntax => write!(f, "Syntax"),
            ErrorKind::Semantic => write!(f, "Semantic"),
        }
    }
}

/// Error produced while compiling a filter.
///
/// Compilation stops at the first error; there is no partial result.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct FilterError(Box<ErrorDetail>);

/// Boxed so that parser results stay one pointer wide on the error side.
#[derive(Debug, Error)]
#[error("{message}")]
struct ErrorDetail {
    kind: ErrorKind,
    reason: String,
    message: String,
    line: u32,
    column: u32,
    #[source]
    cause: Option<BoxError>,
}

impl FilterError {
    pub fn new(
        kind: ErrorKind,
        source: &[char],
        position: Position,
        reason: impl Into<String>,
        cause: Option<BoxError>,
    ) -> Self {
        let reason = reason.into();
        let message = format!(
            "{} error at line {}, column {}: {} Source: {}",
            kind,
            position.line,
            position.column,
            reason,
            excerpt(source, position.offset)
        );
        FilterError(Box::new(ErrorDetail {
            kind,
            reason,
            message,
            line: position.line,
            column: position.column,
            cause,
        }))
    }

    pub fn kind(&self) -> ErrorKind {
        self.0.kind
    }

    /// The failure without position or excerpt, e.g. `Expected: Expr.`
    pub fn reason(&self) -> &str {
        &self.0.reason
    }

    pub fn message(&self) -> &str {
        &self.0.message
    }

    pub fn line(&self) -> u32 {
        self.0.line
    }

    pub fn column(&self) -> u32 {
        self.0.column
    }
}

/// Render the source around `offset` as `...prefix>>>>X<<<<suffix...`.
pub fn excerpt(source: &[char], offset: usize) -> String {
    let start = offset.saturating_sub(EXCERPT_RADIUS);
    let mut out = String::new();
    if start > 0 {
        out.push_str("...");
    }
    out.extend(&source[start..offset.min(source.len())]);

    match source.get(offset) {
        Some(ch) => {
            out.push_str(">>>>");
            out.push(*ch);
            out.push_str("<<<<");
            let end = (offset + 1 + EXCERPT_RADIUS).min(source.len());
            out.extend(&source[offset + 1..end]);
            if end < source.len() {
                out.push_str("...");
            }
        }
        None => out.push_str(">>>>[EOF]<<<<"),
    }
    out
}

/// Failures of the semantic actions, positioned by the parser.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("Unknown function: {name} ({arg_types})")]
    UnknownFunction { name: String, arg_types: String },

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    #[error("Type not found: {0}")]
    TypeNotFound(String),

    #[error("Invalid point: {0}")]
    InvalidPoint(String),

    #[error("Operator '{op}' cannot be applied to {operands}")]
    InvalidOperands { op: String, operands: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_excerpt_marks_character() {
        assert_eq!(excerpt(&chars("Name eq 'x'"), 5), "Name >>>>e<<<<q 'x'");
    }

    #[test]
    fn test_excerpt_past_end() {
        assert_eq!(excerpt(&chars("Name eq"), 7), "Name eq>>>>[EOF]<<<<");
    }

    #[test]
    fn test_excerpt_truncates_long_source() {
        let source = chars(&"a".repeat(100));
        let text = excerpt(&source, 50);
        assert!(text.starts_with("..."));
        assert!(text.ends_with("..."));
        assert!(text.contains(">>>>a<<<<"));
        assert_eq!(text.len(), 3 + 30 + 9 + 30 + 3);
    }

    #[test]
    fn test_error_message() {
        let position = Position {
            line: 1,
            column: 8,
            offset: 7,
        };
        let err = FilterError::new(ErrorKind::Syntax, &chars("Name eq"), position, "Expected: Expr.", None);
        assert_eq!(err.reason(), "Expected: Expr.");
        assert_eq!(
            err.to_string(),
            "Syntax error at line 1, column 8: Expected: Expr. Source: Name eq>>>>[EOF]<<<<"
        );
        assert!(std::error::Error::source(&err).is_none());
    }
}
