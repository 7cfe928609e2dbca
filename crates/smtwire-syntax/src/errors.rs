#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use crate::ast::Span;

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("Syntax error: {message}")]
    #[diagnostic(code(smtwire::parse::syntax))]
    Syntax {
        message: String,
        #[label("here")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },

    #[error("Malformed {command}: {message}")]
    #[diagnostic(
        code(smtwire::parse::malformed),
        help("see the SMT-LIB 2 reference for the expected form of this command")
    )]
    Malformed {
        command: String,
        message: String,
        #[label("malformed")]
        span: miette::SourceSpan,
        #[source_code]
        src: miette::NamedSource<String>,
    },
}

impl ParseError {
    pub fn syntax(message: impl Into<String>, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Syntax {
            message: message.into(),
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }

    pub fn malformed(shape: ShapeError, span: Span, source: &str, filename: &str) -> Self {
        ParseError::Malformed {
            command: shape.command,
            message: shape.message,
            span: (span.start, span.end.saturating_sub(span.start)).into(),
            src: miette::NamedSource::new(filename, source.to_owned()),
        }
    }
}

/// An S-expression that is well formed but is not a valid command or term.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed {command}: {message}")]
pub struct ShapeError {
    pub command: String,
    pub message: String,
}

impl ShapeError {
    pub fn new(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            message: message.into(),
        }
    }
}

/// Failure to render a node in concrete syntax.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PrintError {
    #[error("application of `{0}` has an empty argument list")]
    EmptyApplication(String),
}
