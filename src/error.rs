//! Error types for parsing and validating template markup

use ariadne::{Color, Label, Report, ReportKind, Source};
use chumsky::error::{Rich, RichPattern, RichReason};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

/// Broad classification of a [`ParseError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    Empty,
    InvalidUtf8,
    InvalidToken,
    Syntax,
    UnbalancedElement,
    DuplicateAttribute,
    DuplicateName,
    UnknownEscape,
    InvalidExpression,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("template is empty")]
    Empty,

    #[error("invalid UTF-8 at byte {offset}")]
    InvalidUtf8 { offset: usize },

    #[error("unrecognized input at byte {}", span.start)]
    InvalidToken { span: Span },

    #[error("Parse error at byte {}: {message}", span.start)]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },

    #[error("closing tag </{close}> at byte {} does not match <{open}>", span.start)]
    MismatchedClose {
        span: Span,
        open: String,
        close: String,
    },

    #[error("unclosed element: input ended at byte {}", span.start)]
    Unclosed { span: Span },

    #[error("duplicate attribute '{name}' at byte {}", span.start)]
    DuplicateAttribute { span: Span, name: String, first: Span },

    #[error("duplicate node name '{name}' at byte {}", span.start)]
    DuplicateName { span: Span, name: String, first: Span },

    #[error("unknown escape sequence '{sequence}' at byte {}", span.start)]
    UnknownEscape { span: Span, sequence: String },

    #[error("invalid expression at byte {}: {message}", span.start)]
    InvalidExpression { span: Span, message: String },
}

impl ParseError {
    pub fn kind(&self) -> ParseErrorKind {
        match self {
            ParseError::Empty => ParseErrorKind::Empty,
            ParseError::InvalidUtf8 { .. } => ParseErrorKind::InvalidUtf8,
            ParseError::InvalidToken { .. } => ParseErrorKind::InvalidToken,
            ParseError::Syntax { .. } => ParseErrorKind::Syntax,
            ParseError::MismatchedClose { .. } | ParseError::Unclosed { .. } => {
                ParseErrorKind::UnbalancedElement
            }
            ParseError::DuplicateAttribute { .. } => ParseErrorKind::DuplicateAttribute,
            ParseError::DuplicateName { .. } => ParseErrorKind::DuplicateName,
            ParseError::UnknownEscape { .. } => ParseErrorKind::UnknownEscape,
            ParseError::InvalidExpression { .. } => ParseErrorKind::InvalidExpression,
        }
    }

    /// Byte range the error points at
    pub fn span(&self) -> Span {
        match self {
            ParseError::Empty => 0..0,
            ParseError::InvalidUtf8 { offset } => *offset..*offset,
            ParseError::InvalidToken { span }
            | ParseError::Syntax { span, .. }
            | ParseError::MismatchedClose { span, .. }
            | ParseError::Unclosed { span }
            | ParseError::DuplicateAttribute { span, .. }
            | ParseError::DuplicateName { span, .. }
            | ParseError::UnknownEscape { span, .. }
            | ParseError::InvalidExpression { span, .. } => span.clone(),
        }
    }

    /// Byte offset of the offending input
    pub fn position(&self) -> usize {
        self.span().start
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let span = self.span();
        let mut report = Report::build(ReportKind::Error, filename, span.start)
            .with_message(self.to_string())
            .with_label(
                Label::new((filename, span))
                    .with_message(self.label())
                    .with_color(Color::Red),
            );

        match self {
            ParseError::DuplicateAttribute { first, .. }
            | ParseError::DuplicateName { first, .. } => {
                report = report.with_label(
                    Label::new((filename, first.clone()))
                        .with_message("first defined here")
                        .with_color(Color::Yellow),
                );
            }
            ParseError::Syntax { expected, .. } if !expected.is_empty() => {
                report = report.with_note(format!("Expected: {}", expected.join(", ")));
            }
            _ => {}
        }

        let mut buf = Vec::new();
        if report
            .finish()
            .write((filename, Source::from(source)), &mut buf)
            .is_err()
        {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn label(&self) -> String {
        match self {
            ParseError::Syntax { message, .. } => message.clone(),
            ParseError::MismatchedClose { open, .. } => format!("expected </{}>", open),
            ParseError::Unclosed { .. } => "element is never closed".to_string(),
            ParseError::DuplicateAttribute { name, .. } => format!("'{}' defined again", name),
            ParseError::DuplicateName { name, .. } => format!("'{}' defined again", name),
            ParseError::UnknownEscape { sequence, .. } => {
                format!("'{}' is not an escape", sequence)
            }
            ParseError::InvalidExpression { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }
}

/// Convert a chumsky error into a [`ParseError`], using `describe` for tokens
pub(crate) fn from_rich<T: Clone>(err: Rich<'_, T>, describe: fn(&T) -> String) -> ParseError {
    let span = err.span().into_range();

    if err.found().is_none() {
        if let RichReason::ExpectedFound { .. } = err.reason() {
            return ParseError::Unclosed { span };
        }
    }

    let message = match err.reason() {
        RichReason::ExpectedFound { found, .. } => match found {
            Some(tok) => format!("Unexpected {}", describe(tok)),
            None => "Unexpected end of input".to_string(),
        },
        RichReason::Custom(msg) => msg.to_string(),
    };

    let expected: Vec<String> = err
        .expected()
        .filter_map(|e| match e {
            RichPattern::Token(tok) => Some(describe(tok)),
            RichPattern::Label(label) => Some(label.to_string()),
            RichPattern::EndOfInput => Some("end of input".to_string()),
            RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
            RichPattern::Any => Some("any token".to_string()),
            RichPattern::SomethingElse => None,
        })
        .collect();

    ParseError::Syntax {
        span,
        message,
        expected,
    }
}
