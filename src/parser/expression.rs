//! Lexer and grammar for binding and handler expressions
//!
//! Expressions live inside attribute values. Spans are shifted by the
//! offset of the value so errors point into the original markup.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use logos::Logos;

use crate::error::{from_rich, ParseError};
use crate::host::Value;
use crate::parser::lexer::Span;
use crate::template::{Expression, HandlerExpr};

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum ExprToken {
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("emit")]
    Emit,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token("(")]
    ParenOpen,
    #[token(")")]
    ParenClose,

    // Identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_\-]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    #[regex(r"-?0[xX][0-9a-fA-F]+", parse_hex)]
    Int(i64),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    /// Single-quoted string; escapes are decoded after lexing
    #[regex(r"'([^'\\]|\\.)*'", |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Str(String),
}

fn parse_hex(lex: &mut logos::Lexer<ExprToken>) -> Option<i64> {
    let s = lex.slice();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    let value = i64::from_str_radix(&digits[2..], 16).ok()?;
    Some(if negative { -value } else { value })
}

impl ExprToken {
    pub fn describe(&self) -> String {
        match self {
            ExprToken::True => "'true'".to_string(),
            ExprToken::False => "'false'".to_string(),
            ExprToken::Emit => "keyword 'emit'".to_string(),
            ExprToken::Dot => "'.'".to_string(),
            ExprToken::Comma => "','".to_string(),
            ExprToken::ParenOpen => "'('".to_string(),
            ExprToken::ParenClose => "')'".to_string(),
            ExprToken::Ident(s) => format!("identifier '{}'", s),
            ExprToken::Int(n) => format!("number {}", n),
            ExprToken::Float(n) => format!("number {}", n),
            ExprToken::Str(s) => format!("string '{}'", s),
        }
    }
}

/// Decode `\'`, `\\`, `\n` and `\t` in a string literal starting at `offset`
fn unescape(raw: &str, offset: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.char_indices();
    while let Some((i, c)) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some((_, '\'')) => out.push('\''),
            Some((_, '\\')) => out.push('\\'),
            Some((_, 'n')) => out.push('\n'),
            Some((_, 't')) => out.push('\t'),
            Some((j, other)) => {
                return Err(ParseError::UnknownEscape {
                    span: offset + i..offset + j + other.len_utf8(),
                    sequence: format!("\\{}", other),
                })
            }
            None => {
                return Err(ParseError::UnknownEscape {
                    span: offset + i..offset + i + 1,
                    sequence: "\\".to_string(),
                })
            }
        }
    }
    Ok(out)
}

/// Lex expression text into tokens with absolute spans
fn lex(text: &str, offset: usize) -> Result<Vec<(ExprToken, Span)>, ParseError> {
    ExprToken::lexer(text)
        .spanned()
        .map(|(tok, span)| {
            let span = offset + span.start..offset + span.end;
            match tok {
                // The raw content starts after the opening quote
                Ok(ExprToken::Str(raw)) => {
                    Ok((ExprToken::Str(unescape(&raw, span.start + 1)?), span))
                }
                Ok(tok) => Ok((tok, span)),
                Err(()) => Err(ParseError::InvalidExpression {
                    message: format!(
                        "unrecognized input '{}'",
                        &text[span.start - offset..span.end - offset]
                    ),
                    span,
                }),
            }
        })
        .collect()
}

fn into_expression_error(err: Rich<'_, ExprToken>) -> ParseError {
    match from_rich(err, ExprToken::describe) {
        ParseError::Syntax { span, message, .. } => ParseError::InvalidExpression { span, message },
        other => ParseError::InvalidExpression {
            span: other.span(),
            message: "unexpected end of expression".to_string(),
        },
    }
}

macro_rules! run_parser {
    ($parser:expr, $text:expr, $offset:expr) => {{
        let end = $offset + $text.len();
        let tokens = lex($text, $offset)?;
        let token_stream =
            Stream::from_iter(tokens.into_iter().map(|(tok, span)| (tok, span.into())))
                .map((end..end).into(), |(t, s): (_, _)| (t, s));
        $parser
            .parse(token_stream)
            .into_result()
            .map_err(|errs| match errs.into_iter().next() {
                Some(err) => into_expression_error(err),
                None => ParseError::InvalidExpression {
                    span: $offset..end,
                    message: "invalid expression".to_string(),
                },
            })
    }};
}

/// Parse the inside of a `{...}` binding
pub(crate) fn parse_binding(text: &str, offset: usize) -> Result<Expression, ParseError> {
    run_parser!(expression_parser().then_ignore(end()), text, offset)
}

/// Parse the value of an `on-<signal>` attribute
pub(crate) fn parse_handler(text: &str, offset: usize) -> Result<HandlerExpr, ParseError> {
    run_parser!(handler_parser().then_ignore(end()), text, offset)
}

fn expression_parser<'a, I>(
) -> impl Parser<'a, I, Expression, extra::Err<Rich<'a, ExprToken>>> + Clone
where
    I: ValueInput<'a, Token = ExprToken, Span = SimpleSpan>,
{
    let constant = select! {
        ExprToken::True => Value::Bool(true),
        ExprToken::False => Value::Bool(false),
        ExprToken::Int(n) => Value::Int(n),
        ExprToken::Float(n) => Value::Float(n),
        ExprToken::Str(s) => Value::String(s),
    }
    .map(Expression::Constant);

    let identifier = select! {
        ExprToken::Ident(s) => s,
    };

    let path = identifier
        .separated_by(just(ExprToken::Dot))
        .at_least(1)
        .collect::<Vec<_>>()
        .map(Expression::Path);

    choice((constant, path))
}

fn handler_parser<'a, I>(
) -> impl Parser<'a, I, HandlerExpr, extra::Err<Rich<'a, ExprToken>>> + Clone
where
    I: ValueInput<'a, Token = ExprToken, Span = SimpleSpan>,
{
    let identifier = select! {
        ExprToken::Ident(s) => s,
    };

    // Optional argument list: (a, b.c, 'x')
    let arguments = expression_parser()
        .separated_by(just(ExprToken::Comma))
        .collect::<Vec<_>>()
        .delimited_by(just(ExprToken::ParenOpen), just(ExprToken::ParenClose))
        .or_not()
        .map(|args| args.unwrap_or_default());

    let emit = just(ExprToken::Emit)
        .ignore_then(identifier)
        .then(arguments.clone())
        .map(|(signal, args)| HandlerExpr::Emit { signal, args });

    let method = identifier
        .then(arguments)
        .map(|(name, args)| HandlerExpr::Method { name, args });

    choice((emit, method))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn path(segments: &[&str]) -> Expression {
        Expression::Path(segments.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_constants() {
        assert_eq!(parse_binding("12345", 0), Ok(Expression::Constant(Value::Int(12345))));
        assert_eq!(parse_binding("-12345", 0), Ok(Expression::Constant(Value::Int(-12345))));
        assert_eq!(parse_binding("0xff", 0), Ok(Expression::Constant(Value::Int(255))));
        assert_eq!(parse_binding("-0xff", 0), Ok(Expression::Constant(Value::Int(-255))));
        assert_eq!(parse_binding("2.5", 0), Ok(Expression::Constant(Value::Float(2.5))));
        assert_eq!(parse_binding("true", 0), Ok(Expression::Constant(Value::Bool(true))));
        assert_eq!(parse_binding(" false ", 0), Ok(Expression::Constant(Value::Bool(false))));
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            parse_binding(r"'ab\'c\\\n'", 0),
            Ok(Expression::Constant(Value::String("ab'c\\\n".to_string())))
        );
    }

    #[test]
    fn test_unknown_string_escape() {
        let err = parse_binding(r"'a\qb'", 10).unwrap_err();
        assert_eq!(err.kind(), ParseErrorKind::UnknownEscape);
        assert_eq!(err.span(), 12..14);
    }

    #[test]
    fn test_paths() {
        assert_eq!(parse_binding("elapsed", 0), Ok(path(&["elapsed"])));
        assert_eq!(parse_binding("btn.label", 0), Ok(path(&["btn", "label"])));
        assert_eq!(parse_binding("timer-visible", 0), Ok(path(&["timer-visible"])));
    }

    #[test]
    fn test_invalid_expressions() {
        for text in ["inner.", "'abc", "0xy", "", "a b"] {
            let err = parse_binding(text, 0).unwrap_err();
            assert_eq!(err.kind(), ParseErrorKind::InvalidExpression, "{text:?}: {err:?}");
        }
    }

    #[test]
    fn test_error_offset_is_absolute() {
        let err = parse_binding("a b", 20).unwrap_err();
        assert_eq!(err.position(), 22);
    }

    #[test]
    fn test_method_handlers() {
        assert_eq!(
            parse_handler("on_reset", 0),
            Ok(HandlerExpr::Method {
                name: "on_reset".to_string(),
                args: vec![]
            })
        );
        assert_eq!(
            parse_handler("on_reset(btn, 3)", 0),
            Ok(HandlerExpr::Method {
                name: "on_reset".to_string(),
                args: vec![path(&["btn"]), Expression::Constant(Value::Int(3))]
            })
        );
    }

    #[test]
    fn test_emit_handler() {
        assert_eq!(
            parse_handler("emit reset(btn)", 0),
            Ok(HandlerExpr::Emit {
                signal: "reset".to_string(),
                args: vec![path(&["btn"])]
            })
        );
    }

    #[test]
    fn test_bad_handlers() {
        for text in ["", "on_reset(", "emit", "1(2)", "a.b"] {
            assert!(parse_handler(text, 0).is_err(), "{text:?} should fail");
        }
    }
}
