//! Lexer for template markup using logos

use logos::Logos;

pub use crate::error::Span;
use crate::error::ParseError;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Tag delimiters (order matters - longer patterns first)
    #[token("</")]
    CloseOpen,
    #[token("/>")]
    SelfClose,
    #[token("<")]
    Open,
    #[token(">")]
    TagEnd,
    #[token("=")]
    Equals,

    /// Element or attribute name. Dots, dashes and colons are allowed so
    /// directive keys like `_pack.expand` and signals like `on-clicked` lex
    /// as one name.
    #[regex(r"[A-Za-z_][A-Za-z0-9_.:\-]*", |lex| lex.slice().to_string())]
    Name(String),

    /// Quoted attribute value, quotes stripped, escapes left untouched
    #[regex(r#""[^"]*""#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    #[regex(r#"'[^']*'"#, |lex| {
        let s = lex.slice();
        s[1..s.len()-1].to_string()
    })]
    Value(String),

    // Comments and prolog (skip)
    #[regex(r"<!--([^-]|-[^-]|--[^>])*-->", logos::skip)]
    Comment,

    #[regex(r"<\?([^?]|\?[^>])*\?>", logos::skip)]
    Declaration,
}

impl Token {
    /// Human-readable description for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::CloseOpen => "'</'".to_string(),
            Token::SelfClose => "'/>'".to_string(),
            Token::Open => "'<'".to_string(),
            Token::TagEnd => "'>'".to_string(),
            Token::Equals => "'='".to_string(),
            Token::Name(s) => format!("name '{}'", s),
            Token::Value(s) => format!("value \"{}\"", s),
            Token::Comment | Token::Declaration => format!("{:?}", self),
        }
    }
}

/// Lex input string into tokens with spans
///
/// Text content between elements is not part of the markup language, so any
/// input logos cannot match is reported at its byte offset.
pub fn lex(input: &str) -> Result<Vec<(Token, Span)>, ParseError> {
    Token::lexer(input)
        .spanned()
        .map(|(tok, span)| match tok {
            Ok(tok) => Ok((tok, span)),
            Err(()) => Err(ParseError::InvalidToken { span }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(input: &str) -> Vec<Token> {
        lex(input)
            .expect("Should lex")
            .into_iter()
            .map(|(t, _)| t)
            .collect()
    }

    #[test]
    fn test_self_closing_element() {
        assert_eq!(
            tokens(r#"<Button label="Reset"/>"#),
            vec![
                Token::Open,
                Token::Name("Button".to_string()),
                Token::Name("label".to_string()),
                Token::Equals,
                Token::Value("Reset".to_string()),
                Token::SelfClose,
            ]
        );
    }

    #[test]
    fn test_closing_tag() {
        assert_eq!(
            tokens("<Box></Box>"),
            vec![
                Token::Open,
                Token::Name("Box".to_string()),
                Token::TagEnd,
                Token::CloseOpen,
                Token::Name("Box".to_string()),
                Token::TagEnd,
            ]
        );
    }

    #[test]
    fn test_directive_and_signal_names() {
        assert_eq!(
            tokens("_pack.expand on-clicked"),
            vec![
                Token::Name("_pack.expand".to_string()),
                Token::Name("on-clicked".to_string()),
            ]
        );
    }

    #[test]
    fn test_single_quoted_value() {
        assert_eq!(
            tokens(r#"'say "hi"'"#),
            vec![Token::Value(r#"say "hi""#.to_string())]
        );
    }

    #[test]
    fn test_comments_and_declaration_skipped() {
        assert_eq!(
            tokens("<?xml version=\"1.0\"?>\n<!-- a - comment -->\n<Box/>"),
            vec![Token::Open, Token::Name("Box".to_string()), Token::SelfClose]
        );
    }

    #[test]
    fn test_text_content_is_rejected() {
        let err = lex("<Label>hello & bye</Label>").unwrap_err();
        assert!(matches!(err, ParseError::InvalidToken { .. }));
        assert_eq!(err.position(), 13);
    }
}
