//! Element grammar implementation using chumsky
//!
//! The grammar only recognises structure. Tag balance, attribute uniqueness
//! and attribute values are checked afterwards by the builder so each failure
//! gets its own error kind.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{from_rich, ParseError};
use crate::parser::lexer::{Span, Token};
use crate::template::Spanned;

/// An element as written, before validation
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawElement {
    pub tag: Spanned<String>,
    pub attributes: Vec<RawAttribute>,
    pub children: Vec<RawElement>,
    /// Closing tag name, `None` for `<Tag/>`
    pub close: Option<Spanned<String>>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct RawAttribute {
    pub name: Spanned<String>,
    /// Value without quotes; the span covers only the content
    pub value: Spanned<String>,
}

/// Parse a token list into the raw root element
pub(crate) fn parse_tokens(
    tokens: Vec<(Token, Span)>,
    len: usize,
) -> Result<RawElement, ParseError> {
    let token_iter = tokens.into_iter().map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    document_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| {
            errs.into_iter()
                .next()
                .map(|e| from_rich(e, Token::describe))
                .unwrap_or(ParseError::Empty)
        })
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

fn document_parser<'a, I>() -> impl Parser<'a, I, RawElement, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    let name = select! {
        Token::Name(s) => s,
    }
    .labelled("name")
    .map_with(|s, e| Spanned::new(s, span_range(&e.span())));

    let value = select! {
        Token::Value(s) => s,
    }
    .labelled("quoted value")
    .map_with(|s, e| {
        // Strip the quotes from the span as well
        let span = span_range(&e.span());
        Spanned::new(s, span.start + 1..span.end.saturating_sub(1).max(span.start + 1))
    });

    let attribute = name
        .clone()
        .then_ignore(just(Token::Equals))
        .then(value)
        .map(|(name, value)| RawAttribute { name, value });

    let start_tag = just(Token::Open)
        .ignore_then(name.clone())
        .then(attribute.repeated().collect::<Vec<_>>());

    let element = recursive(|element| {
        let empty_element = start_tag
            .clone()
            .then_ignore(just(Token::SelfClose))
            .map_with(|(tag, attributes), e| RawElement {
                tag,
                attributes,
                children: Vec::new(),
                close: None,
                span: span_range(&e.span()),
            });

        let container_element = start_tag
            .clone()
            .then_ignore(just(Token::TagEnd))
            .then(element.repeated().collect::<Vec<_>>())
            .then(
                just(Token::CloseOpen)
                    .ignore_then(name.clone())
                    .then_ignore(just(Token::TagEnd)),
            )
            .map_with(|(((tag, attributes), children), close), e| RawElement {
                tag,
                attributes,
                children,
                close: Some(close),
                span: span_range(&e.span()),
            });

        choice((empty_element, container_element)).boxed()
    });

    element.then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::lexer::lex;

    fn raw(input: &str) -> Result<RawElement, ParseError> {
        parse_tokens(lex(input)?, input.len())
    }

    #[test]
    fn test_parse_empty_element() {
        let root = raw("<Window/>").expect("Should parse");
        assert_eq!(root.tag.node, "Window");
        assert_eq!(root.tag.span, 1..7);
        assert!(root.children.is_empty());
        assert!(root.close.is_none());
    }

    #[test]
    fn test_parse_attribute_value_span() {
        let root = raw(r#"<Label label="abc"/>"#).expect("Should parse");
        assert_eq!(root.attributes.len(), 1);
        assert_eq!(root.attributes[0].name.node, "label");
        assert_eq!(root.attributes[0].value.node, "abc");
        assert_eq!(root.attributes[0].value.span, 14..17);
    }

    #[test]
    fn test_parse_nested_children() {
        let root = raw("<Box><Label/><Box><Button/></Box></Box>").expect("Should parse");
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].children[0].tag.node, "Button");
        assert_eq!(root.close.as_ref().map(|c| c.node.as_str()), Some("Box"));
    }

    #[test]
    fn test_mismatched_close_is_left_to_builder() {
        let root = raw("<Box></Grid>").expect("Grammar accepts any closing name");
        assert_eq!(root.close.map(|c| c.node), Some("Grid".to_string()));
    }

    #[test]
    fn test_unclosed_element() {
        let err = raw("<Box><Label/>").unwrap_err();
        assert!(matches!(err, ParseError::Unclosed { .. }), "{err:?}");
        assert_eq!(err.position(), 13);
    }

    #[test]
    fn test_two_roots_rejected() {
        let err = raw("<Box/><Box/>").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }), "{err:?}");
        assert_eq!(err.position(), 6);
    }
}
