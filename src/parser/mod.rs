//! Parser for template markup
//!
//! Parsing runs in three stages: the `logos` lexer, the `chumsky` element
//! grammar, and the builder that validates the raw tree into a [`Template`].

mod builder;
mod expression;
mod grammar;
pub mod lexer;

pub use expression::ExprToken;

use crate::error::ParseError;
use crate::template::Template;

/// Parse template bytes that have no resource identity
pub fn parse(bytes: &[u8]) -> Result<Template, ParseError> {
    parse_source(bytes, None)
}

pub fn parse_str(source: &str) -> Result<Template, ParseError> {
    parse(source.as_bytes())
}

/// Parse template bytes loaded from `resource`; locations will name it
pub fn parse_named(bytes: &[u8], resource: &str) -> Result<Template, ParseError> {
    parse_source(bytes, Some(resource.to_string()))
}

fn parse_source(bytes: &[u8], resource: Option<String>) -> Result<Template, ParseError> {
    let source = std::str::from_utf8(bytes).map_err(|e| ParseError::InvalidUtf8 {
        offset: e.valid_up_to(),
    })?;

    let tokens = lexer::lex(source)?;
    // Whitespace, comments and declarations only
    if tokens.is_empty() {
        return Err(ParseError::Empty);
    }

    let raw = grammar::parse_tokens(tokens, source.len())?;
    let root = builder::build(raw)?;
    tracing::debug!(
        resource = resource.as_deref().unwrap_or("<unknown>"),
        root = root.type_name(),
        nodes = root.count(),
        "parsed template"
    );
    Ok(Template::new(root, resource, source))
}
