//! Validation of the raw element tree into [`TemplateNode`]s

use std::collections::HashMap;

use indexmap::IndexMap;

use crate::error::{ParseError, Span};
use crate::parser::expression::{parse_binding, parse_handler};
use crate::parser::grammar::{RawAttribute, RawElement};
use crate::template::{
    Attribute, AttributeValue, DirectiveAnnotation, Segment, Spanned, TemplateNode,
    DIRECTIVE_PREFIX, NAME_ATTRIBUTE, SIGNAL_PREFIX,
};

/// Build the template tree, checking names across the whole document
pub(crate) fn build(root: RawElement) -> Result<TemplateNode, ParseError> {
    let mut names = HashMap::new();
    build_node(root, &mut names)
}

fn build_node(
    raw: RawElement,
    names: &mut HashMap<String, Span>,
) -> Result<TemplateNode, ParseError> {
    let mut name = None;
    let mut attributes: IndexMap<String, Attribute> = IndexMap::new();
    let mut directives = Vec::new();
    let mut seen: HashMap<&str, Span> = HashMap::new();

    for attr in &raw.attributes {
        let attr_name = attr.name.node.as_str();
        if let Some(first) = seen.get(attr_name) {
            return Err(ParseError::DuplicateAttribute {
                span: attr.name.span.clone(),
                name: attr_name.to_string(),
                first: first.clone(),
            });
        }
        seen.insert(attr_name, attr.name.span.clone());

        // Name through the closing quote
        let span = attr.name.span.start..attr.value.span.end + 1;

        if attr_name == NAME_ATTRIBUTE {
            let value = decode_literal(&attr.value.node, attr.value.span.start)?;
            if let Some(first) = names.get(&value) {
                return Err(ParseError::DuplicateName {
                    span: attr.value.span.clone(),
                    name: value,
                    first: first.clone(),
                });
            }
            names.insert(value.clone(), attr.value.span.clone());
            name = Some(Spanned::new(value, attr.value.span.clone()));
        } else if let Some(key) = attr_name.strip_prefix(DIRECTIVE_PREFIX) {
            directives.push(DirectiveAnnotation {
                key: key.to_string(),
                value: attribute_value(attr)?,
                span,
            });
        } else {
            let value = if attr_name.starts_with(SIGNAL_PREFIX) {
                AttributeValue::Handler(parse_handler(&attr.value.node, attr.value.span.start)?)
            } else {
                attribute_value(attr)?
            };
            attributes.insert(
                attr_name.to_string(),
                Attribute {
                    name: attr_name.to_string(),
                    value,
                    span,
                },
            );
        }
    }

    let children = raw
        .children
        .into_iter()
        .map(|child| build_node(child, names))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(close) = raw.close {
        if close.node != raw.tag.node {
            return Err(ParseError::MismatchedClose {
                span: close.span,
                open: raw.tag.node,
                close: close.node,
            });
        }
    }

    Ok(TemplateNode {
        type_name: raw.tag,
        name,
        attributes,
        directives,
        children,
        span: raw.span,
    })
}

/// Classify a plain attribute value as literal, binding or compound
///
/// Every unescaped `{...}` is an expression. A value made of a single
/// expression is a binding; expressions mixed with text form a compound.
fn attribute_value(attr: &RawAttribute) -> Result<AttributeValue, ParseError> {
    let text = attr.value.node.as_str();
    let start = attr.value.span.start;
    let bytes = text.as_bytes();

    let mut segments = Vec::new();
    let mut text_from = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'{' => {
                let Some(len) = closing_brace(&text[i + 1..]) else {
                    return Err(ParseError::InvalidExpression {
                        span: start + i..start + text.len(),
                        message: "binding is missing its closing '}'".to_string(),
                    });
                };
                let close = i + 1 + len;
                if text_from < i {
                    let decoded = decode_literal(&text[text_from..i], start + text_from)?;
                    segments.push(Segment::Text(decoded));
                }
                segments.push(Segment::Expr(parse_binding(&text[i + 1..close], start + i + 1)?));
                i = close + 1;
                text_from = i;
            }
            _ => i += 1,
        }
    }

    if !segments.iter().any(Segment::is_expr) {
        return Ok(AttributeValue::Literal(decode_literal(text, start)?));
    }
    if text_from < text.len() {
        segments.push(Segment::Text(decode_literal(&text[text_from..], start + text_from)?));
    }
    if let [Segment::Expr(expr)] = segments.as_slice() {
        return Ok(AttributeValue::Binding(expr.clone()));
    }
    Ok(AttributeValue::Compound(segments))
}

/// Offset of the `}` ending an expression, skipping over quoted strings
fn closing_brace(expr: &str) -> Option<usize> {
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in expr.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '\'' => quoted = !quoted,
            '}' if !quoted => return Some(i),
            _ => {}
        }
    }
    None
}

/// Decode backslash escapes and XML character references
pub(crate) fn decode_literal(text: &str, offset: usize) -> Result<String, ParseError> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, '\\')) => out.push('\\'),
                Some((_, '{')) => out.push('{'),
                Some((_, '}')) => out.push('}'),
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
            },
            '&' => {
                let rest = &text[i + 1..];
                let len = rest
                    .find(|c: char| !(c.is_ascii_alphanumeric() || c == '#'))
                    .unwrap_or(rest.len());
                let entity = &rest[..len];
                let decoded = if rest[len..].starts_with(';') {
                    decode_entity(entity)
                } else {
                    None
                };
                match decoded {
                    Some(ch) => out.push(ch),
                    None => {
                        let terminated = rest[len..].starts_with(';');
                        let end = offset + i + 1 + len + usize::from(terminated);
                        return Err(ParseError::UnknownEscape {
                            span: offset + i..end,
                            sequence: format!("&{}{}", entity, if terminated { ";" } else { "" }),
                        });
                    }
                }
                // Skip the entity body and the semicolon
                let resume = i + 1 + len + 1;
                while chars.next_if(|&(k, _)| k < resume).is_some() {}
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

fn decode_entity(entity: &str) -> Option<char> {
    match entity {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => {
            let code = entity.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => code.parse::<u32>().ok()?,
            };
            char::from_u32(value)
        }
    }
}
