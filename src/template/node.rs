//! Immutable template representation produced by the parser

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::directive::DirectiveRegistry;
use crate::error::Span;
use crate::host::Value;
use crate::inflator::Inflator;

/// Reserved attribute declaring a node's symbolic name
pub const NAME_ATTRIBUTE: &str = "name";

/// Attribute prefix marking a directive annotation
pub const DIRECTIVE_PREFIX: char = '_';

/// Attribute prefix marking a signal connection
pub const SIGNAL_PREFIX: &str = "on-";

/// Value with source location
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

/// Binding expression evaluated against the host and inflation scope
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal constant: `true`, `42`, `0xff`, `1.5`, `'text'`
    Constant(Value),
    /// Dotted member path: `elapsed`, `btn.label`
    Path(Vec<String>),
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant(Value::String(s)) => write!(f, "'{}'", s),
            Expression::Constant(v) => write!(f, "{}", v),
            Expression::Path(segments) => write!(f, "{}", segments.join(".")),
        }
    }
}

/// Right-hand side of an `on-<signal>` attribute
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerExpr {
    /// Call a method on the host: `on_reset` or `on_reset(btn)`
    Method { name: String, args: Vec<Expression> },
    /// Emit a signal on the host: `emit reset(btn)`
    Emit { signal: String, args: Vec<Expression> },
}

impl HandlerExpr {
    pub fn args(&self) -> &[Expression] {
        match self {
            HandlerExpr::Method { args, .. } | HandlerExpr::Emit { args, .. } => args,
        }
    }
}

impl fmt::Display for HandlerExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, name, args) = match self {
            HandlerExpr::Method { name, args } => ("", name, args),
            HandlerExpr::Emit { signal, args } => ("emit ", signal, args),
        };
        write!(f, "{}{}", prefix, name)?;
        if !args.is_empty() {
            let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            write!(f, "({})", args.join(", "))?;
        }
        Ok(())
    }
}

/// Piece of a compound value
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Decoded text, kept verbatim
    Text(String),
    /// Embedded `{...}` expression, rendered through its value's `Display`
    Expr(Expression),
}

impl Segment {
    pub fn is_expr(&self) -> bool {
        matches!(self, Segment::Expr(_))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValue {
    Literal(String),
    /// The whole value is one `{...}` expression
    Binding(Expression),
    /// Text mixed with expressions: `Elapsed: {elapsed}s`
    Compound(Vec<Segment>),
    Handler(HandlerExpr),
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttributeValue::Literal(s) => write!(f, "{:?}", s),
            AttributeValue::Binding(expr) => write!(f, "{{{}}}", expr),
            AttributeValue::Compound(segments) => {
                f.write_str("\"")?;
                for segment in segments {
                    match segment {
                        Segment::Text(text) => {
                            for c in text.chars() {
                                match c {
                                    '{' | '}' => write!(f, "\\{}", c)?,
                                    c => write!(f, "{}", c.escape_debug())?,
                                }
                            }
                        }
                        Segment::Expr(expr) => write!(f, "{{{}}}", expr)?,
                    }
                }
                f.write_str("\"")
            }
            AttributeValue::Handler(handler) => write!(f, "{}", handler),
        }
    }
}

/// A `name="value"` pair on a node
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
    pub span: Span,
}

impl Attribute {
    /// Signal name for `on-<signal>` attributes
    pub fn signal(&self) -> Option<&str> {
        self.name.strip_prefix(SIGNAL_PREFIX)
    }
}

/// A `_key="value"` directive annotation
#[derive(Debug, Clone, PartialEq)]
pub struct DirectiveAnnotation {
    /// Key without the leading underscore, e.g. `if` or `pack.expand`
    pub key: String,
    pub value: AttributeValue,
    pub span: Span,
}

/// One declarative element of a template
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateNode {
    pub(crate) type_name: Spanned<String>,
    pub(crate) name: Option<Spanned<String>>,
    pub(crate) attributes: IndexMap<String, Attribute>,
    pub(crate) directives: Vec<DirectiveAnnotation>,
    pub(crate) children: Vec<TemplateNode>,
    pub(crate) span: Span,
}

impl TemplateNode {
    /// Type reference, resolved against the host type system at inflation
    pub fn type_name(&self) -> &str {
        &self.type_name.node
    }

    /// Symbolic name declared with `name="..."`
    pub fn name(&self) -> Option<&str> {
        self.name.as_ref().map(|n| n.node.as_str())
    }

    /// Attributes in document order
    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attributes.values()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    pub fn directives(&self) -> &[DirectiveAnnotation] {
        &self.directives
    }

    pub fn children(&self) -> &[TemplateNode] {
        &self.children
    }

    /// Byte range of the whole element
    pub fn span(&self) -> Span {
        self.span.clone()
    }

    /// Total number of nodes in this subtree, including this one
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TemplateNode::count).sum::<usize>()
    }

    fn write_outline(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        out.push_str(&indent);
        out.push_str(self.type_name());
        if let Some(name) = self.name() {
            out.push_str(&format!(" #{}", name));
        }
        for directive in &self.directives {
            out.push_str(&format!(" _{}={}", directive.key, directive.value));
        }
        for attribute in self.attributes.values() {
            out.push_str(&format!(" {}={}", attribute.name, attribute.value));
        }
        out.push('\n');
        for child in &self.children {
            child.write_outline(out, depth + 1);
        }
    }
}

/// Line/column position within a template resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<String>,
    /// 1-based line
    pub line: usize,
    /// 1-based column, counted in bytes
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}",
            self.file.as_deref().unwrap_or("<unknown>"),
            self.line,
            self.column
        )
    }
}

/// A compiled template: the root node plus compile-time metadata
///
/// Templates never change after parsing and are shared between inflations
/// as `Arc<Template>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub(crate) root: TemplateNode,
    pub(crate) resource: Option<String>,
    /// Byte offset of the start of every line
    pub(crate) line_starts: Vec<usize>,
}

impl Template {
    pub(crate) fn new(root: TemplateNode, resource: Option<String>, source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            root,
            resource,
            line_starts,
        }
    }

    pub fn root(&self) -> &TemplateNode {
        &self.root
    }

    pub fn root_type(&self) -> &str {
        self.root.type_name()
    }

    /// Resource identity the template was parsed from, if any
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Map a byte offset to a line/column location
    pub fn location(&self, offset: usize) -> SourceLocation {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        SourceLocation {
            file: self.resource.clone(),
            line: line + 1,
            column: offset.saturating_sub(line_start) + 1,
        }
    }

    /// Indented one-line-per-node rendering of the tree
    pub fn outline(&self) -> String {
        let mut out = String::new();
        self.root.write_outline(&mut out, 0);
        out
    }

    /// Create an inflator for this template using the given directives
    pub fn create_inflator(self: &Arc<Self>, registry: DirectiveRegistry) -> Inflator {
        Inflator::new(Arc::clone(self), registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(type_name: &str) -> TemplateNode {
        TemplateNode {
            type_name: Spanned::new(type_name.to_string(), 0..0),
            name: None,
            attributes: IndexMap::new(),
            directives: Vec::new(),
            children: Vec::new(),
            span: 0..0,
        }
    }

    #[test]
    fn test_location_lines_and_columns() {
        let source = "<Window>\n  <Label/>\n</Window>";
        let template = Template::new(leaf("Window"), Some("win.xml".to_string()), source);

        assert_eq!(template.location(0).to_string(), "win.xml:1:1");
        assert_eq!(template.location(11).to_string(), "win.xml:2:3");
        assert_eq!(template.location(9).line, 2);
    }

    #[test]
    fn test_unknown_file_location() {
        let template = Template::new(leaf("Window"), None, "<Window/>");
        assert_eq!(template.location(4).to_string(), "<unknown>:1:5");
    }

    #[test]
    fn test_count_includes_descendants() {
        let mut root = leaf("Box");
        let mut inner = leaf("Box");
        inner.children.push(leaf("Label"));
        root.children.push(inner);
        root.children.push(leaf("Button"));
        assert_eq!(root.count(), 4);
    }

    #[test]
    fn test_handler_display() {
        let handler = HandlerExpr::Emit {
            signal: "reset".to_string(),
            args: vec![Expression::Path(vec!["btn".to_string()])],
        };
        assert_eq!(handler.to_string(), "emit reset(btn)");
    }
}
