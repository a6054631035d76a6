//! Error types for binding and inflation

use thiserror::Error;

use crate::error::Span;
use crate::host::HostError;
use crate::template::SourceLocation;

/// Failure to bind one attribute on one object
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BindingError {
    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty { type_name: String, property: String },

    #[error("type '{type_name}' has no signal '{signal}'")]
    UnknownSignal { type_name: String, signal: String },

    #[error("host has no handler '{handler}'")]
    UnknownHandler { handler: String },

    #[error("cannot convert {found} to {expected} for '{property}'")]
    TypeMismatch {
        property: String,
        expected: String,
        found: String,
    },

    #[error("'{name}' does not name an earlier node or a host property")]
    UnresolvedReference { name: String },

    #[error("signal '{signal}' takes {expected} arguments, {found} given")]
    ArgumentCount {
        signal: String,
        expected: usize,
        found: usize,
    },

    #[error("directive '{directive}' could not bind: {message}")]
    Directive { directive: String, message: String },

    #[error(transparent)]
    Host(#[from] HostError),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InflateError {
    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("host object of type '{host_type}' is not a '{root_type}'")]
    HostTypeMismatch { host_type: String, root_type: String },

    #[error("unknown directive '{0}'")]
    UnknownDirective(String),

    #[error("directive '{0}' is already registered")]
    DuplicateDirective(String),

    #[error("directive '{directive}' rejected property '{property}': {message}")]
    DirectiveProperty {
        directive: String,
        property: String,
        message: String,
    },

    #[error("directive '{directive}' failed: {message}")]
    Directive { directive: String, message: String },

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Host(#[from] HostError),

    /// Any of the above, located at a template node
    #[error("{location}: {path}{}: {source}", attribute_suffix(.attribute))]
    AtNode {
        /// Node path such as `Window/Box[0]/Button#btn`
        path: String,
        span: Span,
        location: SourceLocation,
        attribute: Option<String>,
        source: Box<InflateError>,
    },
}

fn attribute_suffix(attribute: &Option<String>) -> String {
    match attribute {
        Some(name) => format!(" @{}", name),
        None => String::new(),
    }
}

impl InflateError {
    /// The underlying error without node context
    pub fn root_cause(&self) -> &InflateError {
        let mut current = self;
        while let InflateError::AtNode { source, .. } = current {
            current = source;
        }
        current
    }

    pub fn path(&self) -> Option<&str> {
        match self {
            InflateError::AtNode { path, .. } => Some(path),
            _ => None,
        }
    }

    pub fn location(&self) -> Option<&SourceLocation> {
        match self {
            InflateError::AtNode { location, .. } => Some(location),
            _ => None,
        }
    }

    pub fn attribute(&self) -> Option<&str> {
        match self {
            InflateError::AtNode { attribute, .. } => attribute.as_deref(),
            _ => None,
        }
    }

    pub fn span(&self) -> Option<Span> {
        match self {
            InflateError::AtNode { span, .. } => Some(span.clone()),
            _ => None,
        }
    }
}
