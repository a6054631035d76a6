//! Host object system abstraction
//!
//! The inflation engine never knows concrete object types. Everything it
//! needs (type lookup, instantiation, property and signal reflection, child
//! attachment) goes through the [`HostTypeSystem`] trait. Objects are
//! referred to by opaque [`ObjectId`] handles owned by the host.

pub mod memory;
pub mod schema;

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use thiserror::Error;

pub use memory::{HostCall, Invocation, MemoryTypeSystem, TypeSpec};
pub use schema::{SchemaError, TypeSchema};

/// Opaque handle to a host object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A dynamically typed property or argument value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    /// Strings, also used for enum nicks
    String(String),
    /// Object reference; `None` is the null object
    Object(Option<ObjectId>),
}

impl Value {
    /// Short name of the value's kind, for error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<ObjectId> {
        match self {
            Value::Object(id) => *id,
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{:?}", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(Some(id)) => write!(f, "{}", id),
            Value::Object(None) => write!(f, "null"),
        }
    }
}

/// Declared type of a property, child property or signal parameter
///
/// Written in type schemas as `bool`, `int`, `float`, `string`, `object`,
/// `object:Button` or `enum:start|center|end`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum ValueType {
    Bool,
    Int,
    Float,
    String,
    /// Enumeration, values are written by nick
    Enum(Vec<String>),
    /// Object reference, optionally restricted to a type and its subtypes
    Object(Option<String>),
}

impl ValueType {
    /// The value a property holds before anything sets it
    pub fn default_value(&self) -> Value {
        match self {
            ValueType::Bool => Value::Bool(false),
            ValueType::Int => Value::Int(0),
            ValueType::Float => Value::Float(0.0),
            ValueType::String => Value::String(String::new()),
            ValueType::Enum(nicks) => Value::String(nicks.first().cloned().unwrap_or_default()),
            ValueType::Object(_) => Value::Object(None),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::Bool => write!(f, "bool"),
            ValueType::Int => write!(f, "int"),
            ValueType::Float => write!(f, "float"),
            ValueType::String => write!(f, "string"),
            ValueType::Enum(nicks) => write!(f, "enum:{}", nicks.join("|")),
            ValueType::Object(None) => write!(f, "object"),
            ValueType::Object(Some(t)) => write!(f, "object:{}", t),
        }
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" | "boolean" => Ok(ValueType::Bool),
            "int" | "integer" => Ok(ValueType::Int),
            "float" | "double" => Ok(ValueType::Float),
            "string" => Ok(ValueType::String),
            "object" => Ok(ValueType::Object(None)),
            _ => {
                if let Some(type_name) = s.strip_prefix("object:") {
                    return Ok(ValueType::Object(Some(type_name.to_string())));
                }
                if let Some(nicks) = s.strip_prefix("enum:") {
                    let nicks: Vec<String> =
                        nicks.split('|').map(|n| n.trim().to_string()).collect();
                    if nicks.iter().any(|n| n.is_empty()) {
                        return Err(format!("enum type '{}' has an empty nick", s));
                    }
                    return Ok(ValueType::Enum(nicks));
                }
                Err(format!("unknown value type '{}'", s))
            }
        }
    }
}

impl TryFrom<String> for ValueType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub name: String,
    pub value_type: ValueType,
    pub writable: bool,
}

impl PropertySpec {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            writable: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignalSpec {
    pub name: String,
    /// Parameter types, excluding the emitting object
    pub params: Vec<ValueType>,
}

/// What a connected signal does when it fires
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerKind {
    /// Call the named method on the target
    Method(String),
    /// Emit the named signal on the target
    Emit(String),
}

/// A resolved signal handler ready to connect
#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    /// Object the handler runs against, normally the inflation host
    pub target: ObjectId,
    pub kind: HandlerKind,
    /// Arguments evaluated at inflation time
    pub bound_args: Vec<Value>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HostError {
    #[error("unknown object {0}")]
    UnknownObject(ObjectId),

    #[error("unknown type '{0}'")]
    UnknownType(String),

    #[error("type '{0}' is already defined")]
    DuplicateType(String),

    #[error("type '{type_name}' has no property '{property}'")]
    UnknownProperty { type_name: String, property: String },

    #[error("property '{property}' of '{type_name}' is read-only")]
    ReadOnlyProperty { type_name: String, property: String },

    #[error("invalid value for '{property}': expected {expected}, found {found}")]
    InvalidValue {
        property: String,
        expected: ValueType,
        found: Value,
    },

    #[error("type '{type_name}' has no signal '{signal}'")]
    UnknownSignal { type_name: String, signal: String },

    #[error("type '{type_name}' has no method '{method}'")]
    UnknownMethod { type_name: String, method: String },

    #[error("container '{container}' has no child property '{property}'")]
    UnknownChildProperty { container: String, property: String },

    #[error("object {child} is not a child of {parent}")]
    NotAChild { parent: ObjectId, child: ObjectId },

    #[error("object {0} already has a parent")]
    AlreadyParented(ObjectId),

    #[error("signal '{signal}' expects {expected} arguments, got {found}")]
    ArgumentCount {
        signal: String,
        expected: usize,
        found: usize,
    },

    #[error("signal emission nested deeper than {0} levels")]
    EmissionDepth(usize),
}

/// Reflection and mutation interface of the host object system
///
/// Type names are plain strings; objects are [`ObjectId`] handles. Lookups
/// return `None` or `false` for unknown names instead of failing, so the
/// caller can choose the error to report.
pub trait HostTypeSystem {
    fn has_type(&self, type_name: &str) -> bool;

    /// Whether `type_name` is `ancestor` or derives from it
    fn is_a(&self, type_name: &str, ancestor: &str) -> bool;

    /// Concrete type of a live object
    fn type_of(&self, object: ObjectId) -> Option<String>;

    fn instantiate(&mut self, type_name: &str) -> Result<ObjectId, HostError>;

    fn property(&self, type_name: &str, name: &str) -> Option<PropertySpec>;

    fn signal(&self, type_name: &str, name: &str) -> Option<SignalSpec>;

    /// Whether `object` exposes a method usable as a signal handler
    fn has_handler(&self, object: ObjectId, name: &str) -> bool;

    /// Whether children of `type_name` carry per-child properties
    fn has_child_properties(&self, type_name: &str) -> bool;

    fn child_property(&self, container_type: &str, name: &str) -> Option<PropertySpec>;

    fn get_property(&self, object: ObjectId, name: &str) -> Result<Value, HostError>;

    fn set_property(&mut self, object: ObjectId, name: &str, value: Value) -> Result<(), HostError>;

    fn connect_signal(
        &mut self,
        object: ObjectId,
        signal: &str,
        handler: Handler,
    ) -> Result<(), HostError>;

    fn append_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), HostError>;

    fn set_child_property(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        name: &str,
        value: Value,
    ) -> Result<(), HostError>;

    /// Detach `child` from `parent`, dropping its child properties
    fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), HostError>;

    /// Move an existing child directly after `after`, or first when `after` is `None`
    fn place_child(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        after: Option<ObjectId>,
    ) -> Result<(), HostError>;

    /// Add a child and apply packing options in one step
    fn add_child_with_options(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        options: &[(String, Value)],
    ) -> Result<(), HostError> {
        self.append_child(parent, child)?;
        for (name, value) in options {
            self.set_child_property(parent, child, name, value.clone())?;
        }
        Ok(())
    }
}
