//! TOML type schemas for the in-memory host
//!
//! ```toml
//! [types.Widget]
//! properties = { visible = "bool" }
//! signals = { destroy = [] }
//!
//! [types.Button]
//! extends = "Widget"
//! properties = { label = "string", relief = "enum:normal|none" }
//! defaults = { visible = true }
//! signals = { clicked = [] }
//! methods = ["on_reset"]
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::{HostError, HostTypeSystem, MemoryTypeSystem, TypeSpec, Value, ValueType};

#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Failed to read type schema: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse type schema TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("type '{type_name}' extends unknown type '{parent}'")]
    UnknownParent { type_name: String, parent: String },
    #[error("default for '{type_name}.{property}': {message}")]
    InvalidDefault {
        type_name: String,
        property: String,
        message: String,
    },
    #[error(transparent)]
    Host(#[from] HostError),
}

/// Host type declarations, keyed by type name
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TypeSchema {
    #[serde(default)]
    pub types: BTreeMap<String, TypeEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct TypeEntry {
    pub extends: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, ValueType>,
    #[serde(default)]
    pub read_only: Vec<String>,
    #[serde(default)]
    pub defaults: BTreeMap<String, toml::Value>,
    #[serde(default)]
    pub signals: BTreeMap<String, Vec<ValueType>>,
    #[serde(default)]
    pub methods: Vec<String>,
    #[serde(default)]
    pub child_properties: BTreeMap<String, ValueType>,
}

impl TypeSchema {
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self, SchemaError> {
        Ok(toml::from_str(content)?)
    }

    /// Build a fresh host with every type defined, parents before children
    pub fn build(&self) -> Result<MemoryTypeSystem, SchemaError> {
        let mut system = MemoryTypeSystem::new();
        let mut pending: Vec<(&String, &TypeEntry)> = self.types.iter().collect();

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for (name, entry) in pending {
                let ready = entry
                    .extends
                    .as_ref()
                    .map_or(true, |p| system.type_names().any(|t| t == p));
                if ready {
                    system.define(entry.to_spec(name, &system)?)?;
                } else {
                    deferred.push((name, entry));
                }
            }
            if deferred.len() == before {
                // Nothing progressed: the first remaining parent is missing or cyclic
                let (name, entry) = deferred[0];
                return Err(SchemaError::UnknownParent {
                    type_name: name.clone(),
                    parent: entry.extends.clone().unwrap_or_default(),
                });
            }
            pending = deferred;
        }
        Ok(system)
    }
}

impl TypeEntry {
    fn to_spec(&self, name: &str, system: &MemoryTypeSystem) -> Result<TypeSpec, SchemaError> {
        let mut spec = TypeSpec::new(name);
        if let Some(parent) = &self.extends {
            spec = spec.extends(parent.clone());
        }
        for (prop, value_type) in &self.properties {
            spec = if self.read_only.contains(prop) {
                spec.read_only_property(prop.clone(), value_type.clone())
            } else {
                spec.property(prop.clone(), value_type.clone())
            };
        }
        for (prop, raw) in &self.defaults {
            let value_type = self
                .properties
                .get(prop)
                .cloned()
                .or_else(|| {
                    self.extends
                        .as_deref()
                        .and_then(|p| system.property(p, prop))
                        .map(|spec| spec.value_type)
                })
                .ok_or_else(|| SchemaError::InvalidDefault {
                    type_name: name.to_string(),
                    property: prop.clone(),
                    message: "no such property".to_string(),
                })?;
            let value =
                default_value(&value_type, raw).map_err(|message| SchemaError::InvalidDefault {
                    type_name: name.to_string(),
                    property: prop.clone(),
                    message,
                })?;
            spec = spec.default_value(prop.clone(), value);
        }
        for (signal, params) in &self.signals {
            spec = spec.signal(signal.clone(), params.clone());
        }
        for method in &self.methods {
            spec = spec.method(method.clone());
        }
        for (prop, value_type) in &self.child_properties {
            spec = spec.child_property(prop.clone(), value_type.clone());
        }
        Ok(spec)
    }
}

fn default_value(value_type: &ValueType, raw: &toml::Value) -> Result<Value, String> {
    match (value_type, raw) {
        (ValueType::Bool, toml::Value::Boolean(b)) => Ok(Value::Bool(*b)),
        (ValueType::Int, toml::Value::Integer(n)) => Ok(Value::Int(*n)),
        (ValueType::Float, toml::Value::Float(n)) => Ok(Value::Float(*n)),
        (ValueType::Float, toml::Value::Integer(n)) => Ok(Value::Float(*n as f64)),
        (ValueType::String, toml::Value::String(s)) => Ok(Value::String(s.clone())),
        (ValueType::Enum(nicks), toml::Value::String(s)) if nicks.contains(s) => {
            Ok(Value::String(s.clone()))
        }
        _ => Err(format!("expected {}, found {}", value_type, raw)),
    }
}
