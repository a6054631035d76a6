//! Directive extension protocol
//!
//! A directive customises how a node is processed without the engine knowing
//! about it. Directives come in two parts: a stateless [`DirectiveFactory`]
//! registered once in a [`DirectiveRegistry`], and a [`DirectiveInstance`]
//! created per node and per inflation.
//!
//! Directives reach a node in two ways. A node can name them with `_`
//! annotations (`_if="{visible}"`, `_pack.expand="true"`), or a factory can
//! ask to auto-attach based on the node's surroundings.
//!
//! # Hooks
//!
//! The engine calls instance hooks in this order for each node:
//!
//! 1. `set_property` once per annotation value
//! 2. `should_process`; any veto skips the node and its subtree
//! 3. `claims_attribute` / `bind_claimed` for each attribute
//! 4. `attach` after the children were inflated, or `update_attachment` when
//!    a re-inflation reused an object that is already attached

mod child_property;
mod conditional;
pub mod packing;
pub mod registry;

use thiserror::Error;

use crate::host::{HostError, HostTypeSystem, ObjectId, Value};
use crate::template::{Attribute, TemplateNode};

pub use child_property::ChildPropertyDirective;
pub use conditional::ConditionalDirective;
pub use packing::PackingDirective;
pub use registry::{DirectiveFlags, DirectiveRegistry, DuplicatePolicy};

/// How annotation values reach [`DirectiveInstance::set_property`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyFormat {
    /// Values are ignored; the annotation only attaches the directive
    None,
    /// `_id="v"` sets property `value`
    ImplicitValue,
    /// Only `_id.prop="v"` is allowed
    Explicit,
}

/// Property name used by [`PropertyFormat::ImplicitValue`]
pub const IMPLICIT_PROPERTY: &str = "value";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processing {
    Continue,
    /// Skip the node and its whole subtree
    Veto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attachment {
    /// The directive attached the child; no further attach hooks run
    Handled,
    Declined,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DirectiveError {
    #[error("unknown property '{0}'")]
    UnknownProperty(String),

    #[error("invalid value for '{property}': expected {expected}, found {found}")]
    InvalidValue {
        property: String,
        expected: String,
        found: String,
    },

    #[error(transparent)]
    Host(#[from] HostError),
}

/// What a directive can see about the node being processed
#[derive(Debug, Clone, Copy)]
pub struct NodeContext<'a> {
    pub node: &'a TemplateNode,
    /// Parent object; `None` for the template root
    pub parent: Option<ObjectId>,
    pub parent_type: Option<&'a str>,
}

/// Stateless directive definition, shared across threads and inflations
pub trait DirectiveFactory: Send + Sync {
    /// Registry id, the `if` in `_if="..."`
    fn name(&self) -> &str;

    fn property_format(&self) -> PropertyFormat {
        PropertyFormat::None
    }

    /// Whether to attach to a node that does not name this directive
    fn should_auto_attach(&self, _system: &dyn HostTypeSystem, _node: &NodeContext<'_>) -> bool {
        false
    }

    fn create_instance(&self) -> Box<dyn DirectiveInstance>;
}

/// Per-node directive state; every hook has a pass-through default
pub trait DirectiveInstance {
    fn set_property(
        &mut self,
        _system: &dyn HostTypeSystem,
        name: &str,
        _value: Value,
    ) -> Result<(), DirectiveError> {
        Err(DirectiveError::UnknownProperty(name.to_string()))
    }

    fn should_process(
        &mut self,
        _system: &dyn HostTypeSystem,
        _node: &NodeContext<'_>,
    ) -> Processing {
        Processing::Continue
    }

    /// Whether this directive binds `attribute` instead of the binder.
    /// Signal handlers are never offered.
    fn claims_attribute(
        &self,
        _system: &dyn HostTypeSystem,
        _node: &NodeContext<'_>,
        _attribute: &Attribute,
    ) -> bool {
        false
    }

    /// Bind a claimed attribute; `value` is the evaluated, uncoerced value
    fn bind_claimed(
        &mut self,
        _system: &mut dyn HostTypeSystem,
        _node: &NodeContext<'_>,
        _object: ObjectId,
        attribute: &Attribute,
        _value: Value,
    ) -> Result<(), DirectiveError> {
        Err(DirectiveError::UnknownProperty(attribute.name.clone()))
    }

    fn attach(
        &mut self,
        _system: &mut dyn HostTypeSystem,
        _parent: ObjectId,
        _child: ObjectId,
    ) -> Result<Attachment, DirectiveError> {
        Ok(Attachment::Declined)
    }

    /// Reapply per-child state to a child that stayed attached to `parent`
    fn update_attachment(
        &mut self,
        _system: &mut dyn HostTypeSystem,
        _parent: ObjectId,
        _child: ObjectId,
    ) -> Result<Attachment, DirectiveError> {
        Ok(Attachment::Declined)
    }
}

/// Coerce `value` for a directive property, mapping failures to [`DirectiveError`]
pub(crate) fn coerce_property(
    system: &dyn HostTypeSystem,
    property: &str,
    value: Value,
    target: &crate::host::ValueType,
) -> Result<Value, DirectiveError> {
    let found = value.to_string();
    crate::binder::coerce(system, value, target).ok_or_else(|| DirectiveError::InvalidValue {
        property: property.to_string(),
        expected: target.to_string(),
        found,
    })
}
