//! The `pack` directive: container packing options
//!
//! Auto-attaches to children of one container type and its subtypes, and can
//! be named explicitly under any container. Options come from `_pack.<option>`
//! annotations and from attributes naming a child property of the parent, and
//! are handed to the host in a single `add_child_with_options` call.
//!
//! Once active, `pack` owns every child property of the node so none of them
//! is split off into a separate `set_child_property` call.

use super::{
    coerce_property, Attachment, DirectiveError, DirectiveFactory, DirectiveInstance, NodeContext,
    PropertyFormat,
};
use crate::host::{HostError, HostTypeSystem, ObjectId, Value};
use crate::template::Attribute;

/// Container type used when none is configured
pub const DEFAULT_CONTAINER_TYPE: &str = "Box";

#[derive(Debug, Clone)]
pub struct PackingDirective {
    container_type: String,
}

impl PackingDirective {
    pub fn new(container_type: impl Into<String>) -> Self {
        Self {
            container_type: container_type.into(),
        }
    }

    pub fn container_type(&self) -> &str {
        &self.container_type
    }
}

impl Default for PackingDirective {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAINER_TYPE)
    }
}

impl DirectiveFactory for PackingDirective {
    fn name(&self) -> &str {
        "pack"
    }

    fn property_format(&self) -> PropertyFormat {
        PropertyFormat::Explicit
    }

    fn should_auto_attach(&self, system: &dyn HostTypeSystem, node: &NodeContext<'_>) -> bool {
        node.parent_type
            .is_some_and(|t| system.is_a(t, &self.container_type))
    }

    fn create_instance(&self) -> Box<dyn DirectiveInstance> {
        Box::new(Packing::default())
    }
}

#[derive(Default)]
struct Packing {
    /// Options in the order they were given; coerced once the parent is known
    options: Vec<(String, Value)>,
}

impl Packing {
    fn set_option(&mut self, name: &str, value: Value) {
        match self.options.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.options.push((name.to_string(), value)),
        }
    }

    /// Coerce every option to the child property type of `parent`'s container
    fn coerced_options(
        &mut self,
        system: &dyn HostTypeSystem,
        parent: ObjectId,
    ) -> Result<Vec<(String, Value)>, DirectiveError> {
        let container = system.type_of(parent).ok_or(HostError::UnknownObject(parent))?;
        let mut options = Vec::with_capacity(self.options.len());
        for (name, value) in self.options.drain(..) {
            let spec = system
                .child_property(&container, &name)
                .ok_or_else(|| HostError::UnknownChildProperty {
                    container: container.clone(),
                    property: name.clone(),
                })?;
            let value = coerce_property(system, &name, value, &spec.value_type)?;
            options.push((name, value));
        }
        Ok(options)
    }
}

impl DirectiveInstance for Packing {
    fn set_property(
        &mut self,
        _system: &dyn HostTypeSystem,
        name: &str,
        value: Value,
    ) -> Result<(), DirectiveError> {
        self.set_option(name, value);
        Ok(())
    }

    fn claims_attribute(
        &self,
        system: &dyn HostTypeSystem,
        node: &NodeContext<'_>,
        attribute: &Attribute,
    ) -> bool {
        node.parent_type
            .is_some_and(|t| system.child_property(t, &attribute.name).is_some())
    }

    fn bind_claimed(
        &mut self,
        _system: &mut dyn HostTypeSystem,
        _node: &NodeContext<'_>,
        _object: ObjectId,
        attribute: &Attribute,
        value: Value,
    ) -> Result<(), DirectiveError> {
        self.set_option(&attribute.name, value);
        Ok(())
    }

    fn attach(
        &mut self,
        system: &mut dyn HostTypeSystem,
        parent: ObjectId,
        child: ObjectId,
    ) -> Result<Attachment, DirectiveError> {
        let options = self.coerced_options(&*system, parent)?;
        system.add_child_with_options(parent, child, &options)?;
        Ok(Attachment::Handled)
    }

    fn update_attachment(
        &mut self,
        system: &mut dyn HostTypeSystem,
        parent: ObjectId,
        child: ObjectId,
    ) -> Result<Attachment, DirectiveError> {
        for (name, value) in self.coerced_options(&*system, parent)? {
            system.set_child_property(parent, child, &name, value)?;
        }
        Ok(Attachment::Handled)
    }
}
