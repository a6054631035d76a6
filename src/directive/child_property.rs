//! The `child-property` directive
//!
//! Attributes that name a child property of the parent container are set on
//! the parent/child pair instead of on the child object.

use super::{
    coerce_property, Attachment, DirectiveError, DirectiveFactory, DirectiveInstance, NodeContext,
};
use crate::host::{HostError, HostTypeSystem, ObjectId, Value};
use crate::template::Attribute;

#[derive(Debug, Default, Clone, Copy)]
pub struct ChildPropertyDirective;

impl DirectiveFactory for ChildPropertyDirective {
    fn name(&self) -> &str {
        "child-property"
    }

    fn should_auto_attach(&self, system: &dyn HostTypeSystem, node: &NodeContext<'_>) -> bool {
        node.parent_type.is_some_and(|t| system.has_child_properties(t))
    }

    fn create_instance(&self) -> Box<dyn DirectiveInstance> {
        Box::new(ChildProperties::default())
    }
}

#[derive(Default)]
struct ChildProperties {
    values: Vec<(String, Value)>,
}

impl DirectiveInstance for ChildProperties {
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
        system: &mut dyn HostTypeSystem,
        node: &NodeContext<'_>,
        _object: ObjectId,
        attribute: &Attribute,
        value: Value,
    ) -> Result<(), DirectiveError> {
        let container = node.parent_type.unwrap_or_default();
        let spec = system
            .child_property(container, &attribute.name)
            .ok_or_else(|| HostError::UnknownChildProperty {
                container: container.to_string(),
                property: attribute.name.clone(),
            })?;
        let value = coerce_property(&*system, &attribute.name, value, &spec.value_type)?;
        self.values.push((attribute.name.clone(), value));
        Ok(())
    }

    fn attach(
        &mut self,
        system: &mut dyn HostTypeSystem,
        parent: ObjectId,
        child: ObjectId,
    ) -> Result<Attachment, DirectiveError> {
        system.append_child(parent, child)?;
        self.update_attachment(system, parent, child)
    }

    fn update_attachment(
        &mut self,
        system: &mut dyn HostTypeSystem,
        parent: ObjectId,
        child: ObjectId,
    ) -> Result<Attachment, DirectiveError> {
        for (name, value) in self.values.drain(..) {
            system.set_child_property(parent, child, &name, value)?;
        }
        Ok(Attachment::Handled)
    }
}
