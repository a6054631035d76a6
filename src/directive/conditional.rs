//! The `if` directive: skip a node when its condition is false

use super::{
    coerce_property, DirectiveError, DirectiveFactory, DirectiveInstance, NodeContext, Processing,
    PropertyFormat, IMPLICIT_PROPERTY,
};
use crate::host::{HostTypeSystem, Value, ValueType};

/// `_if="{expr}"` or `_if="false"`
#[derive(Debug, Default, Clone, Copy)]
pub struct ConditionalDirective;

impl DirectiveFactory for ConditionalDirective {
    fn name(&self) -> &str {
        "if"
    }

    fn property_format(&self) -> PropertyFormat {
        PropertyFormat::ImplicitValue
    }

    fn create_instance(&self) -> Box<dyn DirectiveInstance> {
        Box::new(Conditional { condition: true })
    }
}

struct Conditional {
    condition: bool,
}

impl DirectiveInstance for Conditional {
    fn set_property(
        &mut self,
        system: &dyn HostTypeSystem,
        name: &str,
        value: Value,
    ) -> Result<(), DirectiveError> {
        if name != IMPLICIT_PROPERTY {
            return Err(DirectiveError::UnknownProperty(name.to_string()));
        }
        self.condition = match coerce_property(system, name, value, &ValueType::Bool)? {
            Value::Bool(b) => b,
            _ => true,
        };
        Ok(())
    }

    fn should_process(
        &mut self,
        _system: &dyn HostTypeSystem,
        _node: &NodeContext<'_>,
    ) -> Processing {
        if self.condition {
            Processing::Continue
        } else {
            Processing::Veto
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::MemoryTypeSystem;

    #[test]
    fn test_condition_values() {
        let system = MemoryTypeSystem::new();
        for (value, expected) in [
            (Value::Bool(false), false),
            (Value::String("no".to_string()), false),
            (Value::String("0".to_string()), false),
            (Value::String("yes".to_string()), true),
            (Value::Bool(true), true),
        ] {
            let mut instance = Conditional { condition: true };
            instance
                .set_property(&system, IMPLICIT_PROPERTY, value.clone())
                .expect("Should accept");
            assert_eq!(instance.condition, expected, "{value:?}");
        }
    }

    #[test]
    fn test_rejects_non_boolean() {
        let system = MemoryTypeSystem::new();
        let mut instance = Conditional { condition: true };
        assert!(matches!(
            instance.set_property(&system, IMPLICIT_PROPERTY, Value::String("maybe".to_string())),
            Err(DirectiveError::InvalidValue { .. })
        ));
        assert!(matches!(
            instance.set_property(&system, "other", Value::Bool(true)),
            Err(DirectiveError::UnknownProperty(_))
        ));
    }
}
