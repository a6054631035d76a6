//! Attribute binding: property assignment and signal connection
//!
//! The binder turns one template attribute into host calls on one object.
//! Literals and binding expressions become a `set_property` after coercion
//! to the declared property type; handler expressions become a
//! `connect_signal`. No call is retried.

use crate::host::{Handler, HandlerKind, HostTypeSystem, ObjectId, Value, ValueType};
use crate::inflator::{BindingError, InflationContext};
use crate::template::{Attribute, AttributeValue, Expression, HandlerExpr, Segment};

/// Bind `attribute` on `object`
pub fn bind_attribute(
    object: ObjectId,
    attribute: &Attribute,
    ctx: &mut InflationContext<'_>,
) -> Result<(), BindingError> {
    match &attribute.value {
        AttributeValue::Literal(text) => {
            set_property(object, &attribute.name, Value::String(text.clone()), ctx)
        }
        AttributeValue::Binding(_) | AttributeValue::Compound(_) => {
            let value = resolve_value(&attribute.value, ctx)?;
            set_property(object, &attribute.name, value, ctx)
        }
        AttributeValue::Handler(handler) => {
            let signal = attribute.signal().unwrap_or(&attribute.name);
            connect(object, signal, handler, ctx)
        }
    }
}

/// Evaluate an attribute value without coercion
///
/// Literals evaluate to strings, and so do compounds, as the concatenated
/// text of their segments. Handler expressions have no value.
pub fn resolve_value(
    value: &AttributeValue,
    ctx: &InflationContext<'_>,
) -> Result<Value, BindingError> {
    match value {
        AttributeValue::Literal(text) => Ok(Value::String(text.clone())),
        AttributeValue::Binding(expr) => evaluate(expr, ctx),
        AttributeValue::Compound(segments) => {
            let mut text = String::new();
            for segment in segments {
                match segment {
                    Segment::Text(s) => text.push_str(s),
                    Segment::Expr(expr) => text.push_str(&evaluate(expr, ctx)?.to_string()),
                }
            }
            Ok(Value::String(text))
        }
        AttributeValue::Handler(handler) => Err(BindingError::TypeMismatch {
            property: handler.to_string(),
            expected: "value".to_string(),
            found: "handler".to_string(),
        }),
    }
}

/// Evaluate a binding expression against the scope and the host
///
/// The first path segment names an object in scope, or else a property of
/// the host. Later segments read properties of object values.
pub fn evaluate(expr: &Expression, ctx: &InflationContext<'_>) -> Result<Value, BindingError> {
    let segments = match expr {
        Expression::Constant(value) => return Ok(value.clone()),
        Expression::Path(segments) => segments,
    };
    let system: &dyn HostTypeSystem = &*ctx.system;

    let (head, rest) = segments.split_first().ok_or_else(|| BindingError::UnresolvedReference {
        name: String::new(),
    })?;
    let mut current = match ctx.lookup(head) {
        Some(object) => Value::Object(Some(object)),
        None => {
            let host_type = system.type_of(ctx.host).unwrap_or_default();
            if system.property(&host_type, head).is_none() {
                return Err(BindingError::UnresolvedReference { name: head.clone() });
            }
            system.get_property(ctx.host, head)?
        }
    };

    for segment in rest {
        let object = match current {
            Value::Object(Some(object)) => object,
            other => {
                return Err(BindingError::TypeMismatch {
                    property: segment.clone(),
                    expected: "object".to_string(),
                    found: other.to_string(),
                })
            }
        };
        let type_name = system.type_of(object).unwrap_or_default();
        if system.property(&type_name, segment).is_none() {
            return Err(BindingError::UnknownProperty {
                type_name,
                property: segment.clone(),
            });
        }
        current = system.get_property(object, segment)?;
    }

    tracing::trace!(expression = %expr, value = %current, "evaluated binding");
    Ok(current)
}

fn set_property(
    object: ObjectId,
    name: &str,
    value: Value,
    ctx: &mut InflationContext<'_>,
) -> Result<(), BindingError> {
    let type_name = ctx.system.type_of(object).unwrap_or_default();
    let spec = ctx
        .system
        .property(&type_name, name)
        .ok_or_else(|| BindingError::UnknownProperty {
            type_name: type_name.clone(),
            property: name.to_string(),
        })?;
    let found = format!("{} '{}'", value.kind(), value);
    let value =
        coerce(&*ctx.system, value, &spec.value_type).ok_or_else(|| BindingError::TypeMismatch {
            property: name.to_string(),
            expected: spec.value_type.to_string(),
            found,
        })?;

    tracing::trace!(object = %object, property = name, value = %value, "set property");
    ctx.system.set_property(object, name, value)?;
    Ok(())
}

fn connect(
    object: ObjectId,
    signal: &str,
    handler: &HandlerExpr,
    ctx: &mut InflationContext<'_>,
) -> Result<(), BindingError> {
    let type_name = ctx.system.type_of(object).unwrap_or_default();
    if ctx.system.signal(&type_name, signal).is_none() {
        return Err(BindingError::UnknownSignal {
            type_name,
            signal: signal.to_string(),
        });
    }

    let host = ctx.host;
    let (kind, params) = match handler {
        HandlerExpr::Method { name, .. } => {
            if !ctx.system.has_handler(host, name) {
                return Err(BindingError::UnknownHandler { handler: name.clone() });
            }
            (HandlerKind::Method(name.clone()), None)
        }
        HandlerExpr::Emit { signal: target, args } => {
            let host_type = ctx.system.type_of(host).unwrap_or_default();
            let spec = ctx
                .system
                .signal(&host_type, target)
                .ok_or_else(|| BindingError::UnknownSignal {
                    type_name: host_type,
                    signal: target.clone(),
                })?;
            if spec.params.len() != args.len() {
                return Err(BindingError::ArgumentCount {
                    signal: target.clone(),
                    expected: spec.params.len(),
                    found: args.len(),
                });
            }
            (HandlerKind::Emit(target.clone()), Some(spec.params))
        }
    };

    let mut bound_args = Vec::with_capacity(handler.args().len());
    for (i, arg) in handler.args().iter().enumerate() {
        let value = evaluate(arg, ctx)?;
        let value = match params.as_ref().and_then(|p| p.get(i)) {
            Some(param) => {
                let found = value.to_string();
                coerce(&*ctx.system, value, param).ok_or_else(|| BindingError::TypeMismatch {
                    property: format!("{} argument {}", handler, i + 1),
                    expected: param.to_string(),
                    found,
                })?
            }
            None => value,
        };
        bound_args.push(value);
    }

    tracing::trace!(object = %object, signal, handler = %handler, "connect signal");
    ctx.system.connect_signal(
        object,
        signal,
        Handler {
            target: host,
            kind,
            bound_args,
        },
    )?;
    Ok(())
}

/// Convert `value` to `target`, or `None` when no conversion applies
///
/// Strings parse into booleans (`true/false/yes/no/1/0`), integers
/// (decimal or `0x` hex), floats and enum nicks. Integers widen to floats;
/// scalars format into strings. Objects pass only when their type is-a the
/// required type.
pub fn coerce(system: &dyn HostTypeSystem, value: Value, target: &ValueType) -> Option<Value> {
    match (target, value) {
        (ValueType::Bool, Value::Bool(b)) => Some(Value::Bool(b)),
        (ValueType::Bool, Value::String(s)) => parse_bool(&s).map(Value::Bool),

        (ValueType::Int, Value::Int(n)) => Some(Value::Int(n)),
        (ValueType::Int, Value::String(s)) => parse_int(&s).map(Value::Int),

        (ValueType::Float, Value::Float(n)) => Some(Value::Float(n)),
        (ValueType::Float, Value::Int(n)) => Some(Value::Float(n as f64)),
        (ValueType::Float, Value::String(s)) => s.trim().parse::<f64>().ok().map(Value::Float),

        (ValueType::String, Value::String(s)) => Some(Value::String(s)),
        (ValueType::String, scalar @ (Value::Bool(_) | Value::Int(_) | Value::Float(_))) => {
            Some(Value::String(scalar.to_string()))
        }

        (ValueType::Enum(nicks), Value::String(s)) => {
            nicks.contains(&s).then_some(Value::String(s))
        }

        (ValueType::Object(_), Value::Object(None)) => Some(Value::Object(None)),
        (ValueType::Object(required), Value::Object(Some(id))) => {
            let actual = system.type_of(id)?;
            match required {
                Some(required) if !system.is_a(&actual, required) => None,
                _ => Some(Value::Object(Some(id))),
            }
        }

        _ => None,
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let s = s.trim();
    let (negative, digits) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s),
    };
    // Both std parsers accept a sign of their own
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let magnitude = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) if hex.starts_with(|c: char| c.is_ascii_hexdigit()) => {
            i64::from_str_radix(hex, 16).ok()?
        }
        Some(_) => return None,
        None => digits.parse::<i64>().ok()?,
    };
    if negative {
        magnitude.checked_neg()
    } else {
        Some(magnitude)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BindingPolicy;
    use crate::directive::DirectiveRegistry;
    use crate::host::{HostCall, MemoryTypeSystem, TypeSpec};
    use crate::parser::parse_str;
    use pretty_assertions::assert_eq;

    fn system() -> MemoryTypeSystem {
        MemoryTypeSystem::new()
            .with_type(
                TypeSpec::new("Widget")
                    .property("visible", ValueType::Bool)
                    .property("width", ValueType::Float)
                    .property("label", ValueType::String)
                    .property("count", ValueType::Int)
                    .property(
                        "align",
                        ValueType::Enum(vec!["start".to_string(), "end".to_string()]),
                    )
                    .property("buddy", ValueType::Object(Some("Widget".to_string())))
                    .signal("clicked", vec![])
                    .signal("reset", vec![ValueType::Object(None)])
                    .method("on_reset"),
            )
            .and_then(|s| s.with_type(TypeSpec::new("Other")))
            .expect("types")
    }

    #[test]
    fn test_coerce_strings() {
        let system = system();
        assert_eq!(
            coerce(&system, Value::String("yes".to_string()), &ValueType::Bool),
            Some(Value::Bool(true))
        );
        assert_eq!(
            coerce(&system, Value::String("0x1f".to_string()), &ValueType::Int),
            Some(Value::Int(31))
        );
        assert_eq!(
            coerce(&system, Value::String("-12".to_string()), &ValueType::Int),
            Some(Value::Int(-12))
        );
        assert_eq!(
            coerce(&system, Value::String("2.5".to_string()), &ValueType::Float),
            Some(Value::Float(2.5))
        );
        assert_eq!(coerce(&system, Value::String("x".to_string()), &ValueType::Int), None);
    }

    #[test]
    fn test_coerce_rejects_repeated_signs() {
        let system = system();
        for text in ["--5", "-+5", "+5", "-0x-5", "- 5"] {
            assert_eq!(
                coerce(&system, Value::String(text.to_string()), &ValueType::Int),
                None,
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_coerce_widening_and_formatting() {
        let system = system();
        assert_eq!(coerce(&system, Value::Int(3), &ValueType::Float), Some(Value::Float(3.0)));
        assert_eq!(
            coerce(&system, Value::Int(3), &ValueType::String),
            Some(Value::String("3".to_string()))
        );
        assert_eq!(coerce(&system, Value::Float(1.5), &ValueType::Int), None);
    }

    #[test]
    fn test_coerce_enum_and_objects() {
        let mut system = system();
        let align = ValueType::Enum(vec!["start".to_string(), "end".to_string()]);
        assert!(coerce(&system, Value::String("end".to_string()), &align).is_some());
        assert!(coerce(&system, Value::String("middle".to_string()), &align).is_none());

        let widget = system.instantiate("Widget").expect("widget");
        let other = system.instantiate("Other").expect("other");
        let target = ValueType::Object(Some("Widget".to_string()));
        assert!(coerce(&system, Value::Object(Some(widget)), &target).is_some());
        assert!(coerce(&system, Value::Object(Some(other)), &target).is_none());
        assert!(coerce(&system, Value::Object(None), &target).is_some());
    }

    fn bind(source: &str) -> (MemoryTypeSystem, ObjectId, ObjectId, Result<(), BindingError>) {
        let template = parse_str(source).expect("Should parse");
        let mut system = system();
        let host = system.instantiate("Widget").expect("host");
        let object = system.instantiate("Widget").expect("object");
        system.clear_calls();
        let registry = DirectiveRegistry::new();
        let result = {
            let mut ctx = InflationContext::new(
                &mut system,
                host,
                &registry,
                &template,
                BindingPolicy::Abort,
            );
            ctx.declare("self", object);
            template
                .root()
                .attributes()
                .try_for_each(|attr| bind_attribute(object, attr, &mut ctx))
        };
        (system, host, object, result)
    }

    #[test]
    fn test_literal_sets_coerced_property() {
        let (system, _, object, result) = bind(r#"<Widget count="0x10" visible="yes"/>"#);
        assert_eq!(result, Ok(()));
        assert_eq!(
            system.calls(),
            &[
                HostCall::SetProperty {
                    object,
                    name: "count".to_string(),
                    value: Value::Int(16)
                },
                HostCall::SetProperty {
                    object,
                    name: "visible".to_string(),
                    value: Value::Bool(true)
                },
            ]
        );
    }

    #[test]
    fn test_binding_reads_host_and_scope() {
        let (system, _, object, result) = bind(r#"<Widget label="{count}" buddy="{self}"/>"#);
        assert_eq!(result, Ok(()));
        assert_eq!(system.get_property(object, "label"), Ok(Value::String("0".to_string())));
        assert_eq!(system.get_property(object, "buddy"), Ok(Value::Object(Some(object))));
    }

    #[test]
    fn test_dotted_path() {
        let (system, _, object, result) =
            bind(r#"<Widget buddy="{self}" label="{self.buddy.visible}"/>"#);
        assert_eq!(result, Ok(()));
        assert_eq!(system.get_property(object, "label"), Ok(Value::String("false".to_string())));
    }

    #[test]
    fn test_compound_concatenates_then_coerces() {
        let (system, _, object, result) =
            bind(r#"<Widget count="{1}0" label="{self.count} items, visible={self.visible}"/>"#);
        assert_eq!(result, Ok(()));
        assert_eq!(system.get_property(object, "count"), Ok(Value::Int(10)));
        assert_eq!(
            system.get_property(object, "label"),
            Ok(Value::String("10 items, visible=false".to_string()))
        );

        let (.., result) = bind(r#"<Widget label="at {missing}"/>"#);
        assert!(matches!(result, Err(BindingError::UnresolvedReference { .. })));
    }

    #[test]
    fn test_binding_errors() {
        let (.., result) = bind(r#"<Widget colour="red"/>"#);
        assert!(matches!(result, Err(BindingError::UnknownProperty { .. })));

        let (.., result) = bind(r#"<Widget count="many"/>"#);
        assert!(matches!(result, Err(BindingError::TypeMismatch { .. })));

        let (.., result) = bind(r#"<Widget label="{missing}"/>"#);
        assert_eq!(
            result,
            Err(BindingError::UnresolvedReference {
                name: "missing".to_string()
            })
        );
    }

    #[test]
    fn test_method_handler_connects_once() {
        let (system, host, object, result) = bind(r#"<Widget on-clicked="on_reset"/>"#);
        assert_eq!(result, Ok(()));
        assert_eq!(
            system.calls(),
            &[HostCall::ConnectSignal {
                object,
                signal: "clicked".to_string(),
                handler: Handler {
                    target: host,
                    kind: HandlerKind::Method("on_reset".to_string()),
                    bound_args: vec![]
                }
            }]
        );
    }

    #[test]
    fn test_emit_handler_binds_arguments() {
        let (system, _, object, result) = bind(r#"<Widget on-clicked="emit reset(self)"/>"#);
        assert_eq!(result, Ok(()));
        let handlers = system.connections(object, "clicked").expect("connections");
        assert_eq!(handlers.len(), 1);
        assert_eq!(handlers[0].bound_args, vec![Value::Object(Some(object))]);
    }

    #[test]
    fn test_handler_errors() {
        let (.., result) = bind(r#"<Widget on-pressed="on_reset"/>"#);
        assert!(matches!(result, Err(BindingError::UnknownSignal { .. })));

        let (.., result) = bind(r#"<Widget on-clicked="on_missing"/>"#);
        assert_eq!(
            result,
            Err(BindingError::UnknownHandler {
                handler: "on_missing".to_string()
            })
        );

        let (.., result) = bind(r#"<Widget on-clicked="emit reset"/>"#);
        assert!(matches!(result, Err(BindingError::ArgumentCount { .. })));

        let (.., result) = bind(r#"<Widget on-clicked="emit nothing"/>"#);
        assert!(matches!(result, Err(BindingError::UnknownSignal { .. })));
    }
}
