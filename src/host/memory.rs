//! In-memory reference host
//!
//! [`MemoryTypeSystem`] implements [`HostTypeSystem`] over plain Rust data.
//! Every mutating call is appended to a call log so callers can check the
//! exact order of instantiation, binding and attachment.

use indexmap::IndexMap;

use super::{
    Handler, HandlerKind, HostError, HostTypeSystem, ObjectId, PropertySpec, SignalSpec, Value,
    ValueType,
};

/// Maximum nesting of signals re-emitted by `emit` handlers
pub const MAX_EMISSION_DEPTH: usize = 16;

/// Declaration of one host type
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSpec {
    name: String,
    parent: Option<String>,
    properties: IndexMap<String, PropertySpec>,
    defaults: IndexMap<String, Value>,
    signals: IndexMap<String, SignalSpec>,
    methods: Vec<String>,
    child_properties: IndexMap<String, PropertySpec>,
}

impl TypeSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        self.properties.insert(name.clone(), PropertySpec::new(name, value_type));
        self
    }

    pub fn read_only_property(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        let mut spec = PropertySpec::new(name.clone(), value_type);
        spec.writable = false;
        self.properties.insert(name, spec);
        self
    }

    /// Override the initial value of a property declared here or inherited
    pub fn default_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.defaults.insert(name.into(), value);
        self
    }

    pub fn signal(mut self, name: impl Into<String>, params: Vec<ValueType>) -> Self {
        let name = name.into();
        self.signals.insert(name.clone(), SignalSpec { name, params });
        self
    }

    pub fn method(mut self, name: impl Into<String>) -> Self {
        self.methods.push(name.into());
        self
    }

    pub fn child_property(mut self, name: impl Into<String>, value_type: ValueType) -> Self {
        let name = name.into();
        self.child_properties.insert(name.clone(), PropertySpec::new(name, value_type));
        self
    }
}

/// A mutating call made through [`HostTypeSystem`]
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Instantiate {
        type_name: String,
        object: ObjectId,
    },
    SetProperty {
        object: ObjectId,
        name: String,
        value: Value,
    },
    ConnectSignal {
        object: ObjectId,
        signal: String,
        handler: Handler,
    },
    AppendChild {
        parent: ObjectId,
        child: ObjectId,
    },
    SetChildProperty {
        parent: ObjectId,
        child: ObjectId,
        name: String,
        value: Value,
    },
    AddChildWithOptions {
        parent: ObjectId,
        child: ObjectId,
        options: Vec<(String, Value)>,
    },
    RemoveChild {
        parent: ObjectId,
        child: ObjectId,
    },
    PlaceChild {
        parent: ObjectId,
        child: ObjectId,
        after: Option<ObjectId>,
    },
}

/// A handler run caused by [`MemoryTypeSystem::emit`]
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    /// Object whose signal fired
    pub source: ObjectId,
    pub signal: String,
    pub target: ObjectId,
    pub kind: HandlerKind,
    /// Emitted arguments followed by the handler's bound arguments
    pub args: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Object {
    type_name: String,
    properties: IndexMap<String, Value>,
    children: Vec<ObjectId>,
    parent: Option<ObjectId>,
    /// Child properties set on this object by its parent
    packing: IndexMap<String, Value>,
    connections: Vec<(String, Handler)>,
}

#[derive(Debug, Default, Clone)]
pub struct MemoryTypeSystem {
    types: IndexMap<String, TypeSpec>,
    objects: Vec<Object>,
    calls: Vec<HostCall>,
    invocations: Vec<Invocation>,
}

impl MemoryTypeSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a type; its parent must already be defined
    pub fn define(&mut self, spec: TypeSpec) -> Result<(), HostError> {
        if self.types.contains_key(&spec.name) {
            return Err(HostError::DuplicateType(spec.name));
        }
        if let Some(parent) = &spec.parent {
            if !self.types.contains_key(parent) {
                return Err(HostError::UnknownType(parent.clone()));
            }
        }
        self.types.insert(spec.name.clone(), spec);
        Ok(())
    }

    pub fn with_type(mut self, spec: TypeSpec) -> Result<Self, HostError> {
        self.define(spec)?;
        Ok(self)
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }

    /// Mutating calls in the order they were made
    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn children(&self, object: ObjectId) -> Result<&[ObjectId], HostError> {
        Ok(&self.object(object)?.children)
    }

    pub fn parent_of(&self, object: ObjectId) -> Result<Option<ObjectId>, HostError> {
        Ok(self.object(object)?.parent)
    }

    /// Child property value stored on `child` by its container
    pub fn child_property_value(
        &self,
        child: ObjectId,
        name: &str,
    ) -> Result<Option<&Value>, HostError> {
        Ok(self.object(child)?.packing.get(name))
    }

    /// Handlers connected to `signal` on `object`
    pub fn connections(&self, object: ObjectId, signal: &str) -> Result<Vec<&Handler>, HostError> {
        Ok(self
            .object(object)?
            .connections
            .iter()
            .filter(|(s, _)| s == signal)
            .map(|(_, h)| h)
            .collect())
    }

    /// Fire `signal` on `object`, running every connected handler
    ///
    /// Method handlers are recorded as [`Invocation`]s. `emit` handlers fire
    /// their signal on the target with the bound arguments.
    pub fn emit(
        &mut self,
        object: ObjectId,
        signal: &str,
        args: Vec<Value>,
    ) -> Result<Vec<Invocation>, HostError> {
        let mut fired = Vec::new();
        self.emit_nested(object, signal, args, 0, &mut fired)?;
        self.invocations.extend(fired.iter().cloned());
        Ok(fired)
    }

    fn emit_nested(
        &self,
        object: ObjectId,
        signal: &str,
        args: Vec<Value>,
        depth: usize,
        fired: &mut Vec<Invocation>,
    ) -> Result<(), HostError> {
        if depth >= MAX_EMISSION_DEPTH {
            return Err(HostError::EmissionDepth(MAX_EMISSION_DEPTH));
        }
        let obj = self.object(object)?;
        let spec = self
            .find_signal(&obj.type_name, signal)
            .ok_or_else(|| HostError::UnknownSignal {
                type_name: obj.type_name.clone(),
                signal: signal.to_string(),
            })?;
        if spec.params.len() != args.len() {
            return Err(HostError::ArgumentCount {
                signal: signal.to_string(),
                expected: spec.params.len(),
                found: args.len(),
            });
        }

        for (_, handler) in obj.connections.iter().filter(|(s, _)| s == signal) {
            let mut call_args = args.clone();
            call_args.extend(handler.bound_args.iter().cloned());
            fired.push(Invocation {
                source: object,
                signal: signal.to_string(),
                target: handler.target,
                kind: handler.kind.clone(),
                args: call_args,
            });
            if let HandlerKind::Emit(next) = &handler.kind {
                let bound = handler.bound_args.clone();
                self.emit_nested(handler.target, next, bound, depth + 1, fired)?;
            }
        }
        Ok(())
    }

    /// Render the object tree below `root`, one object per line
    pub fn describe(&self, root: ObjectId) -> Result<String, HostError> {
        let mut out = String::new();
        self.describe_into(root, 0, &mut out)?;
        Ok(out)
    }

    fn describe_into(&self, id: ObjectId, depth: usize, out: &mut String) -> Result<(), HostError> {
        let obj = self.object(id)?;
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{}{}", obj.type_name, id));
        for (name, value) in &obj.properties {
            match value {
                Value::String(s) => out.push_str(&format!(" {}={:?}", name, s)),
                other => out.push_str(&format!(" {}={}", name, other)),
            }
        }
        if !obj.packing.is_empty() {
            let packing: Vec<String> =
                obj.packing.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            out.push_str(&format!(" [{}]", packing.join(", ")));
        }
        for (signal, handler) in &obj.connections {
            let target = match &handler.kind {
                HandlerKind::Method(m) => m.clone(),
                HandlerKind::Emit(s) => format!("emit {}", s),
            };
            out.push_str(&format!(" on-{}->{}", signal, target));
        }
        out.push('\n');
        for child in &obj.children {
            self.describe_into(*child, depth + 1, out)?;
        }
        Ok(())
    }

    fn object(&self, id: ObjectId) -> Result<&Object, HostError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.objects.get(i))
            .ok_or(HostError::UnknownObject(id))
    }

    fn object_mut(&mut self, id: ObjectId) -> Result<&mut Object, HostError> {
        usize::try_from(id.0)
            .ok()
            .and_then(|i| self.objects.get_mut(i))
            .ok_or(HostError::UnknownObject(id))
    }

    /// Type chain from `type_name` up to its root ancestor
    fn ancestry<'a>(&'a self, type_name: &str) -> impl Iterator<Item = &'a TypeSpec> + 'a {
        let mut next = self.types.get(type_name);
        std::iter::from_fn(move || {
            let current = next?;
            next = current.parent.as_deref().and_then(|p| self.types.get(p));
            Some(current)
        })
    }

    fn find_property(&self, type_name: &str, name: &str) -> Option<&PropertySpec> {
        self.ancestry(type_name).find_map(|t| t.properties.get(name))
    }

    fn find_signal(&self, type_name: &str, name: &str) -> Option<&SignalSpec> {
        self.ancestry(type_name).find_map(|t| t.signals.get(name))
    }

    fn find_child_property(&self, type_name: &str, name: &str) -> Option<&PropertySpec> {
        self.ancestry(type_name).find_map(|t| t.child_properties.get(name))
    }

    /// Exact type check; coercion is the binder's job
    fn check_value(
        &self,
        property: &str,
        expected: &ValueType,
        value: &Value,
    ) -> Result<(), HostError> {
        let ok = match (expected, value) {
            (ValueType::Bool, Value::Bool(_))
            | (ValueType::Int, Value::Int(_))
            | (ValueType::Float, Value::Float(_))
            | (ValueType::String, Value::String(_))
            | (ValueType::Object(_), Value::Object(None)) => true,
            (ValueType::Enum(nicks), Value::String(s)) => nicks.contains(s),
            (ValueType::Object(None), Value::Object(Some(id))) => self.object(*id).is_ok(),
            (ValueType::Object(Some(required)), Value::Object(Some(id))) => self
                .object(*id)
                .map(|o| self.is_a(&o.type_name, required))
                .unwrap_or(false),
            _ => false,
        };
        if ok {
            Ok(())
        } else {
            Err(HostError::InvalidValue {
                property: property.to_string(),
                expected: expected.clone(),
                found: value.clone(),
            })
        }
    }

    fn container_type(&self, parent: ObjectId) -> Result<String, HostError> {
        Ok(self.object(parent)?.type_name.clone())
    }
}

impl HostTypeSystem for MemoryTypeSystem {
    fn has_type(&self, type_name: &str) -> bool {
        self.types.contains_key(type_name)
    }

    fn is_a(&self, type_name: &str, ancestor: &str) -> bool {
        self.ancestry(type_name).any(|t| t.name == ancestor)
    }

    fn type_of(&self, object: ObjectId) -> Option<String> {
        self.object(object).ok().map(|o| o.type_name.clone())
    }

    fn instantiate(&mut self, type_name: &str) -> Result<ObjectId, HostError> {
        if !self.has_type(type_name) {
            return Err(HostError::UnknownType(type_name.to_string()));
        }

        // Explicit defaults only; everything else reads as the type's zero value
        let chain: Vec<&TypeSpec> = self.ancestry(type_name).collect();
        let mut properties = IndexMap::new();
        for spec in chain.iter().rev() {
            for (name, value) in &spec.defaults {
                if self.find_property(type_name, name).is_some() {
                    properties.insert(name.clone(), value.clone());
                }
            }
        }

        let id = ObjectId(self.objects.len() as u64);
        self.objects.push(Object {
            type_name: type_name.to_string(),
            properties,
            children: Vec::new(),
            parent: None,
            packing: IndexMap::new(),
            connections: Vec::new(),
        });
        self.calls.push(HostCall::Instantiate {
            type_name: type_name.to_string(),
            object: id,
        });
        Ok(id)
    }

    fn property(&self, type_name: &str, name: &str) -> Option<PropertySpec> {
        self.find_property(type_name, name).cloned()
    }

    fn signal(&self, type_name: &str, name: &str) -> Option<SignalSpec> {
        self.find_signal(type_name, name).cloned()
    }

    fn has_handler(&self, object: ObjectId, name: &str) -> bool {
        self.object(object)
            .map(|o| self.ancestry(&o.type_name).any(|t| t.methods.iter().any(|m| m == name)))
            .unwrap_or(false)
    }

    fn has_child_properties(&self, type_name: &str) -> bool {
        self.ancestry(type_name).any(|t| !t.child_properties.is_empty())
    }

    fn child_property(&self, container_type: &str, name: &str) -> Option<PropertySpec> {
        self.find_child_property(container_type, name).cloned()
    }

    fn get_property(&self, object: ObjectId, name: &str) -> Result<Value, HostError> {
        let obj = self.object(object)?;
        if let Some(value) = obj.properties.get(name) {
            return Ok(value.clone());
        }
        self.find_property(&obj.type_name, name)
            .map(|spec| spec.value_type.default_value())
            .ok_or_else(|| HostError::UnknownProperty {
                type_name: obj.type_name.clone(),
                property: name.to_string(),
            })
    }

    fn set_property(
        &mut self,
        object: ObjectId,
        name: &str,
        value: Value,
    ) -> Result<(), HostError> {
        let type_name = self.object(object)?.type_name.clone();
        let spec = self
            .find_property(&type_name, name)
            .ok_or_else(|| HostError::UnknownProperty {
                type_name: type_name.clone(),
                property: name.to_string(),
            })?;
        if !spec.writable {
            return Err(HostError::ReadOnlyProperty {
                type_name,
                property: name.to_string(),
            });
        }
        self.check_value(name, &spec.value_type, &value)?;

        self.calls.push(HostCall::SetProperty {
            object,
            name: name.to_string(),
            value: value.clone(),
        });
        self.object_mut(object)?.properties.insert(name.to_string(), value);
        Ok(())
    }

    fn connect_signal(
        &mut self,
        object: ObjectId,
        signal: &str,
        handler: Handler,
    ) -> Result<(), HostError> {
        let type_name = self.object(object)?.type_name.clone();
        if self.find_signal(&type_name, signal).is_none() {
            return Err(HostError::UnknownSignal {
                type_name,
                signal: signal.to_string(),
            });
        }
        self.object(handler.target)?;

        self.calls.push(HostCall::ConnectSignal {
            object,
            signal: signal.to_string(),
            handler: handler.clone(),
        });
        self.object_mut(object)?.connections.push((signal.to_string(), handler));
        Ok(())
    }

    fn append_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), HostError> {
        self.object(parent)?;
        if self.object(child)?.parent.is_some() {
            return Err(HostError::AlreadyParented(child));
        }
        self.calls.push(HostCall::AppendChild { parent, child });
        self.object_mut(parent)?.children.push(child);
        self.object_mut(child)?.parent = Some(parent);
        Ok(())
    }

    fn set_child_property(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        name: &str,
        value: Value,
    ) -> Result<(), HostError> {
        let container = self.container_type(parent)?;
        if self.object(child)?.parent != Some(parent) {
            return Err(HostError::NotAChild { parent, child });
        }
        let spec = self
            .find_child_property(&container, name)
            .ok_or_else(|| HostError::UnknownChildProperty {
                container: container.clone(),
                property: name.to_string(),
            })?;
        self.check_value(name, &spec.value_type, &value)?;

        self.calls.push(HostCall::SetChildProperty {
            parent,
            child,
            name: name.to_string(),
            value: value.clone(),
        });
        self.object_mut(child)?.packing.insert(name.to_string(), value);
        Ok(())
    }

    fn add_child_with_options(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        options: &[(String, Value)],
    ) -> Result<(), HostError> {
        let container = self.container_type(parent)?;
        if self.object(child)?.parent.is_some() {
            return Err(HostError::AlreadyParented(child));
        }
        // Validate everything before mutating so a failure leaves no partial attach
        for (name, value) in options {
            let spec = self
                .find_child_property(&container, name)
                .ok_or_else(|| HostError::UnknownChildProperty {
                    container: container.clone(),
                    property: name.clone(),
                })?;
            self.check_value(name, &spec.value_type, value)?;
        }

        self.calls.push(HostCall::AddChildWithOptions {
            parent,
            child,
            options: options.to_vec(),
        });
        self.object_mut(parent)?.children.push(child);
        let obj = self.object_mut(child)?;
        obj.parent = Some(parent);
        obj.packing.extend(options.iter().cloned());
        Ok(())
    }

    fn remove_child(&mut self, parent: ObjectId, child: ObjectId) -> Result<(), HostError> {
        if self.object(child)?.parent != Some(parent) {
            return Err(HostError::NotAChild { parent, child });
        }
        self.calls.push(HostCall::RemoveChild { parent, child });
        self.object_mut(parent)?.children.retain(|c| *c != child);
        let obj = self.object_mut(child)?;
        obj.parent = None;
        obj.packing.clear();
        Ok(())
    }

    fn place_child(
        &mut self,
        parent: ObjectId,
        child: ObjectId,
        after: Option<ObjectId>,
    ) -> Result<(), HostError> {
        for object in std::iter::once(child).chain(after) {
            if self.object(object)?.parent != Some(parent) {
                return Err(HostError::NotAChild { parent, child: object });
            }
        }
        self.calls.push(HostCall::PlaceChild { parent, child, after });
        let children = &mut self.object_mut(parent)?.children;
        children.retain(|c| *c != child);
        let at = after
            .and_then(|a| children.iter().position(|c| *c == a))
            .map_or(0, |i| i + 1);
        children.insert(at, child);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn widgets() -> MemoryTypeSystem {
        let mut system = MemoryTypeSystem::new();
        system
            .define(
                TypeSpec::new("Widget")
                    .property("visible", ValueType::Bool)
                    .read_only_property("depth", ValueType::Int)
                    .signal("destroy", vec![]),
            )
            .expect("define Widget");
        system
            .define(
                TypeSpec::new("Box")
                    .extends("Widget")
                    .property("spacing", ValueType::Int)
                    .child_property("expand", ValueType::Bool),
            )
            .expect("define Box");
        system
            .define(
                TypeSpec::new("Button")
                    .extends("Widget")
                    .property("label", ValueType::String)
                    .default_value("visible", Value::Bool(true))
                    .signal("clicked", vec![])
                    .method("on_reset"),
            )
            .expect("define Button");
        system
    }

    #[test]
    fn test_inheritance() {
        let system = widgets();
        assert!(system.is_a("Button", "Widget"));
        assert!(system.is_a("Button", "Button"));
        assert!(!system.is_a("Widget", "Button"));
        assert!(!system.is_a("Nope", "Widget"));
        assert!(system.property("Button", "visible").is_some());
        assert!(system.has_child_properties("Box"));
        assert!(!system.has_child_properties("Button"));
    }

    #[test]
    fn test_define_requires_parent() {
        let mut system = MemoryTypeSystem::new();
        assert_eq!(
            system.define(TypeSpec::new("Button").extends("Widget")),
            Err(HostError::UnknownType("Widget".to_string()))
        );
    }

    #[test]
    fn test_defaults_and_set_property() {
        let mut system = widgets();
        let button = system.instantiate("Button").expect("instantiate");
        assert_eq!(system.get_property(button, "visible"), Ok(Value::Bool(true)));
        assert_eq!(system.get_property(button, "label"), Ok(Value::String(String::new())));

        system
            .set_property(button, "label", Value::String("Reset".to_string()))
            .expect("set label");
        assert_eq!(system.get_property(button, "label"), Ok(Value::String("Reset".to_string())));
        assert!(matches!(
            system.set_property(button, "label", Value::Int(1)),
            Err(HostError::InvalidValue { .. })
        ));
        assert!(matches!(
            system.set_property(button, "depth", Value::Int(1)),
            Err(HostError::ReadOnlyProperty { .. })
        ));
    }

    #[test]
    fn test_call_log_order() {
        let mut system = widgets();
        let parent = system.instantiate("Box").expect("instantiate");
        let child = system.instantiate("Button").expect("instantiate");
        system.append_child(parent, child).expect("append");
        system
            .set_child_property(parent, child, "expand", Value::Bool(true))
            .expect("child property");

        assert_eq!(
            system.calls(),
            &[
                HostCall::Instantiate {
                    type_name: "Box".to_string(),
                    object: parent
                },
                HostCall::Instantiate {
                    type_name: "Button".to_string(),
                    object: child
                },
                HostCall::AppendChild { parent, child },
                HostCall::SetChildProperty {
                    parent,
                    child,
                    name: "expand".to_string(),
                    value: Value::Bool(true)
                },
            ]
        );
    }

    #[test]
    fn test_add_child_with_options_is_atomic() {
        let mut system = widgets();
        let parent = system.instantiate("Box").expect("instantiate");
        let child = system.instantiate("Button").expect("instantiate");
        let bad = [("fill".to_string(), Value::Bool(true))];
        assert!(system.add_child_with_options(parent, child, &bad).is_err());
        assert_eq!(system.children(parent), Ok(&[][..]));

        let good = [("expand".to_string(), Value::Bool(true))];
        system.add_child_with_options(parent, child, &good).expect("add");
        assert_eq!(system.child_property_value(child, "expand"), Ok(Some(&Value::Bool(true))));
    }

    #[test]
    fn test_place_and_remove_child() {
        let mut system = widgets();
        let parent = system.instantiate("Box").expect("instantiate");
        let a = system.instantiate("Button").expect("instantiate");
        let b = system.instantiate("Button").expect("instantiate");
        let c = system.instantiate("Button").expect("instantiate");
        for child in [a, b, c] {
            system.append_child(parent, child).expect("append");
        }

        system.place_child(parent, c, Some(a)).expect("place");
        assert_eq!(system.children(parent), Ok(&[a, c, b][..]));
        system.place_child(parent, b, None).expect("place");
        assert_eq!(system.children(parent), Ok(&[b, a, c][..]));

        system
            .set_child_property(parent, a, "expand", Value::Bool(true))
            .expect("child property");
        system.remove_child(parent, a).expect("remove");
        assert_eq!(system.children(parent), Ok(&[b, c][..]));
        assert_eq!(system.parent_of(a), Ok(None));
        assert_eq!(system.child_property_value(a, "expand"), Ok(None));
        assert_eq!(
            system.remove_child(parent, a),
            Err(HostError::NotAChild { parent, child: a })
        );
        assert_eq!(
            system.place_child(parent, b, Some(a)),
            Err(HostError::NotAChild { parent, child: a })
        );

        // A removed child can be attached again
        system.append_child(parent, a).expect("append");
        assert_eq!(system.children(parent), Ok(&[b, c, a][..]));
    }

    #[test]
    fn test_emit_runs_handlers() {
        let mut system = widgets();
        let host = system.instantiate("Button").expect("instantiate");
        let button = system.instantiate("Button").expect("instantiate");
        system
            .connect_signal(
                button,
                "clicked",
                Handler {
                    target: host,
                    kind: HandlerKind::Emit("destroy".to_string()),
                    bound_args: vec![],
                },
            )
            .expect("connect");
        system
            .connect_signal(
                host,
                "destroy",
                Handler {
                    target: host,
                    kind: HandlerKind::Method("on_reset".to_string()),
                    bound_args: vec![Value::Object(Some(button))],
                },
            )
            .expect("connect");

        let fired = system.emit(button, "clicked", vec![]).expect("emit");
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[1].kind, HandlerKind::Method("on_reset".to_string()));
        assert_eq!(fired[1].args, vec![Value::Object(Some(button))]);
        assert_eq!(system.invocations().len(), 2);
    }

    #[test]
    fn test_emit_depth_guard() {
        let mut system = widgets();
        let button = system.instantiate("Button").expect("instantiate");
        system
            .connect_signal(
                button,
                "clicked",
                Handler {
                    target: button,
                    kind: HandlerKind::Emit("clicked".to_string()),
                    bound_args: vec![],
                },
            )
            .expect("connect");
        assert_eq!(
            system.emit(button, "clicked", vec![]),
            Err(HostError::EmissionDepth(MAX_EMISSION_DEPTH))
        );
        assert!(system.invocations().is_empty());
    }

    #[test]
    fn test_describe_tree() {
        let mut system = widgets();
        let parent = system.instantiate("Box").expect("instantiate");
        let child = system.instantiate("Button").expect("instantiate");
        system
            .set_property(child, "label", Value::String("Reset".to_string()))
            .expect("set");
        system
            .add_child_with_options(parent, child, &[("expand".to_string(), Value::Bool(true))])
            .expect("add");

        assert_eq!(
            system.describe(parent).expect("describe"),
            "Box#0\n  Button#1 visible=true label=\"Reset\" [expand=true]\n"
        );
    }
}
