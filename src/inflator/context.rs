//! Per-call inflation state

use indexmap::IndexMap;

use super::{Fragment, InflateError, Inflation};
use crate::config::BindingPolicy;
use crate::directive::DirectiveRegistry;
use crate::error::Span;
use crate::host::{HostTypeSystem, ObjectId};
use crate::template::{Template, TemplateNode};

/// State for one `inflate()` call
///
/// Holds the host, the symbolic-name scope built up in pre-order and the
/// errors recorded under [`BindingPolicy::Record`]. Never shared between
/// inflations.
pub struct InflationContext<'a> {
    pub(crate) system: &'a mut dyn HostTypeSystem,
    pub(crate) host: ObjectId,
    pub(crate) registry: &'a DirectiveRegistry,
    pub(crate) template: &'a Template,
    pub(crate) policy: BindingPolicy,
    scope: IndexMap<String, ObjectId>,
    path: Vec<String>,
    pub(crate) errors: Vec<InflateError>,
    pub(crate) created: usize,
    pub(crate) reused: usize,
    pub(crate) removed: usize,
}

impl<'a> InflationContext<'a> {
    pub fn new(
        system: &'a mut dyn HostTypeSystem,
        host: ObjectId,
        registry: &'a DirectiveRegistry,
        template: &'a Template,
        policy: BindingPolicy,
    ) -> Self {
        Self {
            system,
            host,
            registry,
            template,
            policy,
            scope: IndexMap::new(),
            path: Vec::new(),
            errors: Vec::new(),
            created: 0,
            reused: 0,
            removed: 0,
        }
    }

    pub fn host(&self) -> ObjectId {
        self.host
    }

    pub fn system(&self) -> &dyn HostTypeSystem {
        &*self.system
    }

    /// Object declared under `name` so far
    pub fn lookup(&self, name: &str) -> Option<ObjectId> {
        self.scope.get(name).copied()
    }

    pub(crate) fn declare(&mut self, name: &str, object: ObjectId) {
        self.scope.insert(name.to_string(), object);
    }

    pub(crate) fn finish(self, retained: Fragment) -> Inflation {
        Inflation {
            host: self.host,
            named: self.scope,
            created: self.created,
            reused: self.reused,
            removed: self.removed,
            errors: self.errors,
            retained,
        }
    }

    /// Push the path segment for `node`: `Type#name`, `Type[index]` or `Type`
    pub(crate) fn enter(&mut self, node: &TemplateNode, index: Option<usize>) {
        let segment = match (node.name(), index) {
            (Some(name), _) => format!("{}#{}", node.type_name(), name),
            (None, Some(i)) => format!("{}[{}]", node.type_name(), i),
            (None, None) => node.type_name().to_string(),
        };
        self.path.push(segment);
    }

    pub(crate) fn leave(&mut self) {
        self.path.pop();
    }

    pub fn path(&self) -> String {
        self.path.join("/")
    }

    /// Attach node context to `err` unless it already has some
    pub(crate) fn at_node(
        &self,
        node: &TemplateNode,
        attribute: Option<(&str, Span)>,
        err: InflateError,
    ) -> InflateError {
        if matches!(err, InflateError::AtNode { .. }) {
            return err;
        }
        let (attribute, span) = match attribute {
            Some((name, span)) => (Some(name.to_string()), span),
            None => (None, node.span()),
        };
        InflateError::AtNode {
            path: self.path(),
            location: self.template.location(span.start),
            span,
            attribute,
            source: Box::new(err),
        }
    }
}
