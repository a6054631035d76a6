//! Depth-first template walk
//!
//! Each node goes through six steps:
//!
//! 1. resolve directive annotations and auto-attach directives
//! 2. ask every directive whether to process the node
//! 3. instantiate the node's type (the root merges into the host instead)
//! 4. bind attributes, letting directives claim them first
//! 5. inflate children in document order
//! 6. attach to the parent through directives, else `append_child`
//!
//! A vetoed node leaves no trace: no host calls, no scope entry and no
//! sibling index.
//!
//! When re-inflating, each node may come with the [`Fragment`] an earlier pass
//! left for it. A child of the same type is reused: it is not instantiated
//! again, its handlers stay connected and step 6 becomes
//! `update_attachment`. Fresh children under a reused parent are moved into
//! document position and earlier children without a counterpart are removed.

use super::{BindingError, Fragment, InflateError, InflationContext};
use crate::binder;
use crate::config::BindingPolicy;
use crate::directive::{
    Attachment, DirectiveError, DirectiveInstance, NodeContext, Processing, PropertyFormat,
    IMPLICIT_PROPERTY,
};
use crate::host::{HostError, ObjectId};
use crate::template::{AttributeValue, TemplateNode};

/// Directive instances attached to one node, in hook order
type ActiveDirectives = Vec<(String, Box<dyn DirectiveInstance>)>;

/// Inflate the template root into the host
///
/// A vetoed root produces an empty fragment and detaches whatever an earlier
/// pass attached to the host.
pub fn inflate_root(
    ctx: &mut InflationContext<'_>,
    root: &TemplateNode,
    previous: Option<&Fragment>,
) -> Result<Fragment, InflateError> {
    if let Some(fragment) = inflate_node(ctx, root, None, None, previous)? {
        return Ok(fragment);
    }
    for child in previous.into_iter().flat_map(Fragment::children) {
        ctx.system.remove_child(ctx.host, child.object())?;
        ctx.removed += 1;
    }
    Ok(Fragment::new(ctx.host))
}

/// Inflate `node` below `parent`, or merge it into the host when `parent` is `None`
///
/// Returns what the node became, or `None` when a directive vetoed it.
/// Errors carry the node path and source location.
pub fn inflate_node(
    ctx: &mut InflationContext<'_>,
    node: &TemplateNode,
    parent: Option<ObjectId>,
    index: Option<usize>,
    previous: Option<&Fragment>,
) -> Result<Option<Fragment>, InflateError> {
    ctx.enter(node, index);
    let result = process(ctx, node, parent, previous).map_err(|err| ctx.at_node(node, None, err));
    ctx.leave();
    result
}

fn process(
    ctx: &mut InflationContext<'_>,
    node: &TemplateNode,
    parent: Option<ObjectId>,
    previous: Option<&Fragment>,
) -> Result<Option<Fragment>, InflateError> {
    let parent_type = parent.and_then(|p| ctx.system.type_of(p));
    let node_ctx = NodeContext {
        node,
        parent,
        parent_type: parent_type.as_deref(),
    };

    // 1. Directives
    let mut active = resolve_directives(ctx, node, &node_ctx)?;

    // 2. Veto
    for (id, instance) in active.iter_mut() {
        if instance.should_process(&*ctx.system, &node_ctx) == Processing::Veto {
            tracing::debug!(path = %ctx.path(), directive = %id, "node vetoed");
            return Ok(None);
        }
    }

    // 3. Instantiate
    let retained = match parent {
        None => previous,
        Some(_) => previous
            .filter(|p| ctx.system.type_of(p.object()).as_deref() == Some(node.type_name())),
    };
    let object = match (parent, retained) {
        (None, _) => merge_root(ctx, node)?,
        (Some(_), Some(retained)) => {
            ctx.reused += 1;
            tracing::debug!(path = %ctx.path(), object = %retained.object(), "reused");
            retained.object()
        }
        (Some(_), None) => {
            if !ctx.system.has_type(node.type_name()) {
                return Err(InflateError::UnknownType(node.type_name().to_string()));
            }
            let object = ctx.system.instantiate(node.type_name())?;
            ctx.created += 1;
            tracing::debug!(path = %ctx.path(), object = %object, "instantiated");
            object
        }
    };
    if let Some(name) = node.name() {
        ctx.declare(name, object);
    }

    // 4. Attributes
    for attribute in node.attributes() {
        let claimed = match attribute.value {
            // Connected by the pass that created the object
            AttributeValue::Handler(_) if retained.is_some() => continue,
            AttributeValue::Handler(_) => None,
            _ => active.iter().position(|(_, instance)| {
                instance.claims_attribute(&*ctx.system, &node_ctx, attribute)
            }),
        };

        let result = match claimed {
            Some(i) => binder::resolve_value(&attribute.value, ctx).and_then(|value| {
                let (id, instance) = &mut active[i];
                instance
                    .bind_claimed(&mut *ctx.system, &node_ctx, object, attribute, value)
                    .map_err(|e| BindingError::Directive {
                        directive: id.clone(),
                        message: e.to_string(),
                    })
            }),
            None => binder::bind_attribute(object, attribute, ctx),
        };

        if let Err(err) = result {
            let located = Some((attribute.name.as_str(), attribute.span.clone()));
            let err = ctx.at_node(node, located, err.into());
            match ctx.policy {
                BindingPolicy::Abort => return Err(err),
                BindingPolicy::Record => {
                    tracing::warn!(error = %err, "binding failed, continuing");
                    ctx.errors.push(err);
                }
            }
        }
    }

    // 5. Children
    let mut fragment = Fragment::new(object);
    let mut index = 0;
    let mut last = None;
    for (position, child) in node.children().iter().enumerate() {
        let before = retained.and_then(|r| r.child(position));
        let Some(inflated) = inflate_node(ctx, child, Some(object), Some(index), before)? else {
            continue;
        };
        index += 1;
        let child_object = inflated.object();
        if retained.is_some() && before.map(Fragment::object) != Some(child_object) {
            ctx.system.place_child(object, child_object, last)?;
            tracing::debug!(path = %ctx.path(), child = %child_object, "placed");
        }
        last = Some(child_object);
        fragment.insert(position, inflated);
    }
    if let Some(retained) = retained {
        for (position, leftover) in retained.entries() {
            if fragment.child(position).map(Fragment::object) != Some(leftover.object()) {
                ctx.system.remove_child(object, leftover.object())?;
                ctx.removed += 1;
                tracing::debug!(path = %ctx.path(), child = %leftover.object(), "removed");
            }
        }
    }

    // 6. Attach
    if let (Some(parent), Some(_)) = (parent, retained) {
        for (id, instance) in active.iter_mut() {
            let attachment = instance
                .update_attachment(&mut *ctx.system, parent, object)
                .map_err(|e| directive_failure(id, e))?;
            if attachment == Attachment::Handled {
                break;
            }
        }
    } else if let Some(parent) = parent {
        let mut handled = false;
        for (id, instance) in active.iter_mut() {
            let attachment = instance
                .attach(&mut *ctx.system, parent, object)
                .map_err(|e| directive_failure(id, e))?;
            if attachment == Attachment::Handled {
                tracing::debug!(path = %ctx.path(), directive = %id, "attached by directive");
                handled = true;
                break;
            }
        }
        if !handled {
            ctx.system.append_child(parent, object)?;
            tracing::debug!(path = %ctx.path(), parent = %parent, "appended");
        }
    }

    Ok(Some(fragment))
}

/// Step 1: annotated directives in first-appearance order, then auto-attach
fn resolve_directives(
    ctx: &mut InflationContext<'_>,
    node: &TemplateNode,
    node_ctx: &NodeContext<'_>,
) -> Result<ActiveDirectives, InflateError> {
    let registry = ctx.registry;
    let mut active: ActiveDirectives = Vec::new();

    for annotation in node.directives() {
        let attribute_name = format!("_{}", annotation.key);
        let located = |ctx: &InflationContext<'_>, err: InflateError| {
            ctx.at_node(node, Some((&attribute_name, annotation.span.clone())), err)
        };

        let Some((id, property)) = registry.resolve(&annotation.key) else {
            return Err(located(&*ctx, InflateError::UnknownDirective(annotation.key.clone())));
        };
        let Some(factory) = registry.lookup(&id) else {
            return Err(located(&*ctx, InflateError::UnknownDirective(id)));
        };

        let slot = match active.iter().position(|(a, _)| *a == id) {
            Some(slot) => slot,
            None => {
                active.push((id.clone(), factory.create_instance()));
                active.len() - 1
            }
        };

        let property = match (factory.property_format(), property) {
            (PropertyFormat::None, _) => continue,
            (PropertyFormat::ImplicitValue, property) => {
                property.unwrap_or_else(|| IMPLICIT_PROPERTY.to_string())
            }
            (PropertyFormat::Explicit, Some(property)) => property,
            (PropertyFormat::Explicit, None) => {
                return Err(located(
                    &*ctx,
                    InflateError::DirectiveProperty {
                        directive: id.clone(),
                        property: String::new(),
                        message: format!("expects a property, as in _{}.<property>", id),
                    },
                ))
            }
        };

        let value = binder::resolve_value(&annotation.value, ctx)
            .map_err(|e| located(&*ctx, e.into()))?;
        let (_, instance) = &mut active[slot];
        instance
            .set_property(&*ctx.system, &property, value)
            .map_err(|e| {
                located(
                    &*ctx,
                    InflateError::DirectiveProperty {
                        directive: id.clone(),
                        property: property.clone(),
                        message: e.to_string(),
                    },
                )
            })?;
    }

    for (id, factory) in registry.auto_attach() {
        if active.iter().any(|(a, _)| a == id) {
            continue;
        }
        if factory.should_auto_attach(&*ctx.system, node_ctx) {
            tracing::trace!(path = %ctx.path(), directive = id, "auto-attached");
            active.push((id.to_string(), factory.create_instance()));
        }
    }

    Ok(active)
}

/// Step 3 for the root: check the type and reuse the host object
fn merge_root(
    ctx: &mut InflationContext<'_>,
    node: &TemplateNode,
) -> Result<ObjectId, InflateError> {
    let root_type = node.type_name();
    if !ctx.system.has_type(root_type) {
        return Err(InflateError::UnknownType(root_type.to_string()));
    }
    let host_type = ctx
        .system
        .type_of(ctx.host)
        .ok_or(HostError::UnknownObject(ctx.host))?;
    if !ctx.system.is_a(&host_type, root_type) {
        return Err(InflateError::HostTypeMismatch {
            host_type,
            root_type: root_type.to_string(),
        });
    }
    Ok(ctx.host)
}

fn directive_failure(id: &str, err: DirectiveError) -> InflateError {
    match err {
        DirectiveError::Host(e) => InflateError::Host(e),
        other => InflateError::Directive {
            directive: id.to_string(),
            message: other.to_string(),
        },
    }
}
