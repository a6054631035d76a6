//! Registry mapping directive ids to factories

use std::fmt;
use std::sync::Arc;

use bitflags::bitflags;
use indexmap::IndexMap;
use serde::Deserialize;

use super::{ChildPropertyDirective, ConditionalDirective, DirectiveFactory, PackingDirective};
use crate::inflator::InflateError;

bitflags! {
    /// Per-registration options
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct DirectiveFlags: u32 {
        /// Only attach when a node names the directive explicitly
        const NO_AUTO_ATTACH = 1 << 0;
    }
}

/// What happens when an id is registered twice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Fail with [`InflateError::DuplicateDirective`]
    #[default]
    Reject,
    /// Replace the factory, keeping the original registration position
    Replace,
}

#[derive(Clone)]
struct Registration {
    factory: Arc<dyn DirectiveFactory>,
    flags: DirectiveFlags,
}

/// Caller-owned map from directive id to factory
///
/// Registration order is preserved and is the order in which auto-attach
/// factories are consulted.
#[derive(Clone, Default)]
pub struct DirectiveRegistry {
    entries: IndexMap<String, Registration>,
    policy: DuplicatePolicy,
    /// Container type of the built-in `pack`, while it is still registered
    pack_container: Option<String>,
}

impl fmt::Debug for DirectiveRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DirectiveRegistry")
            .field("ids", &self.entries.keys().collect::<Vec<_>>())
            .field("policy", &self.policy)
            .field("pack_container", &self.pack_container)
            .finish()
    }
}

impl DirectiveRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding `if`, `pack` (for `container_type`) and `child-property`
    pub fn with_builtins(container_type: &str) -> Self {
        let mut registry = Self::new();
        let builtins: [Arc<dyn DirectiveFactory>; 3] = [
            Arc::new(ConditionalDirective),
            Arc::new(PackingDirective::new(container_type)),
            Arc::new(ChildPropertyDirective),
        ];
        for factory in builtins {
            registry.insert(factory.name().to_string(), factory, DirectiveFlags::empty());
        }
        registry.pack_container = Some(container_type.to_string());
        registry
    }

    /// Container type the built-in `pack` auto-attaches under
    ///
    /// `None` once `pack` was replaced by another factory or never registered.
    pub fn pack_container(&self) -> Option<&str> {
        self.pack_container.as_deref()
    }

    /// Retarget the built-in `pack` to `container_type`
    ///
    /// Keeps its flags and registration position. Returns `false` and changes
    /// nothing when the registry holds no built-in `pack`.
    pub fn set_pack_container(&mut self, container_type: &str) -> bool {
        if self.pack_container.is_none() {
            return false;
        }
        let Some(registration) = self.entries.get_mut("pack") else {
            return false;
        };
        registration.factory = Arc::new(PackingDirective::new(container_type));
        self.pack_container = Some(container_type.to_string());
        tracing::trace!(container_type, "retargeted pack");
        true
    }

    pub fn with_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: DuplicatePolicy) {
        self.policy = policy;
    }

    pub fn register(
        &mut self,
        id: &str,
        factory: Arc<dyn DirectiveFactory>,
    ) -> Result<(), InflateError> {
        self.register_with_flags(id, factory, DirectiveFlags::empty())
    }

    pub fn register_with_flags(
        &mut self,
        id: &str,
        factory: Arc<dyn DirectiveFactory>,
        flags: DirectiveFlags,
    ) -> Result<(), InflateError> {
        if self.entries.contains_key(id) && self.policy == DuplicatePolicy::Reject {
            return Err(InflateError::DuplicateDirective(id.to_string()));
        }
        self.insert(id.to_string(), factory, flags);
        Ok(())
    }

    /// Register factories under their own names, all with `flags`
    ///
    /// Stops at the first rejected duplicate; earlier factories stay registered.
    pub fn add_directives<I>(
        &mut self,
        flags: DirectiveFlags,
        factories: I,
    ) -> Result<(), InflateError>
    where
        I: IntoIterator<Item = Arc<dyn DirectiveFactory>>,
    {
        for factory in factories {
            let id = factory.name().to_string();
            self.register_with_flags(&id, factory, flags)?;
        }
        Ok(())
    }

    fn insert(&mut self, id: String, factory: Arc<dyn DirectiveFactory>, flags: DirectiveFlags) {
        tracing::trace!(directive = %id, ?flags, "registered directive");
        if id == "pack" {
            self.pack_container = None;
        }
        self.entries.insert(id, Registration { factory, flags });
    }

    pub fn lookup(&self, id: &str) -> Option<&Arc<dyn DirectiveFactory>> {
        self.entries.get(id).map(|r| &r.factory)
    }

    pub fn flags(&self, id: &str) -> Option<DirectiveFlags> {
        self.entries.get(id).map(|r| r.flags)
    }

    /// Split an annotation key into directive id and optional property
    ///
    /// The full key wins when registered; otherwise `pack.expand` resolves to
    /// id `pack`, property `expand`.
    pub fn resolve(&self, key: &str) -> Option<(String, Option<String>)> {
        if self.entries.contains_key(key) {
            return Some((key.to_string(), None));
        }
        let (id, property) = key.rsplit_once('.')?;
        if property.is_empty() || !self.entries.contains_key(id) {
            return None;
        }
        Some((id.to_string(), Some(property.to_string())))
    }

    /// Factories eligible for auto-attach, in registration order
    pub fn auto_attach(&self) -> impl Iterator<Item = (&str, &Arc<dyn DirectiveFactory>)> {
        self.entries
            .iter()
            .filter(|(_, r)| !r.flags.contains(DirectiveFlags::NO_AUTO_ATTACH))
            .map(|(id, r)| (id.as_str(), &r.factory))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::DirectiveInstance;

    struct Named(&'static str);

    struct Noop;
    impl DirectiveInstance for Noop {}

    impl DirectiveFactory for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn create_instance(&self) -> Box<dyn DirectiveInstance> {
            Box::new(Noop)
        }
    }

    #[test]
    fn test_builtins_order() {
        let registry = DirectiveRegistry::with_builtins("Box");
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["if", "pack", "child-property"]);
    }

    #[test]
    fn test_duplicate_rejected_by_default() {
        let mut registry = DirectiveRegistry::new();
        registry.register("x", Arc::new(Named("x"))).expect("first");
        assert_eq!(
            registry.register("x", Arc::new(Named("x"))),
            Err(InflateError::DuplicateDirective("x".to_string()))
        );
    }

    #[test]
    fn test_duplicate_replace_keeps_position() {
        let mut registry = DirectiveRegistry::new().with_policy(DuplicatePolicy::Replace);
        registry.register("a", Arc::new(Named("a"))).expect("a");
        registry.register("b", Arc::new(Named("b"))).expect("b");
        registry
            .register_with_flags("a", Arc::new(Named("a")), DirectiveFlags::NO_AUTO_ATTACH)
            .expect("replace");
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(registry.flags("a"), Some(DirectiveFlags::NO_AUTO_ATTACH));
    }

    #[test]
    fn test_pack_container_follows_builtin() {
        let mut registry = DirectiveRegistry::with_builtins("Box");
        assert_eq!(registry.pack_container(), Some("Box"));
        assert!(registry.set_pack_container("Grid"));
        assert_eq!(registry.pack_container(), Some("Grid"));
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["if", "pack", "child-property"]);

        registry.set_policy(DuplicatePolicy::Replace);
        registry.register("pack", Arc::new(Named("pack"))).expect("replace");
        assert_eq!(registry.pack_container(), None);
        assert!(!registry.set_pack_container("Box"));
        assert!(!DirectiveRegistry::new().set_pack_container("Box"));
    }

    #[test]
    fn test_resolve_dotted_keys() {
        let mut registry = DirectiveRegistry::new();
        registry.register("pack", Arc::new(Named("pack"))).expect("pack");
        registry.register("a.b", Arc::new(Named("a.b"))).expect("a.b");

        assert_eq!(registry.resolve("pack"), Some(("pack".to_string(), None)));
        assert_eq!(
            registry.resolve("pack.expand"),
            Some(("pack".to_string(), Some("expand".to_string())))
        );
        assert_eq!(registry.resolve("a.b"), Some(("a.b".to_string(), None)));
        assert_eq!(registry.resolve("pack."), None);
        assert_eq!(registry.resolve("nope.expand"), None);
    }

    #[test]
    fn test_no_auto_attach_flag() {
        let mut registry = DirectiveRegistry::new();
        let factories: Vec<Arc<dyn DirectiveFactory>> =
            vec![Arc::new(Named("a")), Arc::new(Named("b"))];
        registry
            .add_directives(DirectiveFlags::NO_AUTO_ATTACH, factories)
            .expect("add");
        registry.register("c", Arc::new(Named("c"))).expect("c");

        let auto: Vec<&str> = registry.auto_attach().map(|(id, _)| id).collect();
        assert_eq!(auto, vec!["c"]);
        assert!(registry.lookup("a").is_some());
    }
}
