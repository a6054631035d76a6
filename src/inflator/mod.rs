//! Inflation engine
//!
//! An [`Inflator`] pairs a shared [`Template`] with a directive registry and
//! a configuration. Every call to [`Inflator::inflate`] is independent: it
//! gets a fresh [`InflationContext`] and fresh directive instances, so one
//! inflator can serve any number of hosts from any number of threads.
//!
//! [`Inflator::update`] re-inflates into the host of an earlier [`Inflation`],
//! reusing the objects it created; [`ReactiveInflator`] wraps that for a
//! single host.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use markup_inflator::host::{HostTypeSystem, MemoryTypeSystem, TypeSpec, ValueType};
//! use markup_inflator::{parse_str, DirectiveRegistry};
//!
//! let mut system = MemoryTypeSystem::new();
//! system.define(TypeSpec::new("Window")).unwrap();
//! system.define(TypeSpec::new("Label").property("label", ValueType::String)).unwrap();
//!
//! let template = Arc::new(parse_str(r#"<Window><Label name="l" label="hi"/></Window>"#).unwrap());
//! let inflator = template.create_inflator(DirectiveRegistry::with_builtins("Box"));
//!
//! let host = system.instantiate("Window").unwrap();
//! let inflation = inflator.inflate(&mut system, host).unwrap();
//! assert_eq!(inflation.created, 1);
//! assert!(inflation.get("l").is_some());
//! ```

pub mod base;
mod context;
mod error;
mod fragment;
mod reactive;

use std::sync::Arc;

use indexmap::IndexMap;

use crate::config::InflatorConfig;
use crate::directive::{DirectiveFactory, DirectiveFlags, DirectiveRegistry};
use crate::host::{HostTypeSystem, ObjectId};
use crate::template::Template;

pub use context::InflationContext;
pub use error::{BindingError, InflateError};
pub use fragment::Fragment;
pub use reactive::ReactiveInflator;

/// Outcome of the latest successful pass over a host
#[derive(Debug, Clone, PartialEq)]
pub struct Inflation {
    pub host: ObjectId,
    /// Objects declared with `name="..."`, in document order
    pub named: IndexMap<String, ObjectId>,
    /// Number of objects instantiated, excluding the host
    pub created: usize,
    /// Number of objects kept from the previous pass
    pub reused: usize,
    /// Number of children detached because their node went away
    pub removed: usize,
    /// Binding errors recorded under
    /// [`BindingPolicy::Record`](crate::config::BindingPolicy::Record)
    pub errors: Vec<InflateError>,
    retained: Fragment,
}

impl Inflation {
    pub fn get(&self, name: &str) -> Option<ObjectId> {
        self.named.get(name).copied()
    }

    /// Objects this inflation is made of, rooted at the host
    pub fn fragment(&self) -> &Fragment {
        &self.retained
    }

    /// True when no binding error was recorded
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Inflator {
    template: Arc<Template>,
    registry: DirectiveRegistry,
    config: InflatorConfig,
}

impl Inflator {
    pub fn new(template: Arc<Template>, registry: DirectiveRegistry) -> Self {
        let mut config = InflatorConfig::default().with_duplicate_policy(registry.policy());
        if let Some(container_type) = registry.pack_container() {
            config = config.with_container_type(container_type);
        }
        Self {
            template,
            registry,
            config,
        }
    }

    /// Replace the configuration
    ///
    /// The registry adopts its duplicate policy, and a built-in `pack` is
    /// retargeted to its container type. A custom `pack` is left alone.
    pub fn with_config(mut self, config: InflatorConfig) -> Self {
        self.registry.set_policy(config.duplicate_policy);
        self.registry.set_pack_container(&config.container_type);
        self.config = config;
        self
    }

    pub fn template(&self) -> &Arc<Template> {
        &self.template
    }

    pub fn config(&self) -> &InflatorConfig {
        &self.config
    }

    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut DirectiveRegistry {
        &mut self.registry
    }

    pub fn add_directives<I>(
        &mut self,
        flags: DirectiveFlags,
        factories: I,
    ) -> Result<(), InflateError>
    where
        I: IntoIterator<Item = Arc<dyn DirectiveFactory>>,
    {
        self.registry.add_directives(flags, factories)
    }

    /// Inflate the template into `host`
    ///
    /// The root node merges into `host`, which must be an instance of the
    /// root type or a subtype. Children are created and attached below it.
    pub fn inflate(
        &self,
        system: &mut dyn HostTypeSystem,
        host: ObjectId,
    ) -> Result<Inflation, InflateError> {
        self.run(system, host, None)
    }

    /// Re-inflate into the host of an earlier inflation
    ///
    /// An object from `inflation` is reused when the template still yields a
    /// node of the same type at the same position. Reused objects get their
    /// properties and claimed attributes bound again and their child
    /// properties reapplied; their handlers stay as connected. Nodes that
    /// appear are created and moved into document order, and objects whose
    /// node went away are detached from their parent.
    ///
    /// On error `inflation` is left untouched, while the host may already
    /// hold part of the update.
    pub fn update(
        &self,
        system: &mut dyn HostTypeSystem,
        inflation: &mut Inflation,
    ) -> Result<(), InflateError> {
        let next = self.run(system, inflation.host, Some(&inflation.retained))?;
        *inflation = next;
        Ok(())
    }

    fn run(
        &self,
        system: &mut dyn HostTypeSystem,
        host: ObjectId,
        previous: Option<&Fragment>,
    ) -> Result<Inflation, InflateError> {
        let span = tracing::debug_span!(
            "inflate",
            template = self.template.resource().unwrap_or("<unknown>"),
            host = %host,
            update = previous.is_some()
        );
        let _guard = span.enter();

        let mut ctx = InflationContext::new(
            system,
            host,
            &self.registry,
            &self.template,
            self.config.binding_policy,
        );
        let retained = base::inflate_root(&mut ctx, self.template.root(), previous)?;

        let inflation = ctx.finish(retained);
        tracing::debug!(
            created = inflation.created,
            reused = inflation.reused,
            removed = inflation.removed,
            recorded = inflation.errors.len(),
            "inflation finished"
        );
        Ok(inflation)
    }
}
