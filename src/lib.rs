//! markup-inflator - compile declarative object-tree markup once, inflate it many times
//!
//! Markup describes a tree of host objects:
//!
//! ```xml
//! <Window title="Stopwatch">
//!   <Box name="box">
//!     <Label label="{elapsed}" _if="{timer-visible}"/>
//!     <Button label="Reset" expand="true" on-clicked="on_reset"/>
//!   </Box>
//! </Window>
//! ```
//!
//! The parser compiles it into an immutable [`Template`]. An [`Inflator`]
//! then turns the template into live objects of any host implementing
//! [`HostTypeSystem`]: nodes become instances, attributes become property
//! assignments or signal connections, and `_`-prefixed annotations hand the
//! node to directives such as `if` or `pack`.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use markup_inflator::host::{HostTypeSystem, MemoryTypeSystem, TypeSpec, ValueType};
//! use markup_inflator::{parse_str, InflatorConfig};
//!
//! let mut system = MemoryTypeSystem::new();
//! system.define(TypeSpec::new("Window").property("title", ValueType::String)).unwrap();
//!
//! let template = Arc::new(parse_str(r#"<Window title="Hello"/>"#).unwrap());
//! let config = InflatorConfig::default();
//! let inflator = template.create_inflator(config.builtin_registry());
//!
//! let host = system.instantiate("Window").unwrap();
//! inflator.inflate(&mut system, host).unwrap();
//! assert_eq!(system.describe(host).unwrap(), "Window#0 title=\"Hello\"\n");
//! ```

pub mod binder;
pub mod config;
pub mod directive;
pub mod error;
pub mod host;
pub mod inflator;
pub mod parser;
pub mod template;

pub use config::{BindingPolicy, ConfigError, InflatorConfig};
pub use directive::{
    DirectiveFactory, DirectiveFlags, DirectiveInstance, DirectiveRegistry, DuplicatePolicy,
};
pub use error::{ParseError, ParseErrorKind};
pub use host::{HostTypeSystem, ObjectId, Value};
pub use inflator::{BindingError, InflateError, Inflation, Inflator, ReactiveInflator};
pub use parser::{parse, parse_named, parse_str};
pub use template::{Template, TemplateCache};
