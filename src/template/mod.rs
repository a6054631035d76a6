//! Compiled templates and their caching
//!
//! A [`Template`] is produced once by the parser and shared as
//! `Arc<Template>` by every inflation. The [`TemplateCache`] keeps one
//! compiled template per resource path.
//!
//! # Example
//!
//! ```rust
//! use markup_inflator::template::{StaticResources, TemplateCache};
//!
//! let mut resources = StaticResources::new();
//! resources.insert("ui/button.xml", r#"<Button label="Reset"/>"#);
//!
//! let cache = TemplateCache::new(resources);
//! let first = cache.get_or_load("ui/button.xml").unwrap();
//! let second = cache.get_or_load("ui/button.xml").unwrap();
//! assert!(std::sync::Arc::ptr_eq(&first, &second));
//! ```

mod cache;
mod node;

pub use cache::{
    CacheError, DirectoryResources, ResourceError, ResourceProvider, StaticResources, TemplateCache,
};
pub use node::{
    Attribute, AttributeValue, DirectiveAnnotation, Expression, HandlerExpr, Segment,
    SourceLocation, Spanned, Template, TemplateNode, DIRECTIVE_PREFIX, NAME_ATTRIBUTE,
    SIGNAL_PREFIX,
};
