//! Resource providers and the compiled template cache

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

use thiserror::Error;

use crate::error::ParseError;
use crate::parser::parse_named;
use crate::template::Template;

/// Errors raised by a [`ResourceProvider`]
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResourceError {
    #[error("resource not found: {path}")]
    ResourceNotFound { path: String },

    #[error("error reading resource {path}: {message}")]
    ReadFailed { path: String, message: String },
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("failed to compile template {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// Source of raw template bytes, keyed by resource path
pub trait ResourceProvider: Send + Sync {
    fn load(&self, path: &str) -> Result<Vec<u8>, ResourceError>;
}

/// In-memory resources, mostly for embedding and tests
#[derive(Debug, Default, Clone)]
pub struct StaticResources {
    entries: HashMap<String, Vec<u8>>,
}

impl StaticResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) {
        self.entries.insert(path.into(), contents.into());
    }

    pub fn with(mut self, path: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl ResourceProvider for StaticResources {
    fn load(&self, path: &str) -> Result<Vec<u8>, ResourceError> {
        self.entries
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::ResourceNotFound {
                path: path.to_string(),
            })
    }
}

/// Resources read from files below a base directory
#[derive(Debug, Clone)]
pub struct DirectoryResources {
    base_path: PathBuf,
}

impl DirectoryResources {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve a resource path relative to the base directory
    pub fn resolve_path(&self, relative: &str) -> PathBuf {
        self.base_path.join(relative)
    }
}

impl ResourceProvider for DirectoryResources {
    fn load(&self, path: &str) -> Result<Vec<u8>, ResourceError> {
        let full_path = self.resolve_path(path);
        std::fs::read(&full_path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ResourceError::ResourceNotFound {
                path: path.to_string(),
            },
            _ => ResourceError::ReadFailed {
                path: full_path.display().to_string(),
                message: e.to_string(),
            },
        })
    }
}

/// Compiles each resource once and hands out shared templates
pub struct TemplateCache {
    provider: Box<dyn ResourceProvider>,
    templates: RwLock<HashMap<String, Arc<Template>>>,
}

impl TemplateCache {
    pub fn new(provider: impl ResourceProvider + 'static) -> Self {
        Self {
            provider: Box::new(provider),
            templates: RwLock::new(HashMap::new()),
        }
    }

    /// Return the compiled template for `path`, loading and parsing it on first use
    pub fn get_or_load(&self, path: &str) -> Result<Arc<Template>, CacheError> {
        if let Some(template) = self
            .templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(Arc::clone(template));
        }

        let bytes = self.provider.load(path)?;
        let template = parse_named(&bytes, path).map_err(|source| CacheError::Parse {
            path: path.to_string(),
            source,
        })?;
        tracing::info!(path, nodes = template.root().count(), "compiled template");

        // Another thread may have won the race; keep whichever was stored first
        let mut templates = self.templates.write().unwrap_or_else(PoisonError::into_inner);
        let entry = templates
            .entry(path.to_string())
            .or_insert_with(|| Arc::new(template));
        Ok(Arc::clone(entry))
    }

    /// Drop the cached template for `path`; returns whether one was cached
    pub fn invalidate(&self, path: &str) -> bool {
        self.templates
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(path)
            .is_some()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.templates
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.templates.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ParseErrorKind;

    fn cache() -> TemplateCache {
        TemplateCache::new(
            StaticResources::new()
                .with("window.xml", "<Window><Label/></Window>")
                .with("broken.xml", "<Window>"),
        )
    }

    #[test]
    fn test_get_or_load_shares_template() {
        let cache = cache();
        let first = cache.get_or_load("window.xml").expect("Should load");
        let second = cache.get_or_load("window.xml").expect("Should load");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.resource(), Some("window.xml"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_missing_resource() {
        let err = cache().get_or_load("nope.xml").unwrap_err();
        assert!(matches!(
            err,
            CacheError::Resource(ResourceError::ResourceNotFound { ref path }) if path == "nope.xml"
        ));
    }

    #[test]
    fn test_parse_failure_is_not_cached() {
        let cache = cache();
        match cache.get_or_load("broken.xml") {
            Err(CacheError::Parse { source, .. }) => {
                assert_eq!(source.kind(), ParseErrorKind::UnbalancedElement)
            }
            other => panic!("expected parse error, got {:?}", other.map(|_| ())),
        }
        assert!(!cache.contains("broken.xml"));
    }

    #[test]
    fn test_invalidate_reloads() {
        let cache = cache();
        let first = cache.get_or_load("window.xml").expect("Should load");
        assert!(cache.invalidate("window.xml"));
        assert!(!cache.invalidate("window.xml"));
        let second = cache.get_or_load("window.xml").expect("Should load");
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first, second);
    }

    #[test]
    fn test_directory_resources_resolve_against_base() {
        let resources = DirectoryResources::new("/nonexistent/templates");
        assert_eq!(
            resources.resolve_path("ui/main.xml"),
            PathBuf::from("/nonexistent/templates/ui/main.xml")
        );
        assert!(matches!(
            resources.load("ui/main.xml"),
            Err(ResourceError::ResourceNotFound { .. })
        ));
    }
}
