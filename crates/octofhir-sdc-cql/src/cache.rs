//! Per-run library cache
//!
//! Owned by one questionnaire run and passed by `&mut` into resolution.
//! Libraries are identified by name only: once a name is cached (compiled or
//! failed), later references reuse the entry without any network call, even
//! if they would have matched different declarations.

use crate::elm::ElmDocument;
use crate::error::ResolutionError;
use serde_json::Value;
use std::collections::HashMap;

/// A compiled library together with the ELM it was compiled from
#[derive(Debug)]
pub struct CachedLibrary<L> {
    pub elm: ElmDocument,
    pub library: L,
}

/// Library name -> compiled library, plus dereferenced Library resources
#[derive(Debug)]
pub struct LibraryCache<L> {
    libraries: HashMap<String, CachedLibrary<L>>,
    failures: HashMap<String, ResolutionError>,
    resources: HashMap<String, Value>,
}

impl<L> Default for LibraryCache<L> {
    fn default() -> Self {
        Self::new()
    }
}

impl<L> LibraryCache<L> {
    pub fn new() -> Self {
        Self {
            libraries: HashMap::new(),
            failures: HashMap::new(),
            resources: HashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&CachedLibrary<L>> {
        self.libraries.get(name)
    }

    /// Store a compiled library; the first entry for a name wins
    pub fn put(&mut self, name: impl Into<String>, elm: ElmDocument, library: L) -> &CachedLibrary<L> {
        self.libraries
            .entry(name.into())
            .or_insert(CachedLibrary { elm, library })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.libraries.contains_key(name)
    }

    /// Previously recorded resolution failure for `name`
    pub fn failure(&self, name: &str) -> Option<&ResolutionError> {
        self.failures.get(name)
    }

    pub fn record_failure(&mut self, name: impl Into<String>, error: ResolutionError) {
        self.failures.insert(name.into(), error);
    }

    /// Library resource previously fetched from `url`
    pub fn resource(&self, url: &str) -> Option<&Value> {
        self.resources.get(url)
    }

    pub fn put_resource(&mut self, url: impl Into<String>, resource: Value) {
        self.resources.insert(url.into(), resource);
    }

    /// Number of compiled libraries
    pub fn len(&self) -> usize {
        self.libraries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.libraries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_first_entry_wins() {
        let mut cache: LibraryCache<u32> = LibraryCache::new();
        cache.put("MyLib", ElmDocument::new(json!({ "library": { "v": 1 } })), 1);
        let entry = cache.put("MyLib", ElmDocument::new(json!({ "library": { "v": 2 } })), 2);

        assert_eq!(entry.library, 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("MyLib"));
        assert!(cache.get("Other").is_none());
    }

    #[test]
    fn test_failures_and_resources() {
        let mut cache: LibraryCache<()> = LibraryCache::default();
        cache.record_failure("Broken", ResolutionError::NotFound { library: "Broken".into() });
        cache.put_resource("http://example.org/Library/a", json!({ "name": "A" }));

        assert!(cache.failure("Broken").is_some());
        assert!(cache.is_empty());
        assert_eq!(cache.resource("http://example.org/Library/a"), Some(&json!({ "name": "A" })));
    }
}
