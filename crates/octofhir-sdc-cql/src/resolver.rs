//! Library resolution
//!
//! Turns a library name plus the questionnaire's declarations into a compiled
//! library, going through the per-run [`LibraryCache`] so each name is
//! fetched, translated and compiled at most once per run.
//!
//! Selection policy among declarations named like the library:
//! 1. a declaration carrying `application/elm+json` content (no translation)
//! 2. a declaration carrying `text/cql` content
//! 3. exactly one untyped declaration, treated as CQL
//!
//! When no named declaration matches, canonical declarations are dereferenced
//! in order and the first Library resource whose `name` matches is used.

use crate::cache::{CachedLibrary, LibraryCache};
use crate::elm::ElmDocument;
use crate::engine::ExecutionEngine;
use crate::error::ResolutionError;
use crate::fetch::{DocumentFetcher, absolutize, load_attachment_json, load_attachment_text};
use crate::questionnaire::{
    Attachment, CQL_CONTENT_TYPE, LibraryContent, LibraryDeclaration, select_content,
};
use crate::translator::Translator;
use serde_json::Value;

/// Resolves library names to compiled libraries
pub struct LibraryResolver<'a, E: ExecutionEngine> {
    fetcher: &'a dyn DocumentFetcher,
    translator: &'a dyn Translator,
    engine: &'a E,
}

impl<'a, E: ExecutionEngine> LibraryResolver<'a, E> {
    pub fn new(fetcher: &'a dyn DocumentFetcher, translator: &'a dyn Translator, engine: &'a E) -> Self {
        Self {
            fetcher,
            translator,
            engine,
        }
    }

    /// Resolve `library`, returning the cached entry
    ///
    /// A cached name returns immediately without any network call. Failures
    /// are cached too, so a broken library is attempted once per run.
    pub async fn resolve<'c>(
        &self,
        library: &str,
        declarations: &[LibraryDeclaration],
        cache: &'c mut LibraryCache<E::Library>,
    ) -> Result<&'c CachedLibrary<E::Library>, ResolutionError> {
        if cache.contains(library) {
            tracing::debug!(library, "library cache hit");
            return cache.get(library).ok_or_else(|| ResolutionError::NotFound {
                library: library.to_string(),
            });
        }
        if let Some(error) = cache.failure(library) {
            tracing::debug!(library, "library previously failed in this run");
            return Err(error.clone());
        }

        match self.load(library, declarations, cache).await {
            Ok((elm, compiled)) => {
                tracing::info!(library, "library compiled");
                Ok(cache.put(library, elm, compiled))
            }
            Err(error) => {
                cache.record_failure(library, error.clone());
                Err(error)
            }
        }
    }

    async fn load(
        &self,
        library: &str,
        declarations: &[LibraryDeclaration],
        cache: &mut LibraryCache<E::Library>,
    ) -> Result<(ElmDocument, E::Library), ResolutionError> {
        let content = self.select_source(library, declarations, cache).await?;

        let elm = match content {
            LibraryContent::Elm(attachment) => {
                tracing::debug!(library, url = ?attachment.url, "loading ELM content");
                ElmDocument::new(load_attachment_json(self.fetcher, &attachment).await?)
            }
            LibraryContent::Cql(attachment) => {
                tracing::debug!(library, url = ?attachment.url, "loading CQL content");
                let cql = load_attachment_text(self.fetcher, &attachment, CQL_CONTENT_TYPE).await?;
                self.translator.translate(&cql).await?
            }
        };

        let compiled = self.engine.compile(&elm)?;
        Ok((elm, compiled))
    }

    async fn select_source(
        &self,
        library: &str,
        declarations: &[LibraryDeclaration],
        cache: &mut LibraryCache<E::Library>,
    ) -> Result<LibraryContent, ResolutionError> {
        let named: Vec<&LibraryDeclaration> = declarations
            .iter()
            .filter(|d| d.name() == Some(library))
            .collect();

        let elm = named.iter().find_map(|d| match d {
            LibraryDeclaration::Elm { content, .. } => Some(content),
            _ => None,
        });
        if let Some(content) = elm {
            return Ok(LibraryContent::Elm(content.clone()));
        }

        let cql = named.iter().find_map(|d| match d {
            LibraryDeclaration::Cql { content, .. } => Some(content),
            _ => None,
        });
        if let Some(content) = cql {
            return Ok(LibraryContent::Cql(content.clone()));
        }

        let untyped: Vec<&str> = named
            .iter()
            .filter_map(|d| match d {
                LibraryDeclaration::Untyped { location, .. } => Some(location.as_str()),
                _ => None,
            })
            .collect();
        match untyped.as_slice() {
            [location] => {
                return Ok(LibraryContent::Cql(Attachment {
                    content_type: Some(CQL_CONTENT_TYPE.to_string()),
                    url: Some(location.to_string()),
                    data: None,
                }));
            }
            [] => {}
            many => {
                return Err(ResolutionError::Ambiguous {
                    library: library.to_string(),
                    count: many.len(),
                });
            }
        }

        self.select_from_canonical(library, declarations, cache).await
    }

    async fn select_from_canonical(
        &self,
        library: &str,
        declarations: &[LibraryDeclaration],
        cache: &mut LibraryCache<E::Library>,
    ) -> Result<LibraryContent, ResolutionError> {
        let mut first_error: Option<ResolutionError> = None;

        for declaration in declarations {
            let LibraryDeclaration::Canonical { url } = declaration else {
                continue;
            };

            let resource = match self.library_resource(url, cache).await {
                Ok(resource) => resource,
                Err(error) => {
                    tracing::warn!(library, url, error = %error, "failed to dereference library");
                    first_error.get_or_insert(error);
                    continue;
                }
            };

            if resource.get("name").and_then(Value::as_str) != Some(library) {
                continue;
            }

            return library_content(library, url, &resource);
        }

        Err(first_error.unwrap_or_else(|| ResolutionError::NotFound {
            library: library.to_string(),
        }))
    }

    /// Fetch a Library resource, memoized by canonical URL for the run
    async fn library_resource(
        &self,
        url: &str,
        cache: &mut LibraryCache<E::Library>,
    ) -> Result<Value, ResolutionError> {
        if let Some(resource) = cache.resource(url) {
            return Ok(resource.clone());
        }

        let resource = self.fetcher.fetch_json(url).await?;
        if let Some(resource_type) = resource.get("resourceType").and_then(Value::as_str) {
            if resource_type != "Library" {
                return Err(ResolutionError::InvalidLibraryResource {
                    url: url.to_string(),
                    message: format!("expected a Library resource, found {resource_type}"),
                });
            }
        }
        cache.put_resource(url, resource.clone());
        Ok(resource)
    }
}

/// Select content from a dereferenced Library resource
fn library_content(library: &str, url: &str, resource: &Value) -> Result<LibraryContent, ResolutionError> {
    let content: Vec<Attachment> = match resource.get("content") {
        Some(raw) => serde_json::from_value(raw.clone()).map_err(|e| {
            ResolutionError::InvalidLibraryResource {
                url: url.to_string(),
                message: format!("invalid content: {e}"),
            }
        })?,
        None => Vec::new(),
    };

    match select_content(&content) {
        Some(LibraryContent::Elm(a)) => Ok(LibraryContent::Elm(absolutize(&a, url)?)),
        Some(LibraryContent::Cql(a)) => Ok(LibraryContent::Cql(absolutize(&a, url)?)),
        None => Err(ResolutionError::NoContent {
            library: library.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EmbeddedEngine, PatientSource};
    use crate::error::TranslateError;
    use crate::fetch::MockDocumentFetcher;
    use crate::translator::MockTranslator;
    use octofhir_sdc_cql_diagnostics::{Diagnostic, SDC0200};
    use serde_json::json;

    fn score_elm() -> Value {
        json!({
            "library": {
                "identifier": { "id": "MyLib", "version": "1.0.0" },
                "statements": {
                    "def": [{
                        "name": "Score",
                        "context": "Unfiltered",
                        "expression": { "type": "Literal", "valueType": "{urn:hl7-org:elm-types:r1}Integer", "value": "42" }
                    }]
                }
            }
        })
    }

    fn cql_declaration(name: &str, url: &str) -> LibraryDeclaration {
        LibraryDeclaration::Cql {
            name: name.to_string(),
            content: Attachment {
                content_type: Some(CQL_CONTENT_TYPE.into()),
                url: Some(url.into()),
                data: None,
            },
        }
    }

    #[tokio::test]
    async fn test_cql_is_fetched_translated_and_cached_once() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch_text()
            .times(1)
            .returning(|_, _| Ok("library MyLib define Score: 42".to_string()));
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .times(1)
            .returning(|_| Ok(ElmDocument::new(score_elm())));
        let engine = EmbeddedEngine::new();
        let resolver = LibraryResolver::new(&fetcher, &translator, &engine);

        let declarations = vec![cql_declaration("MyLib", "http://example.org/MyLib.cql")];
        let mut cache = LibraryCache::new();

        for _ in 0..3 {
            let entry = resolver.resolve("MyLib", &declarations, &mut cache).await.unwrap();
            assert_eq!(entry.elm.library_id(), Some("MyLib"));
        }
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_elm_preferred_over_cql() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch_json()
            .withf(|url| url == "http://example.org/MyLib.json")
            .times(1)
            .returning(|_| Ok(score_elm()));
        fetcher.expect_fetch_text().never();
        let mut translator = MockTranslator::new();
        translator.expect_translate().never();
        let engine = EmbeddedEngine::new();
        let resolver = LibraryResolver::new(&fetcher, &translator, &engine);

        let declarations = vec![
            cql_declaration("MyLib", "http://example.org/MyLib.cql"),
            LibraryDeclaration::Elm {
                name: "MyLib".into(),
                content: Attachment {
                    content_type: Some("application/elm+json".into()),
                    url: Some("http://example.org/MyLib.json".into()),
                    data: None,
                },
            },
        ];
        let mut cache = LibraryCache::new();
        assert!(resolver.resolve("MyLib", &declarations, &mut cache).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_declaration() {
        let fetcher = MockDocumentFetcher::new();
        let translator = MockTranslator::new();
        let engine = EmbeddedEngine::new();
        let resolver = LibraryResolver::new(&fetcher, &translator, &engine);

        let mut cache = LibraryCache::new();
        let err = resolver
            .resolve("Missing", &[cql_declaration("Other", "http://x/o.cql")], &mut cache)
            .await
            .unwrap_err();
        assert_eq!(err, ResolutionError::NotFound { library: "Missing".into() });
    }

    #[tokio::test]
    async fn test_untyped_declaration_fetched_as_cql() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch_text()
            .withf(|url, accept| url == "http://x/MyLib.cql" && accept == CQL_CONTENT_TYPE)
            .times(1)
            .returning(|_, _| Ok("library MyLib define Score: 42".to_string()));
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .times(1)
            .returning(|_| Ok(ElmDocument::new(score_elm())));
        let engine = EmbeddedEngine::new();
        let resolver = LibraryResolver::new(&fetcher, &translator, &engine);

        let declarations = vec![LibraryDeclaration::Untyped {
            name: "MyLib".into(),
            location: "http://x/MyLib.cql".into(),
        }];
        let mut cache = LibraryCache::new();
        let entry = resolver.resolve("MyLib", &declarations, &mut cache).await.unwrap();

        let results = engine.run(&entry.library, &PatientSource::empty()).await.unwrap();
        assert_eq!(results.unfiltered("Score"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_ambiguous_untyped_declarations() {
        let fetcher = MockDocumentFetcher::new();
        let translator = MockTranslator::new();
        let engine = EmbeddedEngine::new();
        let resolver = LibraryResolver::new(&fetcher, &translator, &engine);

        let declarations = vec![
            LibraryDeclaration::Untyped { name: "MyLib".into(), location: "http://x/a.cql".into() },
            LibraryDeclaration::Untyped { name: "MyLib".into(), location: "http://x/b.cql".into() },
        ];
        let mut cache = LibraryCache::new();
        let err = resolver.resolve("MyLib", &declarations, &mut cache).await.unwrap_err();
        assert!(matches!(err, ResolutionError::Ambiguous { count: 2, .. }));
    }

    #[tokio::test]
    async fn test_translation_failure_is_cached() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch_text()
            .times(1)
            .returning(|_, _| Ok("library MyLib define Score: 2 *".to_string()));
        let mut translator = MockTranslator::new();
        translator.expect_translate().times(1).returning(|_| {
            Err(TranslateError::Rejected {
                diagnostics: vec![Diagnostic::error(SDC0200, "Syntax error")],
            })
        });
        let engine = EmbeddedEngine::new();
        let resolver = LibraryResolver::new(&fetcher, &translator, &engine);

        let declarations = vec![cql_declaration("MyLib", "http://example.org/MyLib.cql")];
        let mut cache = LibraryCache::new();
        for _ in 0..2 {
            let err = resolver.resolve("MyLib", &declarations, &mut cache).await.unwrap_err();
            assert!(matches!(err, ResolutionError::Translation(_)));
        }
    }

    #[tokio::test]
    async fn test_canonical_library_resource() {
        let mut fetcher = MockDocumentFetcher::new();
        fetcher
            .expect_fetch_json()
            .withf(|url| url == "http://example.org/fhir/Library/mylib")
            .times(1)
            .returning(|_| {
                Ok(json!({
                    "resourceType": "Library",
                    "name": "MyLib",
                    "content": [{ "contentType": "text/cql", "url": "MyLib.cql" }]
                }))
            });
        fetcher
            .expect_fetch_text()
            .withf(|url, _| url == "http://example.org/fhir/Library/MyLib.cql")
            .times(1)
            .returning(|_, _| Ok("library MyLib".to_string()));
        let mut translator = MockTranslator::new();
        translator
            .expect_translate()
            .times(1)
            .returning(|_| Ok(ElmDocument::new(score_elm())));
        let engine = EmbeddedEngine::new();
        let resolver = LibraryResolver::new(&fetcher, &translator, &engine);

        let declarations = vec![LibraryDeclaration::Canonical {
            url: "http://example.org/fhir/Library/mylib".into(),
        }];
        let mut cache = LibraryCache::new();
        assert!(resolver.resolve("MyLib", &declarations, &mut cache).await.is_ok());
        assert!(cache.resource("http://example.org/fhir/Library/mylib").is_some());
    }

    #[test]
    fn test_library_resource_without_content() {
        let err = library_content("MyLib", "http://x/Library/a", &json!({ "name": "MyLib" })).unwrap_err();
        assert_eq!(err, ResolutionError::NoContent { library: "MyLib".into() });
    }
}
