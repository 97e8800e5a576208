//! Operation extraction and document caching.
//!
//! A request document is reduced to its ordered list of [`Operation`]s. Every
//! operation keeps a shared handle to the document's fragment definitions so
//! that spreads can be inlined later without the original document.

use crate::ast::{
    Definition, Directive, FragmentDefinition, OperationType, SelectionSet, VariableDefinition,
};
use crate::parser::parse;
use graphex_core::{Diagnostic, LineColumn, Span};
use indexmap::IndexMap;
use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::Arc;

/// Fragment definitions of a document, by name, in document order.
pub type Fragments = Arc<IndexMap<String, FragmentDefinition>>;

/// One query, mutation or subscription parsed from a request document.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub name: Option<String>,
    pub kind: OperationType,
    pub variables: Vec<VariableDefinition>,
    pub directives: Vec<Directive>,
    pub selection_set: SelectionSet,
    pub fragments: Fragments,
    pub span: Span,
}

impl Operation {
    /// Name used in logs and error messages.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("(anonymous)")
    }
}

/// A syntax error in a request document.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
#[error("Syntax error at {location}: {message}")]
pub struct ParseError {
    pub message: String,
    #[label("{message}")]
    pub span: Span,
    pub location: LineColumn,
    pub code: &'static str,
}

impl ParseError {
    fn from_diagnostic(diagnostic: &Diagnostic, source: &str) -> Self {
        Self {
            message: diagnostic.message.clone(),
            span: diagnostic.span,
            location: diagnostic.span.location(source),
            code: diagnostic.code,
        }
    }
}

/// Parses a request document into its operations, in document order.
///
/// Empty documents yield no operations; selecting one is the caller's job.
pub fn parse_document(text: &str) -> Result<Vec<Operation>, ParseError> {
    let result = parse(text);
    if let Some(error) = result.diagnostics.first_error() {
        return Err(ParseError::from_diagnostic(error, text));
    }

    let mut definitions = Vec::new();
    let mut fragments = IndexMap::new();
    for definition in result.document.definitions {
        match definition {
            Definition::Operation(operation) => definitions.push(operation),
            Definition::Fragment(fragment) => {
                fragments.insert(fragment.name.value.clone(), fragment);
            }
        }
    }

    let fragments: Fragments = Arc::new(fragments);
    Ok(definitions
        .into_iter()
        .map(|operation| Operation {
            name: operation.name.map(|name| name.value),
            kind: operation.operation,
            variables: operation.variables,
            directives: operation.directives,
            selection_set: operation.selection_set,
            fragments: Arc::clone(&fragments),
            span: operation.span,
        })
        .collect())
}

/// A document parser with a bounded LRU cache keyed by the exact request text.
///
/// Failed parses are not cached. Two concurrent misses for the same text may
/// both parse; the later insert wins.
pub struct CachingDocumentParser {
    cache: Mutex<LruCache<String, Arc<[Operation]>>>,
}

impl CachingDocumentParser {
    #[must_use]
    pub fn new(maximum_size: NonZeroUsize) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(maximum_size)),
        }
    }

    pub fn parse_document(&self, text: &str) -> Result<Arc<[Operation]>, ParseError> {
        if let Some(operations) = self.cache.lock().get(text) {
            tracing::debug!(len = text.len(), "document cache hit");
            return Ok(Arc::clone(operations));
        }

        tracing::debug!(len = text.len(), "document cache miss");
        let operations: Arc<[Operation]> = parse_document(text)?.into();
        self.cache
            .lock()
            .put(text.to_owned(), Arc::clone(&operations));
        Ok(operations)
    }

    /// Number of cached documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.lock().cap().get()
    }
}

impl std::fmt::Debug for CachingDocumentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachingDocumentParser")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

/// The document parser used by a schema.
#[derive(Debug)]
pub enum DocumentParser {
    Plain,
    Caching(CachingDocumentParser),
}

impl DocumentParser {
    /// Chooses the caching parser unless caching is disabled or the maximum
    /// size is zero.
    #[must_use]
    pub fn new(use_caching: bool, maximum_size: usize) -> Self {
        match NonZeroUsize::new(maximum_size) {
            Some(size) if use_caching => Self::Caching(CachingDocumentParser::new(size)),
            _ => Self::Plain,
        }
    }

    pub fn parse_document(&self, text: &str) -> Result<Arc<[Operation]>, ParseError> {
        match self {
            Self::Plain => parse_document(text).map(Into::into),
            Self::Caching(parser) => parser.parse_document(text),
        }
    }
}

impl Default for DocumentParser {
    fn default() -> Self {
        Self::new(true, 1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Selection;

    const FILMS: &str = r"
        query Films { films { ...FilmParts } }
        mutation AddFilm { addFilm(title: ONE) { ...FilmParts } }
        fragment FilmParts on Film { title year }
    ";

    #[test]
    fn test_operations_share_fragments() {
        let operations = parse_document(FILMS).unwrap();
        assert_eq!(operations.len(), 2);
        assert_eq!(operations[0].name.as_deref(), Some("Films"));
        assert_eq!(operations[1].kind, OperationType::Mutation);
        assert!(Arc::ptr_eq(&operations[0].fragments, &operations[1].fragments));
        assert!(operations[0].fragments.contains_key("FilmParts"));
        assert!(matches!(
            operations[0].selection_set.selections[0],
            Selection::Field(_)
        ));
    }

    #[test]
    fn test_empty_document_has_no_operations() {
        assert!(parse_document("").unwrap().is_empty());
        assert!(parse_document("fragment F on T { a }").unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_location() {
        let error = parse_document("{\n  film(id: ) }").unwrap_err();
        assert_eq!(error.location, LineColumn { line: 2, column: 12 });
        insta::assert_snapshot!(error.to_string(), @r#"Syntax error at 2:12: expected value, found ")""#);
    }

    #[test]
    fn test_caching_parser_returns_equal_operations() {
        let parser = CachingDocumentParser::new(NonZeroUsize::new(4).unwrap());
        let first = parser.parse_document(FILMS).unwrap();
        let second = parser.parse_document(FILMS).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(&*first, parse_document(FILMS).unwrap().as_slice());
        assert_eq!(parser.len(), 1);
    }

    #[test]
    fn test_caching_parser_does_not_cache_errors() {
        let parser = CachingDocumentParser::new(NonZeroUsize::new(4).unwrap());
        assert!(parser.parse_document("{ broken").is_err());
        assert!(parser.is_empty());
    }

    #[test]
    fn test_cache_is_bounded() {
        let parser = CachingDocumentParser::new(NonZeroUsize::new(2).unwrap());
        for field in ["a", "b", "c", "d"] {
            parser.parse_document(&format!("{{ {field} }}")).unwrap();
        }
        assert_eq!(parser.len(), 2);
        assert_eq!(parser.capacity(), 2);
    }

    #[test]
    fn test_document_parser_selection() {
        assert!(matches!(DocumentParser::new(true, 10), DocumentParser::Caching(_)));
        assert!(matches!(DocumentParser::new(true, 0), DocumentParser::Plain));
        assert!(matches!(DocumentParser::new(false, 10), DocumentParser::Plain));

        let plain = DocumentParser::Plain.parse_document(FILMS).unwrap();
        let cached = DocumentParser::default().parse_document(FILMS).unwrap();
        assert_eq!(plain, cached);
    }
}
