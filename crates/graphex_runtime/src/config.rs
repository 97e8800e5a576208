//! Schema and executor configuration.

use serde::{Deserialize, Serialize};

/// Schema-wide configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfiguration {
    /// Cache parsed documents by their exact text.
    pub use_caching_document_parser: bool,

    /// Maximum number of cached documents. Zero disables the cache.
    pub document_parser_cache_maximum_size: usize,

    /// Pretty print JSON responses.
    pub pretty_print: bool,

    /// Executor settings.
    pub executor: ExecutorConfig,
}

impl Default for SchemaConfiguration {
    fn default() -> Self {
        Self {
            use_caching_document_parser: true,
            document_parser_cache_maximum_size: 1000,
            pretty_print: false,
            executor: ExecutorConfig::default(),
        }
    }
}

impl SchemaConfiguration {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables or disables the document cache.
    #[must_use]
    pub fn with_caching_document_parser(mut self, enabled: bool) -> Self {
        self.use_caching_document_parser = enabled;
        self
    }

    /// Sets the maximum number of cached documents.
    #[must_use]
    pub fn with_document_cache_size(mut self, size: usize) -> Self {
        self.document_parser_cache_maximum_size = size;
        self
    }

    /// Enables pretty printed responses.
    #[must_use]
    pub fn with_pretty_print(mut self, pretty: bool) -> Self {
        self.pretty_print = pretty;
        self
    }

    /// Sets the executor configuration.
    #[must_use]
    pub fn with_executor(mut self, executor: ExecutorConfig) -> Self {
        self.executor = executor;
        self
    }
}

/// Executor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Run top-level mutation fields one after another, in selection order.
    pub serial_mutations: bool,

    /// Maximum number of sibling fields resolved at once. Unbounded when unset.
    pub max_concurrent_fields: Option<usize>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            serial_mutations: true,
            max_concurrent_fields: None,
        }
    }
}

impl ExecutorConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_serial_mutations(mut self, serial: bool) -> Self {
        self.serial_mutations = serial;
        self
    }

    /// Limits sibling concurrency. A limit of zero is treated as one.
    #[must_use]
    pub fn with_max_concurrent_fields(mut self, limit: usize) -> Self {
        self.max_concurrent_fields = Some(limit.max(1));
        self
    }
}
