//! Execution scopes.

use tokio_util::sync::CancellationToken;

/// The scope a request runs in.
///
/// The name is visible to every resolver of the request through
/// [`ResolverContext::scope_name`](crate::ResolverContext::scope_name).
/// Cancelling the token abandons all outstanding resolutions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionScope {
    name: Option<String>,
    cancellation: CancellationToken,
}

impl ExecutionScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a named scope.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            cancellation: CancellationToken::new(),
        }
    }

    /// Uses `token`, usually a child of a caller-owned token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
