//! The provider seam the relay talks to.

use async_trait::async_trait;

use crate::error::CompletionError;

/// One prompt in, one completion out.
///
/// Implementations make a single attempt with a bounded timeout; retry
/// policy, fallbacks and user-facing wording belong to the caller.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    /// Request a completion for `prompt`.
    ///
    /// The prompt is already validated (non-empty, within the length cap).
    /// Every failure mode maps to a [`CompletionError`]; nothing panics or
    /// propagates raw provider errors past this boundary.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
}
