//! ID generation utilities.
//!
//! Tool-call parts need an identifier even when the caller does not supply
//! one. The default generator produces UUID-backed ids; a custom generator
//! can be injected through [`IdGenerator`].

use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Generate a unique tool call ID.
///
/// Returns a UUID v4 string in the format used by most LLM providers.
///
/// # Example
///
/// ```rust
/// use assistant_stream_core::identifier::generate_tool_call_id;
///
/// let id = generate_tool_call_id();
/// assert!(id.starts_with("call_"));
/// assert_eq!(id.len(), 37); // "call_" + 32 hex chars
/// ```
#[must_use]
pub fn generate_tool_call_id() -> String {
    format!("call_{}", Uuid::new_v4().simple())
}

/// Shared zero-argument identifier factory.
#[derive(Clone)]
pub struct IdGenerator(Arc<dyn Fn() -> String + Send + Sync>);

impl IdGenerator {
    /// Wrap a closure.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Produce a fresh identifier.
    #[must_use]
    pub fn generate(&self) -> String {
        (self.0)()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new(generate_tool_call_id)
    }
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IdGenerator").finish()
    }
}
