//! Stream configuration.

use assistant_stream_core::IdGenerator;

/// Configuration for an assistant stream.
#[derive(Debug, Clone, Default)]
pub struct StreamConfig {
    /// Generator for tool-call ids the caller does not supply.
    pub id_generator: IdGenerator,
}

impl StreamConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the tool-call id generator.
    #[must_use]
    pub fn with_id_generator<F>(mut self, f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.id_generator = IdGenerator::new(f);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_generates_call_ids() {
        let config = StreamConfig::default();
        assert!(config.id_generator.generate().starts_with("call_"));
    }

    #[test]
    fn test_custom_generator() {
        let config = StreamConfig::new().with_id_generator(|| "fixed".to_string());
        assert_eq!(config.id_generator.generate(), "fixed");
    }
}
