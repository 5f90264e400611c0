use crate::{Error, Result};

/// Default number of plan templates kept by the query plan cache
pub const DEFAULT_CACHE_CAPACITY: usize = 500;

/// Default maximum filter nesting depth
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Translator configuration for caching and safety limits
#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Reuse SQL templates for structurally identical filters
    pub cache_enabled: bool,

    /// Maximum number of cached plan templates (FIFO eviction beyond this)
    pub cache_capacity: usize,

    /// Maximum nesting depth of logical, `$elemMatch` and `$index` nodes
    pub max_depth: usize,

    /// Reject unknown `$` operators instead of ignoring them
    pub strict_operators: bool,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            max_depth: DEFAULT_MAX_DEPTH,
            strict_operators: false,
        }
    }
}

impl TranslatorConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable the query plan cache
    pub fn without_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    /// Set the plan cache capacity
    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the maximum filter nesting depth
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Reject unknown operators with `Error::InvalidQuery`
    pub fn with_strict_operators(mut self) -> Self {
        self.strict_operators = true;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.cache_capacity == 0 {
            return Err(Error::InvalidConfig(
                "cache_capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_depth == 0 {
            return Err(Error::InvalidConfig(
                "max_depth must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TranslatorConfig::default();
        assert!(config.cache_enabled);
        assert_eq!(config.cache_capacity, 500);
        assert_eq!(config.max_depth, 32);
        assert!(!config.strict_operators);
    }

    #[test]
    fn test_builder_methods() {
        let config = TranslatorConfig::new()
            .without_cache()
            .with_cache_capacity(10)
            .with_max_depth(4)
            .with_strict_operators();

        assert!(!config.cache_enabled);
        assert_eq!(config.cache_capacity, 10);
        assert_eq!(config.max_depth, 4);
        assert!(config.strict_operators);
    }

    #[test]
    fn test_validate_success() {
        assert!(TranslatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_capacity() {
        let config = TranslatorConfig::new().with_cache_capacity(0);
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_validate_zero_depth() {
        let config = TranslatorConfig::new().with_max_depth(0);
        assert!(config.validate().is_err());
    }
}
