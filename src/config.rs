//! Remote source configuration surface
//!
//! How credentials are obtained (environment, files, flags) is the
//! caller's concern. This type only answers the two questions the fetch
//! pipeline asks: is a remote source usable at all, and is it running in
//! demo mode.

/// Configuration gate for the remote quote source
#[derive(Debug, Clone, Default)]
pub struct SourceConfig {
    api_key: Option<String>,
    demo_mode: bool,
}

impl SourceConfig {
    /// Creates a configuration with a live API key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            demo_mode: false,
        }
    }

    /// Creates a demo-mode configuration; quote requests are answered with
    /// synthetic data instead of live remote calls
    pub fn demo() -> Self {
        Self {
            api_key: None,
            demo_mode: true,
        }
    }

    /// Creates a configuration with no remote source at all
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Whether the remote source can be consulted (a key is present or
    /// demo mode is active)
    pub fn is_available(&self) -> bool {
        self.api_key.is_some() || self.demo_mode
    }

    /// Whether the source is configured for demo mode rather than live data
    pub fn is_demo_mode(&self) -> bool {
        self.demo_mode
    }

    /// The configured API key, if any
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unconfigured_is_not_available() {
        let config = SourceConfig::unconfigured();
        assert!(!config.is_available());
        assert!(!config.is_demo_mode());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_keyed_config_is_available_and_live() {
        let config = SourceConfig::new("secret-key");
        assert!(config.is_available());
        assert!(!config.is_demo_mode());
        assert_eq!(config.api_key(), Some("secret-key"));
    }

    #[test]
    fn test_demo_config_is_available_but_not_live() {
        let config = SourceConfig::demo();
        assert!(config.is_available());
        assert!(config.is_demo_mode());
        assert!(config.api_key().is_none());
    }

    #[test]
    fn test_default_matches_unconfigured() {
        let config = SourceConfig::default();
        assert!(!config.is_available());
        assert!(!config.is_demo_mode());
    }
}
