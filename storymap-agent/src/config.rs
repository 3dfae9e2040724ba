use std::env;
use std::time::Duration;
use storymap_core::{InputError, Language};
use storymap_model::ConfigError;
use storymap_quality::SimilarityThresholds;

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const DEFAULT_CACHE_PREFIX: &str = "storymap";

pub const DEFAULT_FIX_TEMPERATURE: f32 = 0.3;
pub const DEFAULT_FIX_TIMEOUT: Duration = Duration::from_secs(45);

/// Settings for [`crate::MapGenerator`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub timeout: Duration,
    pub cache_ttl: Duration,
    pub cache_prefix: String,
    /// Language the generated content is written in.
    pub language: Language,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            timeout: DEFAULT_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            language: Language::default(),
        }
    }
}

impl GenerationConfig {
    /// Read `API_TEMPERATURE`, `STORYMAP_LANGUAGE`, `STORYMAP_TIMEOUT_SECS`
    /// and `STORYMAP_CACHE_TTL_SECS`, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(raw) = get("API_TEMPERATURE") {
            config.temperature = raw.parse().map_err(|_| {
                ConfigError::new("API_TEMPERATURE", format!("'{raw}' is not a number"))
                    .with_suggestion("Use a value such as 0.7")
            })?;
        }
        if let Some(raw) = get("STORYMAP_LANGUAGE") {
            config.language = raw.parse().map_err(|e: String| {
                ConfigError::new("STORYMAP_LANGUAGE", e).with_suggestion("Valid values: en, ru")
            })?;
        }
        if let Some(secs) = parse_secs(&get, "STORYMAP_TIMEOUT_SECS")? {
            config.timeout = secs;
        }
        if let Some(secs) = parse_secs(&get, "STORYMAP_CACHE_TTL_SECS")? {
            config.cache_ttl = secs;
        }

        config.validate()?;
        Ok(config)
    }

    #[must_use]
    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_cache_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.cache_prefix = prefix.into();
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_temperature("temperature", self.temperature)?;
        if self.timeout.is_zero() {
            return Err(ConfigError::new("timeout", "must be greater than zero"));
        }
        if self.cache_prefix.trim().is_empty() {
            return Err(ConfigError::new("cache_prefix", "cannot be empty")
                .with_suggestion(format!("Use '{DEFAULT_CACHE_PREFIX}'")));
        }
        Ok(())
    }
}

fn parse_secs<G>(get: &G, key: &str) -> Result<Option<Duration>, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|raw| {
            raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                ConfigError::new(key, format!("'{raw}' is not a whole number of seconds"))
            })
        })
        .transpose()
}

fn check_temperature(field: &str, value: f32) -> Result<(), ConfigError> {
    if (0.0..=2.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::new(field, format!("{value} is outside [0.0, 2.0]")))
    }
}

/// Stage switches and fix-pass settings for [`crate::StoryMapAgent`].
#[derive(Debug, Clone, PartialEq)]
pub struct AgentConfig {
    pub enable_validation: bool,
    /// Has no effect when validation is disabled.
    pub enable_fix: bool,
    pub use_cache: bool,
    pub fix_temperature: f32,
    pub fix_timeout: Duration,
    thresholds: SimilarityThresholds,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            enable_validation: true,
            enable_fix: true,
            use_cache: true,
            fix_temperature: DEFAULT_FIX_TEMPERATURE,
            fix_timeout: DEFAULT_FIX_TIMEOUT,
            thresholds: SimilarityThresholds::default(),
        }
    }
}

impl AgentConfig {
    #[must_use]
    pub fn with_validation(mut self, enabled: bool) -> Self {
        self.enable_validation = enabled;
        self
    }

    #[must_use]
    pub fn with_fix(mut self, enabled: bool) -> Self {
        self.enable_fix = enabled;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    #[must_use]
    pub fn with_fix_temperature(mut self, temperature: f32) -> Self {
        self.fix_temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_fix_timeout(mut self, timeout: Duration) -> Self {
        self.fix_timeout = timeout;
        self
    }

    /// Set similarity thresholds, rejecting out-of-range or misordered values.
    pub fn with_thresholds(mut self, similarity: f64, duplicate: f64) -> Result<Self, InputError> {
        self.thresholds = SimilarityThresholds::new(similarity, duplicate)?;
        Ok(self)
    }

    pub fn thresholds(&self) -> SimilarityThresholds {
        self.thresholds
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_temperature("fix_temperature", self.fix_temperature)?;
        if self.fix_timeout.is_zero() {
            return Err(ConfigError::new("fix_timeout", "must be greater than zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_generation_defaults() {
        let config = GenerationConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, GenerationConfig::default());
        assert_eq!(config.cache_ttl, Duration::from_secs(86_400));
        assert_eq!(config.cache_prefix, "storymap");
    }

    #[test]
    fn test_generation_from_lookup() {
        let config = GenerationConfig::from_lookup(lookup(&[
            ("API_TEMPERATURE", "0.2"),
            ("STORYMAP_LANGUAGE", "ru"),
            ("STORYMAP_TIMEOUT_SECS", "15"),
        ]))
        .unwrap();
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.language, Language::Russian);
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_generation_rejects_bad_values() {
        let err = GenerationConfig::from_lookup(lookup(&[("API_TEMPERATURE", "hot")])).unwrap_err();
        assert_eq!(err.field, "API_TEMPERATURE");

        let err = GenerationConfig::from_lookup(lookup(&[("STORYMAP_LANGUAGE", "klingon")])).unwrap_err();
        assert_eq!(err.field, "STORYMAP_LANGUAGE");

        let err = GenerationConfig::from_lookup(lookup(&[("API_TEMPERATURE", "3.5")])).unwrap_err();
        assert_eq!(err.field, "temperature");

        let err = GenerationConfig::from_lookup(lookup(&[("STORYMAP_TIMEOUT_SECS", "0")])).unwrap_err();
        assert_eq!(err.field, "timeout");
    }

    #[test]
    fn test_agent_thresholds() {
        let config = AgentConfig::default().with_thresholds(0.8, 0.95).unwrap();
        assert_eq!(config.thresholds().similarity(), 0.8);
        assert_eq!(config.thresholds().duplicate(), 0.95);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_agent_thresholds_out_of_range() {
        let err = AgentConfig::default().with_thresholds(0.4, 0.9).unwrap_err();
        assert!(matches!(err, InputError::ThresholdOutOfRange { name: "similarity", .. }));

        let err = AgentConfig::default().with_thresholds(0.7, 1.2).unwrap_err();
        assert!(matches!(err, InputError::ThresholdOutOfRange { name: "duplicate", .. }));
    }

    #[test]
    fn test_agent_thresholds_misordered() {
        let err = AgentConfig::default().with_thresholds(0.95, 0.85).unwrap_err();
        assert_eq!(err, InputError::ThresholdOrdering { similarity: 0.95, duplicate: 0.85 });
    }

    #[test]
    fn test_agent_rejects_bad_fix_settings() {
        let err = AgentConfig::default().with_fix_temperature(2.5).validate().unwrap_err();
        assert_eq!(err.field, "fix_temperature");

        let err = AgentConfig::default().with_fix_timeout(Duration::ZERO).validate().unwrap_err();
        assert_eq!(err.field, "fix_timeout");
    }
}
