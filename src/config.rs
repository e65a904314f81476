use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::{MappingError, Result};

/// Free-form provider settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, String>);

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// Parses the value for `key`; `Ok(None)` when the key is absent.
    pub fn get_parsed<T>(&self, key: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    MappingError::InvalidArgument(format!("setting '{}': {}", key, e))
                })
            })
            .transpose()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Mapper configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Logical name, used in log spans
    pub name: String,

    /// Storage provider identifier
    pub provider: String,

    /// Provider specific settings
    pub settings: Settings,

    /// Leave embedded objects unset when none of their fields is stored
    pub strict_embedded_nulls: bool,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            name: "recordmap".to_string(),
            provider: "memory".to_string(),
            settings: Settings::new(),
            strict_embedded_nulls: true,
        }
    }
}

impl MapperConfig {
    /// Create a configuration for a provider
    pub fn new(provider: &str) -> Self {
        Self {
            provider: provider.to_string(),
            ..Self::default()
        }
    }

    /// Set the logical name
    pub fn name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    /// Add a provider setting
    pub fn setting(mut self, key: &str, value: &str) -> Self {
        self.settings.insert(key, value);
        self
    }

    /// Set embedded null handling
    pub fn strict_embedded_nulls(mut self, strict: bool) -> Self {
        self.strict_embedded_nulls = strict;
        self
    }

    /// Parse from JSON
    ///
    /// Missing keys take their default values.
    ///
    /// ```
    /// use recordmap::MapperConfig;
    ///
    /// let config = MapperConfig::from_json(r#"{"provider": "mongodb", "settings": {"id.field": "_id"}}"#).unwrap();
    /// assert_eq!(config.provider, "mongodb");
    /// assert_eq!(config.settings.get("id.field"), Some("_id"));
    /// assert!(config.strict_embedded_nulls);
    /// ```
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.provider.trim().is_empty() {
            return Err(MappingError::InvalidArgument(
                "provider must not be empty".to_string(),
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder() {
        let config = MapperConfig::new("memory")
            .name("people")
            .setting("id.start", "100")
            .strict_embedded_nulls(false);

        assert_eq!(config.name, "people");
        assert_eq!(config.settings.get_parsed::<i64>("id.start").unwrap(), Some(100));
        assert_eq!(config.settings.get_or("id.field", "id"), "id");
        assert!(!config.strict_embedded_nulls);
    }

    #[test]
    fn test_invalid_setting() {
        let config = MapperConfig::default().setting("id.start", "ten");
        assert!(config.settings.get_parsed::<i64>("id.start").is_err());
        assert_eq!(config.settings.get_parsed::<i64>("missing").unwrap(), None);
    }

    #[test]
    fn test_from_json_rejects_empty_provider() {
        assert!(MapperConfig::from_json(r#"{"provider": " "}"#).is_err());
        assert!(MapperConfig::from_json("not json").is_err());
    }
}
