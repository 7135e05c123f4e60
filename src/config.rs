use serde::{Deserialize, Serialize};

use crate::error::{ProfileError, Result};
use crate::telemetry::ids::IdStrategy;

pub const ENV_ENABLED: &str = "PROFILR_ENABLED";
pub const ENV_IDS: &str = "PROFILR_IDS";

/// Startup configuration of a [`crate::Profiler`].
///
/// Profiling is **disabled** by default; hosts opt in through `enabled`,
/// `PROFILR_ENABLED` or [`crate::set_enabled`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    pub enabled: bool,
    pub id_strategy: IdStrategy,
}

impl ProfilerConfig {
    pub fn enabled() -> Self {
        Self {
            enabled: true,
            ..Self::default()
        }
    }

    /// Reads `PROFILR_ENABLED` and `PROFILR_IDS`, falling back to defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_ENABLED) {
            config.enabled = parse_flag(ENV_ENABLED, &raw)?;
        }
        if let Some(raw) = lookup(ENV_IDS) {
            config.id_strategy = match raw.trim().to_ascii_lowercase().as_str() {
                "sequential" => IdStrategy::Sequential,
                "random" | "uuid" => IdStrategy::Random,
                _ => {
                    return Err(ProfileError::InvalidConfig {
                        key: ENV_IDS,
                        value: raw,
                    })
                }
            };
        }

        Ok(config)
    }
}

fn parse_flag(key: &'static str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" | "" => Ok(false),
        _ => Err(ProfileError::InvalidConfig {
            key,
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ProfilerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ProfilerConfig::default());
        assert!(!config.enabled);
        assert_eq!(config.id_strategy, IdStrategy::Sequential);
    }

    #[test]
    fn test_parses_env_values() {
        let config =
            ProfilerConfig::from_lookup(lookup(&[(ENV_ENABLED, "ON"), (ENV_IDS, "random")])).unwrap();
        assert!(config.enabled);
        assert_eq!(config.id_strategy, IdStrategy::Random);
    }

    #[test]
    fn test_rejects_unknown_values() {
        let err = ProfilerConfig::from_lookup(lookup(&[(ENV_ENABLED, "maybe")])).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfig { key: ENV_ENABLED, .. }));

        let err = ProfilerConfig::from_lookup(lookup(&[(ENV_IDS, "snowflake")])).unwrap_err();
        assert!(matches!(err, ProfileError::InvalidConfig { key: ENV_IDS, .. }));
    }

    #[test]
    fn test_deserializes_partial_json() {
        let config: ProfilerConfig = serde_json::from_str(r#"{ "enabled": true }"#).unwrap();
        assert_eq!(config, ProfilerConfig::enabled());

        let config: ProfilerConfig = serde_json::from_str(r#"{ "id_strategy": "random" }"#).unwrap();
        assert!(!config.enabled);
        assert_eq!(config.id_strategy, IdStrategy::Random);
    }
}
