//! Per-environment settings extracted from the `CONFIG` section

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde_json::{Value, json};

use crate::config_file::{ConfigError, ConfigFile};
use crate::settings::Settings;

/// Key under which run metadata is injected; not allowed as an environment name.
pub const RESERVED_KEY: &str = "blt";
/// Key under which the selected environment's name is injected.
pub const ENVTYPE_KEY: &str = "blt_envtype";
pub const DEFAULT_ENVIRONMENT: &str = "local";
pub const PRODUCTION: &str = "production";

pub const SHORTCUTS: [(&str, &str); 3] = [("p", PRODUCTION), ("s", "staging"), ("l", "local")];

/// Expand `p`, `s` and `l`; any other name is returned as is.
#[must_use]
pub fn expand_shortcut(name: &str) -> &str {
    SHORTCUTS
        .iter()
        .find(|(short, _)| *short == name)
        .map_or(name, |(_, full)| *full)
}

/// Where the settings came from and when they were loaded
#[derive(Debug, Clone)]
pub struct RunMetadata {
    pub env_file: PathBuf,
    pub updated: DateTime<Local>,
}

impl RunMetadata {
    fn to_value(&self) -> Value {
        json!({
            "env_file": self.env_file.display().to_string(),
            "updated": self.updated.to_rfc3339(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct ConfigurationMap {
    environments: BTreeMap<String, Settings>,
    metadata: RunMetadata,
}

impl ConfigurationMap {
    /// Read the `CONFIG` section of `file`, loaded from `source`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingConfiguration` if the file has no `CONFIG`, and
    /// `ConfigError::Validation` if an environment uses the reserved name.
    pub fn extract(file: &ConfigFile, source: &Path) -> Result<Self, ConfigError> {
        let config = file
            .config
            .as_ref()
            .ok_or_else(|| ConfigError::MissingConfiguration(source.to_path_buf()))?;
        if config.contains_key(RESERVED_KEY) {
            return Err(ConfigError::Validation(format!(
                "'{RESERVED_KEY}' is reserved and cannot be used as an environment name"
            )));
        }
        let environments = config
            .iter()
            .map(|(name, settings)| (name.clone(), Settings::from(settings.clone())))
            .collect();
        Ok(Self {
            environments,
            metadata: RunMetadata {
                env_file: source.to_path_buf(),
                updated: Local::now(),
            },
        })
    }

    #[must_use]
    pub fn contains(&self, environment: &str) -> bool {
        self.environments.contains_key(environment)
    }

    #[must_use]
    pub fn get(&self, environment: &str) -> Option<&Settings> {
        self.environments.get(environment)
    }

    pub fn environments(&self) -> impl Iterator<Item = &str> {
        self.environments.keys().map(String::as_str)
    }

    #[must_use]
    pub fn metadata(&self) -> &RunMetadata {
        &self.metadata
    }

    /// A copy of the environment's settings with `blt_envtype` and `blt` added.
    #[must_use]
    pub fn settings_for(&self, environment: &str) -> Option<Settings> {
        let mut settings = self.environments.get(environment)?.clone();
        settings.insert(ENVTYPE_KEY, environment);
        settings.insert(RESERVED_KEY, self.metadata.to_value());
        Some(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> ConfigFile {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_expand_shortcut() {
        assert_eq!(expand_shortcut("p"), "production");
        assert_eq!(expand_shortcut("s"), "staging");
        assert_eq!(expand_shortcut("l"), "local");
        assert_eq!(expand_shortcut("qa"), "qa");
    }

    #[test]
    fn test_missing_config_rejected() {
        let file = parse("imports: [heroku]\n");
        match ConfigurationMap::extract(&file, Path::new("/srv/bltenv.yaml")) {
            Err(ConfigError::MissingConfiguration(path)) => {
                assert_eq!(path, PathBuf::from("/srv/bltenv.yaml"));
            }
            other => panic!("Expected MissingConfiguration, got: {other:?}"),
        }
    }

    #[test]
    fn test_reserved_environment_rejected() {
        let file = parse("CONFIG:\n  blt: {}\n");
        assert!(matches!(
            ConfigurationMap::extract(&file, Path::new("bltenv.yaml")),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_settings_for_injects_metadata_without_mutating() {
        let file = parse("CONFIG:\n  staging:\n    heroku:\n      app: pubweb-staging\n  production: {}\n");
        let config = ConfigurationMap::extract(&file, Path::new("/srv/bltenv.yaml")).unwrap();
        assert_eq!(
            config.environments().collect::<Vec<_>>(),
            vec!["production", "staging"]
        );

        let settings = config.settings_for("staging").unwrap();
        assert_eq!(settings.str("blt_envtype").unwrap(), "staging");
        assert_eq!(settings.str("heroku.app").unwrap(), "pubweb-staging");
        assert_eq!(settings.str("blt.env_file").unwrap(), "/srv/bltenv.yaml");
        assert!(settings.contains("blt.updated"));

        let stored = config.get("staging").unwrap();
        assert!(!stored.contains("blt_envtype"));
        assert!(!stored.contains("blt"));
        assert!(config.settings_for("qa").is_none());
    }
}
