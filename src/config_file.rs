//! Environment file handling for blt

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors that can occur while loading the environment file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("bltenv.yaml not found in {0} or its parents, please create one.")]
    DefaultNotFound(PathBuf),
    #[error("environment file not found on given path: {0}")]
    NotFound(PathBuf),
    #[error("Unknown working directory: {0}")]
    UnknownWorkingDirectory(String),
    #[error("Unable to parse YAML environment file {path}: {source}")]
    Yaml {
        source: serde_yaml::Error,
        path: PathBuf,
    },
    #[error("Unable to parse JSON environment file {path}: {source}")]
    Json {
        source: serde_json::Error,
        path: PathBuf,
    },
    #[error("CONFIG is not defined in {0}")]
    MissingConfiguration(PathBuf),
    #[error("Unable to import `{target}` from {path}: {reason}")]
    Import {
        target: String,
        path: PathBuf,
        reason: String,
    },
    #[error("Invalid environment file: {0}")]
    Validation(String),
}

/// One entry of the `imports` list.
///
/// A plain string imports under its default binding; the mapping form picks the binding.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ConfigImport {
    Target(String),
    Aliased {
        from: String,
        #[serde(rename = "as")]
        binding: Option<String>,
    },
}

impl ConfigImport {
    #[must_use]
    pub fn target(&self) -> &str {
        match self {
            ConfigImport::Target(target) | ConfigImport::Aliased { from: target, .. } => target,
        }
    }

    #[must_use]
    pub fn binding(&self) -> Option<&str> {
        match self {
            ConfigImport::Target(_) => None,
            ConfigImport::Aliased { binding, .. } => binding.as_deref(),
        }
    }

    /// Targets with a config file extension are files, everything else names a built-in tool.
    #[must_use]
    pub fn is_file(&self) -> bool {
        Path::new(self.target())
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
    }
}

/// A command declared in the environment file
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ConfigCommand {
    #[serde(default)]
    pub doc: String,
    pub cwd: Option<PathBuf>,
    /// Scalar values; numbers and booleans are rendered like settings
    pub env: Option<BTreeMap<String, Value>>,
    pub run: Vec<String>,
}

/// A command group declared in the environment file
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ConfigGroup {
    #[serde(default)]
    pub commands: BTreeMap<String, ConfigCommand>,
}

/// Root structure of an environment file (`bltenv.yaml`)
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    pub blt_version: Option<String>,
    #[serde(default)]
    pub imports: Vec<ConfigImport>,
    #[serde(default)]
    pub groups: BTreeMap<String, ConfigGroup>,
    #[serde(rename = "CONFIG", alias = "config")]
    pub config: Option<BTreeMap<String, Map<String, Value>>>,
}

/// List of supported environment file names, in lookup order
pub const FILENAMES: [&str; 3] = ["bltenv.yaml", "bltenv.yml", "bltenv.json"];

impl ConfigFile {
    /// Loads and parses an environment file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` if the file cannot be read, or
    /// `ConfigError::Yaml`/`ConfigError::Json` if parsing fails.
    pub fn from_file(file: &Path) -> Result<ConfigFile, ConfigError> {
        let contents = std::fs::read_to_string(file)
            .map_err(|_| ConfigError::NotFound(file.to_path_buf()))?;
        let config: ConfigFile = if file.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Json {
                source: e,
                path: file.to_path_buf(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Yaml {
                source: e,
                path: file.to_path_buf(),
            })?
        };
        Ok(config)
    }

    /// Searches for an environment file in the current directory and its parents.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownWorkingDirectory` if the cwd cannot be determined,
    /// or `ConfigError::DefaultNotFound` if no environment file is found.
    pub fn find_config() -> Result<PathBuf, ConfigError> {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
        Self::find_config_from(&cwd)
    }

    /// Searches `start` and its parents for an environment file.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DefaultNotFound` if no environment file is found.
    pub fn find_config_from(start: &Path) -> Result<PathBuf, ConfigError> {
        let mut path = start.to_path_buf();
        debug!("Searching for environment file in {}", start.display());
        loop {
            for file in &FILENAMES {
                let config_path = path.join(file);
                if config_path.is_file() {
                    info!("Found environment file: {}", config_path.display());
                    return Ok(config_path);
                }
            }
            if !path.pop() {
                return Err(ConfigError::DefaultNotFound(start.to_path_buf()));
            }
        }
    }
}

/// Resolve the environment file to load: the given path, or the auto-detected default.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` for a missing explicit path and
/// `ConfigError::DefaultNotFound` when the default file cannot be found.
pub fn locate(file: Option<&str>) -> Result<PathBuf, ConfigError> {
    let Some(file) = file else {
        return ConfigFile::find_config();
    };
    let path = PathBuf::from(file);
    if path.is_file() {
        return Ok(path);
    }
    if FILENAMES.contains(&file) {
        let cwd = std::env::current_dir()
            .map_err(|e| ConfigError::UnknownWorkingDirectory(e.to_string()))?;
        return Err(ConfigError::DefaultNotFound(cwd));
    }
    Err(ConfigError::NotFound(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_file_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bltenv.json");
        std::fs::write(
            &path,
            r#"{
                "imports": ["heroku", {"from": "other.yaml", "as": "other"}],
                "CONFIG": {"staging": {"heroku": {"app": "pubweb-staging"}}}
            }"#,
        )
        .unwrap();
        let config = ConfigFile::from_file(&path).unwrap();
        assert_eq!(config.imports.len(), 2);
        assert_eq!(config.imports[1].binding(), Some("other"));
        assert!(config.imports[1].is_file());
        assert!(!config.imports[0].is_file());
        assert!(config.config.unwrap().contains_key("staging"));
    }

    #[test]
    fn test_from_file_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bltenv.yaml");
        std::fs::write(
            &path,
            "groups:\n  Local:\n    commands:\n      hello:\n        doc: Says hello\n        run: [echo hello]\nconfig:\n  local: {}\n",
        )
        .unwrap();
        let config = ConfigFile::from_file(&path).unwrap();
        assert_eq!(config.groups["Local"].commands["hello"].run, vec!["echo hello"]);
        assert!(config.config.unwrap().contains_key("local"));
    }

    #[test]
    fn test_scalar_environment_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bltenv.yaml");
        std::fs::write(&path, "CONFIG:\n  staging: just-a-string\n").unwrap();
        assert!(matches!(
            ConfigFile::from_file(&path),
            Err(ConfigError::Yaml { .. })
        ));
    }

    #[test]
    fn test_find_config_walks_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("bltenv.yml"), "CONFIG: {}\n").unwrap();
        let found = ConfigFile::find_config_from(&nested).unwrap();
        assert_eq!(found, dir.path().join("bltenv.yml"));
    }

    #[test]
    fn test_not_found_messages_differ() {
        let explicit = locate(Some("/definitely/missing/env.yaml")).unwrap_err();
        assert_eq!(
            explicit.to_string(),
            "environment file not found on given path: /definitely/missing/env.yaml"
        );
        let dir = tempfile::tempdir().unwrap();
        let default = ConfigFile::find_config_from(dir.path()).unwrap_err();
        assert!(matches!(default, ConfigError::DefaultNotFound(_)));
        assert!(default.to_string().contains("please create one"));
    }
}
