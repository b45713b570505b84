//! Typed access to the settings of one environment
//!
//! Settings are the `CONFIG.<environment>` mapping of the environment file. Nothing is
//! validated up front: a command that needs a key fails with
//! [`CommandError::MissingSetting`] at the moment it reads it.

use serde_json::{Map, Value};

use crate::commands::CommandError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings(Map<String, Value>);

impl From<Map<String, Value>> for Settings {
    fn from(map: Map<String, Value>) -> Self {
        Settings(map)
    }
}

/// Render a scalar JSON value the way it should appear on a command line.
pub(crate) fn render_scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

impl Settings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Look up a dotted path such as `heroku.app`.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        let mut segments = path.split('.');
        let first = self.0.get(segments.next()?)?;
        segments.try_fold(first, |value, segment| value.get(segment))
    }

    #[must_use]
    pub fn contains(&self, path: &str) -> bool {
        self.lookup(path).is_some()
    }

    /// # Errors
    ///
    /// Returns `CommandError::MissingSetting` if the path is absent, or
    /// `CommandError::InvalidSetting` if it is not a string.
    pub fn str(&self, path: &str) -> Result<&str, CommandError> {
        match self.lookup(path) {
            Some(Value::String(s)) => Ok(s.as_str()),
            Some(_) => Err(CommandError::InvalidSetting {
                key: path.to_string(),
                expected: "a string",
            }),
            None => Err(CommandError::MissingSetting(path.to_string())),
        }
    }

    /// Like [`Settings::str`], but numbers and booleans are accepted and rendered.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::MissingSetting` if the path is absent, or
    /// `CommandError::InvalidSetting` if it holds a list, mapping or null.
    pub fn scalar(&self, path: &str) -> Result<String, CommandError> {
        let value = self
            .lookup(path)
            .ok_or_else(|| CommandError::MissingSetting(path.to_string()))?;
        render_scalar(value).ok_or_else(|| CommandError::InvalidSetting {
            key: path.to_string(),
            expected: "a string, number or boolean",
        })
    }

    /// # Errors
    ///
    /// Returns `CommandError::MissingSetting` if the path is absent, or
    /// `CommandError::InvalidSetting` if it is not a list of scalars.
    pub fn list(&self, path: &str) -> Result<Vec<String>, CommandError> {
        let invalid = || CommandError::InvalidSetting {
            key: path.to_string(),
            expected: "a list of strings",
        };
        match self.lookup(path) {
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| render_scalar(item).ok_or_else(invalid))
                .collect(),
            Some(_) => Err(invalid()),
            None => Err(CommandError::MissingSetting(path.to_string())),
        }
    }

    /// Entries of a mapping of scalars, in key order.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::MissingSetting` if the path is absent, or
    /// `CommandError::InvalidSetting` if it is not a mapping of scalars.
    pub fn pairs(&self, path: &str) -> Result<Vec<(String, String)>, CommandError> {
        let invalid = || CommandError::InvalidSetting {
            key: path.to_string(),
            expected: "a mapping of strings",
        };
        match self.lookup(path) {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(key, value)| {
                    render_scalar(value)
                        .map(|v| (key.clone(), v))
                        .ok_or_else(invalid)
                })
                .collect(),
            Some(_) => Err(invalid()),
            None => Err(CommandError::MissingSetting(path.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn settings() -> Settings {
        let Value::Object(map) = json!({
            "heroku": {
                "app": "pubweb-staging",
                "addons": {"papertrail": "choklad", "newrelic": "standard"},
                "post_deploy": ["python manage.py syncdb", "python manage.py migrate"],
                "workers": 2
            }
        }) else {
            unreachable!()
        };
        Settings::from(map)
    }

    #[test]
    fn test_dotted_lookup() {
        let settings = settings();
        assert_eq!(settings.str("heroku.app").unwrap(), "pubweb-staging");
        assert!(settings.contains("heroku.addons.newrelic"));
        assert!(!settings.contains("heroku.domains"));
    }

    #[test]
    fn test_missing_setting_names_the_path() {
        match settings().str("heroku.git_remote") {
            Err(CommandError::MissingSetting(key)) => assert_eq!(key, "heroku.git_remote"),
            other => panic!("Expected MissingSetting, got: {other:?}"),
        }
    }

    #[test]
    fn test_wrong_type_is_invalid() {
        assert!(matches!(
            settings().str("heroku.addons"),
            Err(CommandError::InvalidSetting { .. })
        ));
        assert_eq!(settings().scalar("heroku.workers").unwrap(), "2");
    }

    #[test]
    fn test_pairs_are_key_ordered() {
        assert_eq!(
            settings().pairs("heroku.addons").unwrap(),
            vec![
                ("newrelic".to_string(), "standard".to_string()),
                ("papertrail".to_string(), "choklad".to_string()),
            ]
        );
        assert_eq!(settings().list("heroku.post_deploy").unwrap().len(), 2);
    }
}
