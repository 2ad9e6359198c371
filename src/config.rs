use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::rules::RuleTable;

/// Knobs for a single graph build. Every field has a default, so an empty
/// JSON object is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Label non-negative numeric levels from 1 instead of 0.
    pub one_based_levels: bool,
    /// JSON rule file replacing the built-in table.
    pub rules: Option<PathBuf>,
    /// Qualify generated sidewalk and path names with a nearby street name.
    pub qualify_names: bool,
}

impl BuildConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn rule_table(&self) -> Result<RuleTable> {
        match &self.rules {
            Some(path) => RuleTable::from_json_file(path),
            None => RuleTable::builtin(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_object_is_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let config = BuildConfig::from_json_file(file.path()).unwrap();
        assert!(!config.one_based_levels);
        assert!(config.rules.is_none());
        assert!(config.rule_table().unwrap().rules().len() > 100);
    }

    #[test]
    fn test_custom_rules_path() {
        let mut rules = tempfile::NamedTempFile::new().unwrap();
        write!(
            rules,
            r#"{{"properties": [{{"specifier": "highway=path", "permission": "PEDESTRIAN"}}]}}"#
        )
        .unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = serde_json::json!({
            "one_based_levels": true,
            "rules": rules.path(),
        });
        write!(file, "{json}").unwrap();

        let config = BuildConfig::from_json_file(file.path()).unwrap();
        assert!(config.one_based_levels);
        assert_eq!(config.rule_table().unwrap().rules().len(), 1);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = BuildConfig::from_json_file("/nonexistent/streetgraph.json").unwrap_err();
        assert!(matches!(err, crate::error::BuildError::Io(_)));
    }
}
