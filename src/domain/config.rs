use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for an order-of-battle directory.
///
/// This struct holds settings that control how units are managed: file
/// handling policy, echelon-ordering validation, and task-force UIC
/// generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Whether to allow the units directory to contain markdown files with
    /// names that are not valid UICs.
    pub allow_unrecognised: bool,

    /// Whether `validate` treats echelon-ordering violations (a child whose
    /// echelon is not strictly below its parent's) as errors rather than
    /// warnings.
    pub enforce_echelon_order: bool,

    /// The number of digits in the serial component of generated task-force
    /// UICs.
    ///
    /// Serials are padded to this width with leading zeros. For example,
    /// 'TF0001' (4 digits) or 'TF001' (3 digits).
    task_force_digits: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            allow_unrecognised: false,
            enforce_echelon_order: false,
            task_force_digits: default_task_force_digits(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the number of digits for padding task-force serials.
    #[must_use]
    pub const fn task_force_digits(&self) -> usize {
        self.task_force_digits
    }
}

const fn default_task_force_digits() -> usize {
    4
}

/// The serialized versions of the configuration.
/// This allows for future changes to the configuration format and to the domain
/// type without breaking compatibility.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        allow_unrecognised: bool,

        #[serde(default)]
        enforce_echelon_order: bool,

        #[serde(default = "default_task_force_digits")]
        task_force_digits: usize,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                allow_unrecognised,
                enforce_echelon_order,
                task_force_digits,
            } => Self {
                allow_unrecognised,
                enforce_echelon_order,
                task_force_digits,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            allow_unrecognised: config.allow_unrecognised,
            enforce_echelon_order: config.enforce_echelon_order,
            task_force_digits: config.task_force_digits,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\nallow_unrecognised = true\nenforce_echelon_order = true\ntask_force_digits = 3\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert!(config.allow_unrecognised);
        assert!(config.enforce_echelon_order);
        assert_eq!(config.task_force_digits(), 3);
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\ntask_force_digits = \"four\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        // Tests that deserialising an empty file returns the default configuration.
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }
}
