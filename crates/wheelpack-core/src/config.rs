//! Run configuration.
//!
//! Everything the driver needs besides the requirement list. Values come
//! from [`Config::default`], optionally overlaid by a TOML file, and finally
//! by command-line flags in the CLI.
//!
//! ```toml
//! policy = "first-success"
//! promote = true
//! timeout_secs = 300
//!
//! [strategy]
//! platforms = ["manylinux2014_x86_64"]
//! python_versions = ["3.12"]
//!
//! [tool]
//! program = "python3"
//! args = ["-m", "pip"]
//!
//! [overrides]
//! pyautogui = "pyautogui setuptools wheel"
//!
//! [script]
//! format = "shell"
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::script::ScriptFlavor;
use crate::strategy::StrategyMatrix;

/// When to stop trying strategies for a requirement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchPolicy {
    /// Stop after the first successful attempt.
    FirstSuccess,
    /// Try every strategy to collect wheels for every target.
    #[default]
    Exhaustive,
}

impl FromStr for FetchPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "first-success" | "first" => Ok(Self::FirstSuccess),
            "exhaustive" | "all" => Ok(Self::Exhaustive),
            other => Err(format!(
                "unknown policy '{other}' (expected 'first-success' or 'exhaustive')"
            )),
        }
    }
}

impl fmt::Display for FetchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstSuccess => f.write_str("first-success"),
            Self::Exhaustive => f.write_str("exhaustive"),
        }
    }
}

/// External fetch tool command line prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ToolConfig {
    /// Program to execute.
    pub program: String,
    /// Arguments placed before `download`, e.g. `["-m", "pip"]`.
    pub args: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            program: "pip".into(),
            args: Vec::new(),
        }
    }
}

/// Generated install script settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScriptConfig {
    /// Output path; defaults to [`ScriptFlavor::default_file_name`].
    pub path: Option<PathBuf>,
    /// Script dialect.
    pub format: ScriptFlavor,
}

/// Full run configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Strategy cross product inputs.
    pub strategy: StrategyMatrix,
    /// Continuation policy.
    pub policy: FetchPolicy,
    /// Copy the first successful download set into the destination root.
    pub promote: bool,
    /// Per-invocation timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Fetch tool invocation.
    pub tool: ToolConfig,
    /// Bare name -> replacement specifier for packages with incomplete
    /// upstream metadata.
    pub overrides: BTreeMap<String, String>,
    /// Install script output.
    pub script: ScriptConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            strategy: StrategyMatrix::default(),
            policy: FetchPolicy::default(),
            promote: false,
            timeout_secs: None,
            tool: ToolConfig::default(),
            overrides: default_overrides(),
            script: ScriptConfig::default(),
        }
    }
}

fn default_overrides() -> BTreeMap<String, String> {
    BTreeMap::from([(
        "pyautogui".to_string(),
        "pyautogui setuptools wheel".to_string(),
    )])
}

impl Config {
    /// Load a config file; missing keys fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read, or
    /// [`ConfigError::Parse`] if it is not valid for this schema.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Per-invocation timeout, if any. Zero disables it.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Where the install script is written.
    pub fn script_path(&self) -> PathBuf {
        self.script
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(self.script.format.default_file_name()))
    }

    /// Replacement specifier for a bare package name (case-insensitive).
    pub fn override_for(&self, bare_name: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(bare_name))
            .map(|(_, spec)| spec.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.policy, FetchPolicy::Exhaustive);
        assert!(!config.promote);
        assert_eq!(config.timeout(), None);
        assert_eq!(config.tool.program, "pip");
        assert_eq!(
            config.script_path(),
            PathBuf::from("installation-instructions.bat")
        );
    }

    #[test]
    fn test_override_lookup_ignores_case() {
        let config = Config::default();
        assert_eq!(
            config.override_for("PyAutoGUI"),
            Some("pyautogui setuptools wheel")
        );
        assert_eq!(config.override_for("requests"), None);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            policy = "first-success"
            timeout_secs = 30

            [strategy]
            platforms = ["manylinux2014_x86_64"]

            [script]
            format = "shell"
            "#,
        )
        .unwrap();
        assert_eq!(config.policy, FetchPolicy::FirstSuccess);
        assert_eq!(config.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.strategy.platforms, vec!["manylinux2014_x86_64"]);
        assert_eq!(config.strategy.implementations, vec!["cp", "py"]);
        assert_eq!(
            config.script_path(),
            PathBuf::from("installation-instructions.sh")
        );
        assert!(config.override_for("pyautogui").is_some());
    }

    #[test]
    fn test_overrides_table_replaces_defaults() {
        let config: Config = toml::from_str("[overrides]\nfoo = \"foo bar\"\n").unwrap();
        assert_eq!(config.override_for("foo"), Some("foo bar"));
        assert_eq!(config.override_for("pyautogui"), None);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = Config {
            timeout_secs: Some(0),
            ..Config::default()
        };
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_load_rejects_unknown_keys() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("wheelpack.toml");
        std::fs::write(&path, "polcy = \"exhaustive\"\n").unwrap();
        assert!(matches!(
            Config::load(&path).unwrap_err(),
            ConfigError::Parse { .. }
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = tempdir().unwrap();
        assert!(matches!(
            Config::load(&tmp.path().join("missing.toml")).unwrap_err(),
            ConfigError::Read { .. }
        ));
    }

    #[test]
    fn test_policy_from_str() {
        assert_eq!(
            "first-success".parse::<FetchPolicy>().unwrap(),
            FetchPolicy::FirstSuccess
        );
        assert_eq!(
            "Exhaustive".parse::<FetchPolicy>().unwrap(),
            FetchPolicy::Exhaustive
        );
        assert!("sometimes".parse::<FetchPolicy>().is_err());
    }
}
