//! Download strategy matrix.
//!
//! A strategy is one set of `pip download` target flags. The matrix is the
//! cross product of platforms, interpreter versions, ABI tags,
//! implementations and binary-only flags, minus combinations pip would
//! reject, followed by a single [`StrategyConstraint::Default`] attempt that
//! lets pip use the invoking interpreter's own tags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// ABI tag accepted by every implementation.
pub const ABI_NONE: &str = "none";

/// Implementation tag for pure-Python builds.
pub const PURE_IMPLEMENTATION: &str = "py";

/// Flag restricting pip to wheels only.
pub const ONLY_BINARY_FLAG: &str = "--only-binary=:all:";

/// Inputs of the strategy cross product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StrategyMatrix {
    /// Target platform tags, e.g. `any`, `win_amd64`.
    pub platforms: Vec<String>,
    /// Interpreter version tokens, e.g. `3.13` or `3`.
    pub python_versions: Vec<String>,
    /// Implementation tags, e.g. `cp`, `py`.
    pub implementations: Vec<String>,
    /// Binary-only variants to try; `true` adds [`ONLY_BINARY_FLAG`].
    pub binary_only: Vec<bool>,
    /// Prefix used when deriving interpreter-specific ABI tags.
    pub abi_prefix: String,
}

impl Default for StrategyMatrix {
    fn default() -> Self {
        Self {
            platforms: vec!["any".into(), "win_amd64".into()],
            python_versions: ["3.13", "3.12", "3.11", "3", "3.14", "3.15", "3.16"]
                .into_iter()
                .map(String::from)
                .collect(),
            implementations: vec!["cp".into(), PURE_IMPLEMENTATION.into()],
            binary_only: vec![true],
            abi_prefix: "cp".into(),
        }
    }
}

/// Target flags for a single fetch attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StrategyConstraint {
    /// Explicit cross-platform target.
    Targeted {
        /// `--platform`
        platform: String,
        /// `--python-version`
        python_version: String,
        /// `--abi`
        abi: String,
        /// `--implementation`
        implementation: String,
        /// Adds `--only-binary=:all:`
        binary_only: bool,
    },
    /// No target flags; pip uses the running interpreter.
    Default,
}

impl StrategyConstraint {
    /// Render as `pip download` arguments.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::Default => Vec::new(),
            Self::Targeted {
                platform,
                python_version,
                abi,
                implementation,
                binary_only,
            } => {
                let mut args = vec![
                    "--platform".to_string(),
                    platform.clone(),
                    "--python-version".to_string(),
                    python_version.clone(),
                    "--abi".to_string(),
                    abi.clone(),
                    "--implementation".to_string(),
                    implementation.clone(),
                ];
                if *binary_only {
                    args.push(ONLY_BINARY_FLAG.to_string());
                }
                args
            }
        }
    }

    /// Returns `true` for the environment-default attempt.
    pub fn is_default(&self) -> bool {
        matches!(self, Self::Default)
    }
}

impl fmt::Display for StrategyConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("Current Env / Default"),
            Self::Targeted { .. } => f.write_str(&self.to_args().join(" ")),
        }
    }
}

/// Derive the interpreter-specific ABI tag for a version token.
///
/// ```
/// use wheelpack_core::strategy::specific_abi;
///
/// assert_eq!(specific_abi("cp", "3.13"), "cp313");
/// assert_eq!(specific_abi("cp", "3"), "abi3");
/// assert_eq!(specific_abi("cp", "310"), "cp310");
/// ```
pub fn specific_abi(prefix: &str, version: &str) -> String {
    if version.contains('.') {
        format!("{prefix}{}", version.replace('.', ""))
    } else if version.chars().count() == 1 {
        format!("abi{version}")
    } else {
        format!("{prefix}{version}")
    }
}

/// Whether an ABI tag only makes sense for a compiled interpreter build.
fn is_interpreter_specific(abi: &str, prefix: &str) -> bool {
    abi != ABI_NONE && (abi.starts_with(prefix) || abi.starts_with("cp") || abi.starts_with("abi"))
}

/// Expand the matrix into an ordered strategy list.
///
/// The result always ends with exactly one [`StrategyConstraint::Default`].
pub fn generate(matrix: &StrategyMatrix) -> Vec<StrategyConstraint> {
    let mut strategies = Vec::new();

    for platform in &matrix.platforms {
        for version in &matrix.python_versions {
            let abis = [
                ABI_NONE.to_string(),
                specific_abi(&matrix.abi_prefix, version),
            ];
            for abi in &abis {
                for implementation in &matrix.implementations {
                    if implementation == PURE_IMPLEMENTATION
                        && is_interpreter_specific(abi, &matrix.abi_prefix)
                    {
                        continue;
                    }
                    for &binary_only in &matrix.binary_only {
                        strategies.push(StrategyConstraint::Targeted {
                            platform: platform.clone(),
                            python_version: version.clone(),
                            abi: abi.clone(),
                            implementation: implementation.clone(),
                            binary_only,
                        });
                    }
                }
            }
        }
    }

    strategies.push(StrategyConstraint::Default);
    tracing::debug!("Generated {} download strategies", strategies.len());
    strategies
}
