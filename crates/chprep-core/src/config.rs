use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "chprep.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrepConfig {
    #[serde(default)]
    pub contraction: ContractionConfig,
}

/// Tuning knobs for the contraction hierarchy builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContractionConfig {
    /// Nodes a single witness search may settle before giving up. Lower
    /// values build faster but insert more shortcuts.
    #[serde(default = "default_witness_settle_limit")]
    pub witness_settle_limit: usize,
    /// Emit a progress line every this many percent of contracted nodes.
    /// `0` disables intermediate lines.
    #[serde(default = "default_progress_percent")]
    pub progress_percent: u8,
}

impl Default for ContractionConfig {
    fn default() -> Self {
        Self {
            witness_settle_limit: default_witness_settle_limit(),
            progress_percent: default_progress_percent(),
        }
    }
}

const fn default_witness_settle_limit() -> usize {
    500
}

const fn default_progress_percent() -> u8 {
    10
}

/// Where the effective config came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Explicit(PathBuf),
    Project(PathBuf),
    User(PathBuf),
    Defaults,
}

/// Parse a config file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not valid TOML for
/// [`PrepConfig`].
pub fn load_config_file(path: &Path) -> Result<PrepConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<PrepConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Path of the per-user config file, if the platform has a config dir.
#[must_use]
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("chprep/config.toml"))
}

/// Resolve the effective config.
///
/// Precedence: `explicit`, then `chprep.toml` in `working_dir`, then the
/// user config file, then built-in defaults. Only the first file found is
/// read; files are not merged.
///
/// # Errors
///
/// Returns an error if `explicit` is given but unreadable, or if the
/// selected file fails to parse.
pub fn resolve_config(
    explicit: Option<&Path>,
    working_dir: &Path,
) -> Result<(PrepConfig, ConfigSource)> {
    if let Some(path) = explicit {
        let config = load_config_file(path)?;
        return Ok((config, ConfigSource::Explicit(path.to_path_buf())));
    }

    let project = working_dir.join(PROJECT_CONFIG_FILE);
    if project.is_file() {
        let config = load_config_file(&project)?;
        return Ok((config, ConfigSource::Project(project)));
    }

    if let Some(user) = user_config_path().filter(|p| p.is_file()) {
        let config = load_config_file(&user)?;
        return Ok((config, ConfigSource::User(user)));
    }

    debug!("no config file found, using defaults");
    Ok((PrepConfig::default(), ConfigSource::Defaults))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn empty_file_yields_defaults() {
        let config: PrepConfig = toml::from_str("").expect("parse");
        assert_eq!(config, PrepConfig::default());
        assert_eq!(config.contraction.witness_settle_limit, 500);
        assert_eq!(config.contraction.progress_percent, 10);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: PrepConfig =
            toml::from_str("[contraction]\nwitness_settle_limit = 50\n").expect("parse");
        assert_eq!(config.contraction.witness_settle_limit, 50);
        assert_eq!(config.contraction.progress_percent, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<PrepConfig>("[contraction]\nhop_limit = 3\n").is_err());
        assert!(toml::from_str::<PrepConfig>("[query]\n").is_err());
    }

    #[test]
    fn explicit_path_wins_over_project_file() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[contraction]\nprogress_percent = 25\n",
        )
        .expect("write project");
        let explicit = dir.path().join("other.toml");
        std::fs::write(&explicit, "[contraction]\nprogress_percent = 50\n").expect("write");

        let (config, source) = resolve_config(Some(&explicit), dir.path()).expect("resolve");
        assert_eq!(config.contraction.progress_percent, 50);
        assert_eq!(source, ConfigSource::Explicit(explicit));
    }

    #[test]
    fn project_file_is_found_in_working_dir() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(
            dir.path().join(PROJECT_CONFIG_FILE),
            "[contraction]\nprogress_percent = 25\n",
        )
        .expect("write project");

        let (config, source) = resolve_config(None, dir.path()).expect("resolve");
        assert_eq!(config.contraction.progress_percent, 25);
        assert!(matches!(source, ConfigSource::Project(_)));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        let err = resolve_config(Some(&dir.path().join("nope.toml")), dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn malformed_project_file_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(PROJECT_CONFIG_FILE), "[contraction\n").expect("write");
        let err = resolve_config(None, dir.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }
}
