//! Optional YAML configuration.
//!
//! # Storage layout
//!
//! ```text
//! ~/.planclone/
//!   config.yaml   (mode 0600; every field optional)
//! ```
//!
//! # API pattern
//!
//! Like the rest of the crate, every filesystem function has two forms:
//! - `fn_at(home: &Path, …)` — explicit home; used in tests with `TempDir`
//! - `fn(…)` — derives home from `dirs::home_dir()`, delegates to `_at`

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ConfigError;

/// Placeholder substituted with the new plan's id in
/// [`Config::browse_url_template`].
pub const PLAN_ID_PLACEHOLDER: &str = "{plan_id}";

pub const DEFAULT_GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";
pub const DEFAULT_BROWSE_URL_TEMPLATE: &str = "https://tasks.office.com/Home/PlanViews/{plan_id}";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// What to do with tasks whose source bucket could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrphanPolicy {
    /// Report each stranded task and carry on without it.
    #[default]
    Skip,
    /// Refuse to start creating anything.
    Abort,
}

impl fmt::Display for OrphanPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrphanPolicy::Skip => write!(f, "skip"),
            OrphanPolicy::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for OrphanPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "unknown orphan policy '{other}'; expected: skip, abort"
            )),
        }
    }
}

/// Minimum spacing between remote calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingConfig {
    /// Pause after each task is fully processed.
    pub task_interval_ms: u64,
    /// Pause before each detail or attachment token fetch.
    pub detail_delay_ms: u64,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            task_interval_ms: 500,
            detail_delay_ms: 1500,
        }
    }
}

impl PacingConfig {
    pub fn task_interval(&self) -> Duration {
        Duration::from_millis(self.task_interval_ms)
    }

    pub fn detail_delay(&self) -> Duration {
        Duration::from_millis(self.detail_delay_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub graph_base_url: String,
    pub browse_url_template: String,
    pub pacing: PacingConfig,
    pub http_timeout_secs: u64,
    pub orphan_policy: OrphanPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            graph_base_url: DEFAULT_GRAPH_BASE_URL.to_string(),
            browse_url_template: DEFAULT_BROWSE_URL_TEMPLATE.to_string(),
            pacing: PacingConfig::default(),
            http_timeout_secs: 30,
            orphan_policy: OrphanPolicy::default(),
        }
    }
}

impl Config {
    /// Check the values that would otherwise only fail mid-run.
    pub fn validate(&self) -> Result<(), ConfigError> {
        Url::parse(&self.graph_base_url).map_err(|e| ConfigError::Invalid {
            field: "graph_base_url",
            reason: e.to_string(),
        })?;
        if !self.browse_url_template.contains(PLAN_ID_PLACEHOLDER) {
            return Err(ConfigError::Invalid {
                field: "browse_url_template",
                reason: format!("must contain {PLAN_ID_PLACEHOLDER}"),
            });
        }
        if self.http_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "http_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Load / save
// ---------------------------------------------------------------------------

/// `<home>/.planclone/config.yaml`. Pure, no I/O.
pub fn config_path_at(home: &Path) -> PathBuf {
    home.join(".planclone").join("config.yaml")
}

/// Load and validate the config under `home`.
///
/// A missing file yields [`Config::default`]; malformed YAML is
/// `ConfigError::Parse` with the path.
pub fn load_at(home: &Path) -> Result<Config, ConfigError> {
    let path = config_path_at(home);
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(&path)?;
    let config: Config = if contents.trim().is_empty() {
        Config::default()
    } else {
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse { path, source: e })?
    };
    config.validate()?;
    Ok(config)
}

/// `load_at` convenience wrapper.
pub fn load() -> Result<Config, ConfigError> {
    load_at(&home()?)
}

/// Atomically write `config` under `home`.
///
/// Write flow: serialize → `.yaml.tmp` sibling → `chmod 0600` → `rename`.
pub fn save_at(home: &Path, config: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path_at(home);
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            set_dir_permissions(dir)?;
        }
    }
    let tmp_path = path.with_file_name("config.yaml.tmp");
    let yaml = serde_yaml::to_string(config)?;
    std::fs::write(&tmp_path, yaml)?;
    set_file_permissions(&tmp_path)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(path)
}

/// `save_at` convenience wrapper.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    save_at(&home()?, config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn home() -> Result<PathBuf, ConfigError> {
    dirs::home_dir().ok_or(ConfigError::HomeNotFound)
}

#[cfg(unix)]
fn set_dir_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o700))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_dir_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

#[cfg(unix)]
fn set_file_permissions(path: &Path) -> Result<(), ConfigError> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    Ok(())
}
#[cfg(not(unix))]
fn set_file_permissions(_path: &Path) -> Result<(), ConfigError> {
    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn config_path_is_correct() {
        let home = TempDir::new().expect("tempdir");
        assert!(config_path_at(home.path()).ends_with(".planclone/config.yaml"));
    }

    #[test]
    fn missing_file_yields_defaults() {
        let home = TempDir::new().expect("tempdir");
        let config = load_at(home.path()).expect("load");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn save_then_load_keeps_values() {
        let home = TempDir::new().expect("tempdir");
        let config = Config {
            orphan_policy: OrphanPolicy::Abort,
            pacing: PacingConfig {
                task_interval_ms: 10,
                detail_delay_ms: 20,
            },
            ..Config::default()
        };
        let path = save_at(home.path(), &config).expect("save");
        assert!(!path.with_file_name("config.yaml.tmp").exists());
        assert_eq!(load_at(home.path()).expect("load"), config);
    }

    #[test]
    fn template_without_placeholder_is_invalid() {
        let config = Config {
            browse_url_template: "https://tasks.office.com/".into(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "browse_url_template",
                ..
            }
        ));
    }

    #[test]
    fn orphan_policy_parses_case_insensitively() {
        assert_eq!("ABORT".parse::<OrphanPolicy>(), Ok(OrphanPolicy::Abort));
        assert!("later".parse::<OrphanPolicy>().is_err());
    }
}
