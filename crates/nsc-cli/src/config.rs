//! # Configuration
//!
//! Resolved once per invocation into an immutable [`CliConfig`].
//! Precedence, highest first: command-line flag, environment variable,
//! `nsc.json` in the config directory, built-in default.
//!
//! | Setting | Flag | Env | `nsc.json` | Default |
//! |---|---|---|---|---|
//! | config dir | `--config-dir` | `NSC_HOME` | | `~/.nsc` |
//! | store root | `--data-dir` | | `store_root` | `<config dir>/stores` |
//! | key store | `--keystore-dir` | `NKEYS_PATH` | | `~/.nkeys` |
//! | operator | `--operator` | `NSC_OPERATOR` | `operator` | the only store |
//! | account | | | `account` | |

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use nsc_core::atomic_write;
use nsc_state::FsCredentialStore;
use serde::{Deserialize, Serialize};

/// Name of the config file inside the config directory.
pub const CONFIG_FILE: &str = "nsc.json";

/// Env var naming the config directory.
pub const ENV_HOME: &str = "NSC_HOME";
/// Env var naming the key store directory.
pub const ENV_KEYS: &str = "NKEYS_PATH";
/// Env var naming the operator.
pub const ENV_OPERATOR: &str = "NSC_OPERATOR";

/// Contents of `nsc.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Directory holding one store per operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_root: Option<PathBuf>,
    /// Current operator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    /// Current account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
}

impl ConfigFile {
    /// Load from `dir`; a missing file is an empty config.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(CONFIG_FILE);
        match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).with_context(|| format!("parsing {}", path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    /// Write to `dir`.
    pub fn save(&self, dir: &Path) -> Result<()> {
        let path = dir.join(CONFIG_FILE);
        let mut bytes = serde_json::to_vec_pretty(self)?;
        bytes.push(b'\n');
        atomic_write(&path, &bytes).with_context(|| format!("writing {}", path.display()))
    }
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// `--config-dir`.
    pub config_dir: Option<PathBuf>,
    /// `--data-dir`.
    pub data_dir: Option<PathBuf>,
    /// `--keystore-dir`.
    pub keystore_dir: Option<PathBuf>,
    /// `--operator`.
    pub operator: Option<String>,
}

/// The resolved configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Directory holding `nsc.json`.
    pub config_dir: PathBuf,
    /// Directory holding one store per operator.
    pub store_root: PathBuf,
    /// Key store root.
    pub keystore_dir: PathBuf,
    /// Current operator, if one can be determined.
    pub operator: Option<String>,
    /// Default account.
    pub account: Option<String>,
}

impl CliConfig {
    /// Resolve from flags, the process environment and `nsc.json`.
    pub fn resolve(overrides: &ConfigOverrides) -> Result<Self> {
        Self::resolve_with(overrides, |k| std::env::var(k).ok().filter(|v| !v.is_empty()))
    }

    /// Resolve with an explicit environment lookup.
    pub fn resolve_with(overrides: &ConfigOverrides, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let home = dirs::home_dir().unwrap_or_else(|| PathBuf::from("."));

        let config_dir = overrides
            .config_dir
            .clone()
            .or_else(|| env(ENV_HOME).map(PathBuf::from))
            .unwrap_or_else(|| home.join(".nsc"));
        let file = ConfigFile::load(&config_dir)?;

        let store_root = overrides
            .data_dir
            .clone()
            .or(file.store_root)
            .unwrap_or_else(|| config_dir.join("stores"));

        let keystore_dir = overrides
            .keystore_dir
            .clone()
            .or_else(|| env(ENV_KEYS).map(PathBuf::from))
            .unwrap_or_else(|| home.join(".nkeys"));

        let operator = match overrides.operator.clone().or_else(|| env(ENV_OPERATOR)).or(file.operator) {
            Some(op) => Some(op),
            None => only_store(&store_root)?,
        };

        let config = Self {
            config_dir,
            store_root,
            keystore_dir,
            operator,
            account: file.account,
        };
        tracing::debug!(?config, "resolved configuration");
        Ok(config)
    }

    /// Record the current operator and account in `nsc.json`, keeping other
    /// settings.
    pub fn remember(&self, operator: Option<&str>, account: Option<&str>) -> Result<()> {
        let mut file = ConfigFile::load(&self.config_dir)?;
        if let Some(op) = operator {
            if file.operator.as_deref() != Some(op) {
                file.account = None;
            }
            file.operator = Some(op.to_string());
        }
        if let Some(acc) = account {
            file.account = Some(acc.to_string());
        }
        file.save(&self.config_dir)
    }
}

fn only_store(root: &Path) -> Result<Option<String>> {
    let mut stores = FsCredentialStore::list_stores(root)?;
    Ok(if stores.len() == 1 { stores.pop() } else { None })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn flags_beat_env_beat_file() {
        let dir = tempfile::tempdir().unwrap();
        ConfigFile {
            operator: Some("from-file".into()),
            account: Some("A".into()),
            ..Default::default()
        }
        .save(dir.path())
        .unwrap();

        let env = env_of(&[(ENV_HOME, dir.path().to_str().unwrap()), (ENV_OPERATOR, "from-env")]);
        let cfg = CliConfig::resolve_with(&ConfigOverrides::default(), &env).unwrap();
        assert_eq!(cfg.config_dir, dir.path());
        assert_eq!(cfg.operator.as_deref(), Some("from-env"));
        assert_eq!(cfg.account.as_deref(), Some("A"));
        assert_eq!(cfg.store_root, dir.path().join("stores"));

        let overrides = ConfigOverrides {
            operator: Some("from-flag".into()),
            ..Default::default()
        };
        let cfg = CliConfig::resolve_with(&overrides, &env).unwrap();
        assert_eq!(cfg.operator.as_deref(), Some("from-flag"));

        let cfg = CliConfig::resolve_with(&ConfigOverrides::default(), env_of(&[(ENV_HOME, dir.path().to_str().unwrap())]))
            .unwrap();
        assert_eq!(cfg.operator.as_deref(), Some("from-file"));
    }

    #[test]
    fn keystore_from_env_and_flag() {
        let dir = tempfile::tempdir().unwrap();
        let env = env_of(&[(ENV_HOME, dir.path().to_str().unwrap()), (ENV_KEYS, "/tmp/keys-env")]);
        let cfg = CliConfig::resolve_with(&ConfigOverrides::default(), &env).unwrap();
        assert_eq!(cfg.keystore_dir, PathBuf::from("/tmp/keys-env"));

        let overrides = ConfigOverrides {
            keystore_dir: Some("/tmp/keys-flag".into()),
            data_dir: Some("/tmp/data".into()),
            ..Default::default()
        };
        let cfg = CliConfig::resolve_with(&overrides, &env).unwrap();
        assert_eq!(cfg.keystore_dir, PathBuf::from("/tmp/keys-flag"));
        assert_eq!(cfg.store_root, PathBuf::from("/tmp/data"));
    }

    #[test]
    fn remember_switches_operator_and_clears_account() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = ConfigOverrides {
            config_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let cfg = CliConfig::resolve_with(&overrides, |_| None).unwrap();
        cfg.remember(Some("O"), Some("A")).unwrap();
        assert_eq!(
            ConfigFile::load(dir.path()).unwrap(),
            ConfigFile {
                store_root: None,
                operator: Some("O".into()),
                account: Some("A".into()),
            }
        );

        cfg.remember(Some("P"), None).unwrap();
        let file = ConfigFile::load(dir.path()).unwrap();
        assert_eq!(file.operator.as_deref(), Some("P"));
        assert_eq!(file.account, None);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), b"{not json").unwrap();
        let overrides = ConfigOverrides {
            config_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        assert!(CliConfig::resolve_with(&overrides, |_| None).is_err());
    }
}
