// config.rs — Gateway configuration.
//
// GatewayConfig says where the gateway keeps its state: the change archive,
// staging checkouts and the decision journal. `for_project()` lays these out
// under `.determined/` in the repository; `load()` additionally honours an
// optional `.determined/config.toml`:
//
//   archive_dir = "archive"       # relative paths resolve against the repo
//   staging_dir = "/tmp/staging"
//   journal     = "journal.jsonl"
//   excludes    = ["target"]      # added to the default excludes

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Name of the per-repository state directory.
pub const STATE_DIR: &str = ".determined";

/// Directory names never copied into a staging checkout.
pub const DEFAULT_EXCLUDES: &[&str] = &[STATE_DIR, ".git"];

/// Configuration for the review coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Working tree that approved changes are applied to.
    pub repo_root: PathBuf,

    /// Root of the change archive (one subdir per change id).
    pub archive_root: PathBuf,

    /// Parent directory for staging checkouts.
    pub staging_root: PathBuf,

    /// Path to the append-only decision journal.
    pub journal_path: PathBuf,

    /// Directory names skipped when copying the repo into staging.
    pub staging_excludes: Vec<String>,
}

/// On-disk form of `.determined/config.toml`.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    archive_dir: Option<PathBuf>,
    staging_dir: Option<PathBuf>,
    journal: Option<PathBuf>,
    excludes: Vec<String>,
}

impl GatewayConfig {
    /// Create a config with the standard `.determined/` layout.
    pub fn for_project(repo_root: impl AsRef<Path>) -> Self {
        let root = repo_root.as_ref().to_path_buf();
        let state_dir = root.join(STATE_DIR);
        Self {
            archive_root: state_dir.join("archive"),
            staging_root: state_dir.join("staging"),
            journal_path: state_dir.join("journal.jsonl"),
            staging_excludes: DEFAULT_EXCLUDES.iter().map(|s| s.to_string()).collect(),
            repo_root: root,
        }
    }

    /// Gateway-owned paths that staging must never copy in or write back.
    pub fn protected_paths(&self) -> Vec<PathBuf> {
        vec![
            self.archive_root.clone(),
            self.journal_path.clone(),
            self.staging_root.clone(),
        ]
    }

    /// Path of the optional project config file.
    pub fn config_path(repo_root: impl AsRef<Path>) -> PathBuf {
        repo_root.as_ref().join(STATE_DIR).join("config.toml")
    }

    /// Load the project config, falling back to [`GatewayConfig::for_project`]
    /// defaults when the file does not exist.
    pub fn load(repo_root: impl AsRef<Path>) -> Result<Self, GatewayError> {
        let root = repo_root.as_ref();
        let mut config = Self::for_project(root);
        let path = Self::config_path(root);
        if !path.exists() {
            return Ok(config);
        }

        let content = std::fs::read_to_string(&path).map_err(|source| GatewayError::Io {
            path: path.clone(),
            source,
        })?;
        let file: ConfigFile =
            toml::from_str(&content).map_err(|source| GatewayError::Config { path, source })?;

        if let Some(dir) = file.archive_dir {
            config.archive_root = root.join(dir);
        }
        if let Some(dir) = file.staging_dir {
            config.staging_root = root.join(dir);
        }
        if let Some(journal) = file.journal {
            config.journal_path = root.join(journal);
        }
        for name in file.excludes {
            if !config.staging_excludes.contains(&name) {
                config.staging_excludes.push(name);
            }
        }

        tracing::debug!(?config, "loaded gateway config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn for_project_layout() {
        let config = GatewayConfig::for_project("/repo");
        assert_eq!(config.repo_root, PathBuf::from("/repo"));
        assert_eq!(config.archive_root, PathBuf::from("/repo/.determined/archive"));
        assert_eq!(config.staging_root, PathBuf::from("/repo/.determined/staging"));
        assert_eq!(config.journal_path, PathBuf::from("/repo/.determined/journal.jsonl"));
        assert_eq!(config.staging_excludes, vec![".determined", ".git"]);
        assert_eq!(
            config.protected_paths(),
            vec![config.archive_root.clone(), config.journal_path.clone(), config.staging_root.clone()]
        );
    }

    #[test]
    fn load_without_file_uses_defaults() {
        let dir = tempdir().unwrap();
        assert_eq!(
            GatewayConfig::load(dir.path()).unwrap(),
            GatewayConfig::for_project(dir.path())
        );
    }

    #[test]
    fn load_reads_overrides() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        std::fs::write(
            GatewayConfig::config_path(dir.path()),
            "archive_dir = \"reviews\"\nstaging_dir = \"/var/tmp/dt\"\nexcludes = [\"target\", \".git\"]\n",
        )
        .unwrap();

        let config = GatewayConfig::load(dir.path()).unwrap();
        assert_eq!(config.archive_root, dir.path().join("reviews"));
        assert_eq!(config.staging_root, PathBuf::from("/var/tmp/dt"));
        assert_eq!(config.journal_path, dir.path().join(".determined/journal.jsonl"));
        assert_eq!(config.staging_excludes, vec![".determined", ".git", "target"]);
    }

    #[test]
    fn malformed_file_is_config_error() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        std::fs::write(GatewayConfig::config_path(dir.path()), "archive_dir = [1, 2]\n").unwrap();
        assert!(matches!(
            GatewayConfig::load(dir.path()),
            Err(GatewayError::Config { .. })
        ));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join(STATE_DIR)).unwrap();
        std::fs::write(GatewayConfig::config_path(dir.path()), "archive = \"x\"\n").unwrap();
        assert!(GatewayConfig::load(dir.path()).is_err());
    }
}
