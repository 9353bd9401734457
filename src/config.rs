//! Configuration loaded from `rbscm` TOML files.
//!
//! Looked up in the working directory first (`.rbscm.toml`), then in the
//! user config directory (`~/.config/rbscm/config.toml` on Linux).

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "rbscm";
const LOCAL_CONFIG_FILE: &str = ".rbscm.toml";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScmConfig {
    /// Review server URL, used before any backend-specific lookup.
    pub server_url: Option<String>,

    /// Default for `--parent`.
    pub parent_branch: Option<String>,

    pub guess_summary: bool,
    pub guess_description: bool,

    /// Extra `--config` values for Mercurial diff and log commands,
    /// e.g. `extensions.normalize=/path/to/ext.py`.
    pub hg_config: Vec<String>,

    pub bzr_binary: String,
    pub hg_binary: String,
    pub svn_binary: String,
}

impl Default for ScmConfig {
    fn default() -> Self {
        Self {
            server_url: None,
            parent_branch: None,
            guess_summary: false,
            guess_description: false,
            hg_config: Vec::new(),
            bzr_binary: "bzr".to_string(),
            hg_binary: "hg".to_string(),
            svn_binary: "svn".to_string(),
        }
    }
}

impl ScmConfig {
    /// Load config from `cwd` first, then the user config directory, or use defaults.
    pub fn load(cwd: &Path) -> Self {
        Self::load_from(&config_paths(cwd))
    }

    fn load_from(paths: &[PathBuf]) -> Self {
        for path in paths {
            let Ok(content) = fs::read_to_string(path) else {
                continue;
            };
            match toml::from_str(&content) {
                Ok(config) => {
                    log::debug!("Loaded config from {}", path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {}: {}", path.display(), e);
                }
            }
        }

        log::debug!("Using default config");
        Self::default()
    }
}

fn config_paths(cwd: &Path) -> Vec<PathBuf> {
    let mut paths = vec![cwd.join(LOCAL_CONFIG_FILE)];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join(APP_NAME).join("config.toml"));
    }
    paths
}
