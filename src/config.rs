use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

pub const CONFIG_ENV: &str = "CLASS_WORKSPACE_CONFIG";

/// What happens when a feed registers a class name that is already loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicatePolicy {
    /// Later registration wins; differing content is logged and recorded.
    #[default]
    Replace,
    /// The feed that would overwrite an entry fails.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub source_extensions: Vec<String>,
    pub duplicate_policy: DuplicatePolicy,
    pub expand_archives: bool,
    pub include_hidden: bool,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            source_extensions: vec!["java".to_string()],
            duplicate_policy: DuplicatePolicy::Replace,
            expand_archives: true,
            include_hidden: false,
        }
    }
}

impl ResourceConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Explicit path, then `CLASS_WORKSPACE_CONFIG`, then the per-user config
    /// file if present, then defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::from_file(p);
        }

        if let Ok(p) = env::var(CONFIG_ENV) {
            return Self::from_file(Path::new(&p));
        }

        if let Some(p) = default_config_path() {
            if p.exists() {
                return Self::from_file(&p);
            }
        }

        Ok(Self::default())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let base = dirs::config_dir().or_else(dirs::home_dir)?;
    Some(base.join("class-workspace").join("config.json"))
}
