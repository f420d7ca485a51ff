use crate::messy::MessyRules;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PREVIEW_LIMIT: usize = 30;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub start: u64,
    pub include_cjk: bool,
    pub preview_limit: usize,
    pub messy_tokens: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            start: 1,
            include_cjk: false,
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            messy_tokens: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn messy_rules(&self) -> MessyRules {
        MessyRules::with_extra_tokens(&self.messy_tokens)
    }
}

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub config_dir: PathBuf,
    pub config_path: PathBuf,
}

pub fn app_paths() -> Result<AppPaths> {
    let proj = ProjectDirs::from("com", "picseq", "picseq")
        .context("could not resolve the OS config directory")?;
    let config_dir = proj.config_dir().to_path_buf();
    Ok(AppPaths {
        config_path: config_dir.join("config.toml"),
        config_dir,
    })
}

pub fn load_config() -> Result<AppConfig> {
    let paths = app_paths()?;
    load_config_from(&paths.config_path)
}

pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config = toml::from_str::<AppConfig>(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;
    Ok(config)
}

pub fn save_config(config: &AppConfig) -> Result<()> {
    let paths = app_paths()?;
    save_config_to(config, &paths.config_path)
}

pub fn save_config_to(config: &AppConfig, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create config directory: {}", dir.display()))?;
    }
    let body = toml::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(path, body)
        .with_context(|| format!("failed to write config file: {}", path.display()))?;
    Ok(())
}
