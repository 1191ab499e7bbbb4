//! Where the user's config lives and how it gets there.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use log::info;

use crate::schema::CmdConfig;

pub const DEFAULT_CONFIG: &str = include_str!("default_config.toml");

const CONFIG_FILE_NAME: &str = "config.toml";

pub fn config_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("", "", "tgradish")
        .ok_or_else(|| anyhow!("Could not determine the config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE_NAME))
}

/// Writes the built-in config to `path`, replacing whatever is there.
pub fn set_default_config(path: &Path) -> Result<()> {
    info!("Setting default config...");
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, DEFAULT_CONFIG)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Loads the config at `path`, writing the default one first if there is none.
pub fn get_config(path: &Path) -> Result<CmdConfig> {
    if !path.exists() {
        set_default_config(path)?;
    }
    CmdConfig::load(path)
}

/// Replaces the config at `path` with `source`, if `source` is a valid config.
pub fn copy_config_from(source: &Path, path: &Path) -> Result<()> {
    info!("Copying config file from {}...", source.display());
    CmdConfig::load(source)?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::copy(source, path).with_context(|| format!("Failed to copy to {}", path.display()))?;
    Ok(())
}
