//! Application directory layout and the persisted user configuration. The
//! data directory is a hidden folder beneath the user's home; everything the
//! application writes (database, fallback document, config, exports, the
//! update-check timestamp) lives under it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".thighpads";
/// Persisted configuration file inside the data directory.
const CONFIG_FILE_NAME: &str = "config.json";
/// SQLite database file, the primary backend.
pub const DB_FILE_NAME: &str = "thighpads.db";
/// Single-document JSON store, the fallback backend.
pub const FILE_DB_NAME: &str = "thighpads.json";
/// Default export destination inside the data directory.
const EXPORT_DIR_NAME: &str = "exports";
/// User-facing export folder created on the desktop.
const DESKTOP_EXPORT_DIR_NAME: &str = "ThighPads Exports";

/// Where exports are written by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportTarget {
    /// The exports folder inside the application data directory.
    Config,
    /// The "ThighPads Exports" folder on the user's desktop.
    Desktop,
    /// Both of the above, attempted independently.
    Both,
}

impl ExportTarget {
    /// Cycle to the next choice, in the order shown on the settings screen.
    pub fn next(self) -> Self {
        match self {
            ExportTarget::Config => ExportTarget::Desktop,
            ExportTarget::Desktop => ExportTarget::Both,
            ExportTarget::Both => ExportTarget::Config,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportTarget::Config => "Config folder",
            ExportTarget::Desktop => "Desktop",
            ExportTarget::Both => "Both",
        }
    }
}

/// Persisted user configuration. Unknown or missing fields fall back to the
/// defaults so older config files keep loading after upgrades.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub username: String,
    pub auto_check_update: bool,
    pub default_export: ExportTarget,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            username: String::new(),
            auto_check_update: true,
            default_export: ExportTarget::Config,
        }
    }
}

/// Resolve the application data directory beneath the user's home.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// Resolve the data directory and make sure it exists together with the
/// default exports folder.
pub fn ensure_data_dir() -> Result<PathBuf> {
    let dir = data_dir()?;
    fs::create_dir_all(&dir).context("failed to create data directory")?;
    fs::create_dir_all(dir.join(EXPORT_DIR_NAME)).context("failed to create exports directory")?;
    Ok(dir)
}

/// First run means no configuration has been written yet; the controller
/// starts on the setup screen in that case.
pub fn is_first_run(data_dir: &Path) -> bool {
    !data_dir.join(CONFIG_FILE_NAME).exists()
}

pub fn load_config(data_dir: &Path) -> Result<Config> {
    let raw = fs::read_to_string(data_dir.join(CONFIG_FILE_NAME))
        .context("failed to read config file")?;
    serde_json::from_str(&raw).context("failed to parse config file")
}

pub fn save_config(data_dir: &Path, config: &Config) -> Result<()> {
    let raw = serde_json::to_string_pretty(config).context("failed to serialize config")?;
    fs::write(data_dir.join(CONFIG_FILE_NAME), raw).context("failed to write config file")
}

/// The exports folder inside the data directory.
pub fn export_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(EXPORT_DIR_NAME)
}

/// The user-facing exports folder on the desktop, created on demand.
pub fn desktop_export_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    let dir = base_dirs
        .home_dir()
        .join("Desktop")
        .join(DESKTOP_EXPORT_DIR_NAME);
    fs::create_dir_all(&dir).context("failed to create desktop exports directory")?;
    Ok(dir)
}

/// Resolve the concrete destination directories for an export. A desktop
/// folder that cannot be created is logged and skipped rather than aborting
/// the export; the codec reports failure only when nothing could be written.
pub fn export_destinations(data_dir: &Path, target: ExportTarget) -> Vec<PathBuf> {
    let mut destinations = Vec::new();

    if matches!(target, ExportTarget::Config | ExportTarget::Both) {
        destinations.push(export_dir(data_dir));
    }

    if matches!(target, ExportTarget::Desktop | ExportTarget::Both) {
        match desktop_export_dir() {
            Ok(dir) => destinations.push(dir),
            Err(err) => log::warn!("desktop export path unavailable: {err}"),
        }
    }

    destinations
}
