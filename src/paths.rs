//! Path resolution for intune-tools
//!
//! # Environment Variables
//!
//! - `INTUNE_TOOLS_CONFIG_DIR` - Override config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `INTUNE_TOOLS_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/intune-tools` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\intune-tools`
//!    - macOS/Linux: `~/.config/intune-tools`

use anyhow::{Context, Result};
use std::path::PathBuf;

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "INTUNE_TOOLS_CONFIG_DIR";

const APP_DIR: &str = "intune-tools";

/// Name of the configuration file inside the config directory
pub const CONFIG_FILE: &str = "config.toml";

/// Get the config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand_path(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME")
        && !xdg_config.is_empty()
    {
        let path = PathBuf::from(xdg_config).join(APP_DIR);
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            return Ok(app_data.join(APP_DIR));
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join(APP_DIR);
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Path of the configuration file
pub fn config_file() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE))
}

/// Expand `~` and environment variables in a path
pub fn expand_path(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_tilde() {
        let home = dirs::home_dir().unwrap();
        assert_eq!(expand_path("~/creds.json"), home.join("creds.json"));
    }

    #[test]
    fn test_absolute_path_unchanged() {
        assert_eq!(
            expand_path("/etc/intune/creds.json"),
            PathBuf::from("/etc/intune/creds.json")
        );
    }

    #[test]
    fn test_config_file_name() {
        let file = config_file().unwrap();
        assert!(file.ends_with(CONFIG_FILE));
    }
}
