//! Configuration loading and data-directory resolution

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Database file name inside the data directory
const DATABASE_FILE: &str = "hogline.db";

/// Data directory resolution priority order:
/// 1. Command-line argument (highest priority)
/// 2. `HOGLINE_DATA_DIR` environment variable
/// 3. `data_dir` key in the TOML config file
/// 4. OS-dependent default (fallback)
pub fn resolve_data_dir(cli_arg: Option<&Path>) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var("HOGLINE_DATA_DIR") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Ok(config_path) = find_config_file() {
        if let Ok(toml_content) = std::fs::read_to_string(&config_path) {
            if let Ok(config) = toml::from_str::<toml::Value>(&toml_content) {
                if let Some(data_dir) = config.get("data_dir").and_then(|v| v.as_str()) {
                    return PathBuf::from(data_dir);
                }
            }
        }
    }

    // Priority 4: OS-dependent default
    default_data_dir()
}

/// Locate the configuration file for the platform.
///
/// Linux checks `~/.config/hogline/config.toml` then
/// `/etc/hogline/config.toml`; other platforms use the user config dir.
fn find_config_file() -> Result<PathBuf> {
    if cfg!(target_os = "linux") {
        if let Some(user_config) = dirs::config_dir().map(|d| d.join("hogline").join("config.toml"))
        {
            if user_config.exists() {
                return Ok(user_config);
            }
        }
        let system_config = PathBuf::from("/etc/hogline/config.toml");
        if system_config.exists() {
            return Ok(system_config);
        }
        Err(Error::Config("No config file found".to_string()))
    } else {
        dirs::config_dir()
            .map(|d| d.join("hogline").join("config.toml"))
            .filter(|p| p.exists())
            .ok_or_else(|| Error::Config("No config file found".to_string()))
    }
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("hogline"))
        .unwrap_or_else(|| PathBuf::from(".hogline"))
}

/// Create the data directory if it does not exist yet.
pub fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    if !data_dir.exists() {
        std::fs::create_dir_all(data_dir)?;
        tracing::info!("Created data directory: {}", data_dir.display());
    }
    Ok(())
}

/// Path of the SQLite database inside the data directory.
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_argument_wins() {
        let dir = resolve_data_dir(Some(Path::new("/tmp/club-data")));
        assert_eq!(dir, PathBuf::from("/tmp/club-data"));
    }

    #[test]
    fn database_path_is_inside_data_dir() {
        let path = database_path(Path::new("/var/lib/hogline"));
        assert_eq!(path, PathBuf::from("/var/lib/hogline/hogline.db"));
    }
}
