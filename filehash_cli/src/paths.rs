//! Centralized path management for the filehash CLI
//!
//! Data and configuration live in separate platform directories, both
//! under an application folder named `filehash`.

use std::path::PathBuf;

/// The name of the application directory used across all platforms
const APP_DIR: &str = "filehash";

/// The name of the persisted hash table
const CACHE_FILE: &str = "hashes.json";

/// The name of the configuration file
const CONFIG_FILE: &str = "config.toml";

/// Returns the base data directory for the application
///
/// On Linux this is `~/.local/share/filehash`, on macOS
/// `~/Library/Application Support/filehash` and on Windows
/// `%APPDATA%/filehash`. Falls back to `.filehash` in the current directory.
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".filehash"))
}

/// Returns the default location of the persisted hash table
pub fn get_cache_file_path() -> PathBuf {
    get_data_dir().join(CACHE_FILE)
}

/// Returns the configuration directory
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from(".filehash"))
}

/// Returns the default configuration file path
pub fn get_config_path() -> PathBuf {
    get_config_dir().join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_file_is_in_data_dir() {
        let cache_file = get_cache_file_path();
        assert!(
            cache_file.starts_with(get_data_dir()),
            "Cache file {} should be under data dir {}",
            cache_file.display(),
            get_data_dir().display()
        );
        assert_eq!(
            cache_file.file_name().and_then(|n| n.to_str()),
            Some(CACHE_FILE)
        );
    }

    #[test]
    fn test_config_path_is_in_config_dir() {
        let config_path = get_config_path();
        assert!(config_path.starts_with(get_config_dir()));
        assert_eq!(
            config_path.file_name().and_then(|n| n.to_str()),
            Some(CONFIG_FILE)
        );
    }

    #[test]
    fn test_all_paths_use_app_dir() {
        for path in [get_data_dir(), get_config_dir()] {
            assert!(
                path.to_string_lossy().contains(APP_DIR),
                "path should contain '{APP_DIR}': {}",
                path.display()
            );
        }
    }
}
