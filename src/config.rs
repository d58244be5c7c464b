use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use tabreload::host::{Permission, TabSnapshot};

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(env!("CARGO_PKG_NAME"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    /// JSON file holding the extension settings
    pub store_path: PathBuf,
    /// JSON tab snapshot served as the tab provider
    pub snapshot_path: Option<PathBuf>,
    pub granted_permissions: Vec<Permission>,
    pub extension_version: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            store_path: data_dir().join("settings.json"),
            snapshot_path: None,
            granted_permissions: Permission::ALL.to_vec(),
            extension_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            let project_name = env!("CARGO_PKG_NAME");
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }

    /// Tab snapshot to serve, empty if none is configured
    pub fn load_snapshot(&self) -> Result<TabSnapshot> {
        let Some(path) = &self.snapshot_path else {
            log::info!("No tab snapshot configured, starting with no windows");
            return Ok(TabSnapshot::default());
        };
        let content =
            fs::read_to_string(path).context(format!("Failed to read tab snapshot {}", path.display()))?;
        serde_json::from_str(&content).context(format!("Failed to parse tab snapshot {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.log_level.as_deref(), Some("info"));
        assert_eq!(config.granted_permissions, Permission::ALL.to_vec());
        assert!(config.store_path.ends_with("settings.json"));
        assert!(config.snapshot_path.is_none());
    }

    #[test]
    fn test_load_partial_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "granted_permissions: [tabs, alarms]\nextension_version: \"9.9.9\"").unwrap();

        let config = Config::load(Some(&file.path().to_path_buf())).unwrap();
        assert_eq!(config.granted_permissions, vec![Permission::Tabs, Permission::Alarms]);
        assert_eq!(config.extension_version, "9.9.9");
        assert_eq!(config.log_level.as_deref(), Some("info"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let path = PathBuf::from("/nonexistent/tabreload.yml");
        assert!(Config::load(Some(&path)).is_err());
    }

    #[test]
    fn test_load_snapshot() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"windows": [{{"id": 1, "focused": true, "tabs": [{{"id": 10, "url": "https://a.com", "active": true}}]}}]}}"#
        )
        .unwrap();

        let config = Config {
            snapshot_path: Some(file.path().to_path_buf()),
            ..Config::default()
        };
        let snapshot = config.load_snapshot().unwrap();
        assert_eq!(snapshot.windows.len(), 1);
        assert_eq!(snapshot.windows[0].tabs[0].id, 10);
        assert!(snapshot.windows[0].tabs[0].active);
    }

    #[test]
    fn test_no_snapshot_is_empty() {
        assert!(Config::default().load_snapshot().unwrap().windows.is_empty());
    }
}
