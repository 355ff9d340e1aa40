use crate::domain::{config::TcpHexConfig, error::{TcpHexError, TcpHexResult}};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

const CONFIG_DIR: &str = "tcphex";
const PROJECT_DIR: &str = ".tcphex";
const CONFIG_FILE: &str = "config.toml";

/// Configuration manager
///
/// Layers are merged key by key: defaults, then the global file, then the
/// project file, then an explicit file. Arrays such as `presets` are replaced
/// wholesale by the later layer.
pub struct ConfigManager {
    global_config_path: PathBuf,
    project_config_path: Option<PathBuf>,
}

impl ConfigManager {
    /// Create new configuration manager
    pub fn new() -> TcpHexResult<Self> {
        let global_config_path = Self::get_global_config_path()?;
        let project_config_path = Self::find_project_config_path();

        Ok(Self {
            global_config_path,
            project_config_path,
        })
    }

    /// Manager over fixed paths, bypassing home and working directory lookup
    pub fn with_paths(global_config_path: PathBuf, project_config_path: Option<PathBuf>) -> Self {
        Self {
            global_config_path,
            project_config_path,
        }
    }

    /// Load configuration from files
    pub fn load_config(&self) -> TcpHexResult<TcpHexConfig> {
        self.load_config_with(None)
    }

    /// Load configuration, letting `explicit` override every other layer
    pub fn load_config_with(&self, explicit: Option<&Path>) -> TcpHexResult<TcpHexConfig> {
        let mut merged = toml::Value::try_from(TcpHexConfig::default()).map_err(|e| {
            TcpHexError::Config {
                message: format!("Failed to serialize default config: {}", e),
            }
        })?;

        let mut layers = vec![self.global_config_path.as_path()];
        if let Some(project_path) = &self.project_config_path {
            layers.push(project_path.as_path());
        }

        for path in layers {
            if path.exists() {
                debug!("Merging config layer {}", path.display());
                merge_values(&mut merged, read_value(path)?);
            }
        }

        if let Some(path) = explicit {
            debug!("Merging explicit config {}", path.display());
            merge_values(&mut merged, read_value(path)?);
        }

        let config: TcpHexConfig = merged.try_into().map_err(|e| TcpHexError::Config {
            message: format!("Invalid configuration: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Write `config` as the global configuration
    pub fn save_config(&self, config: &TcpHexConfig) -> TcpHexResult<()> {
        if let Some(parent) = self.global_config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| TcpHexError::Config {
                message: format!("Failed to create config directory: {}", e),
            })?;
        }

        self.save_config_to_path(&self.global_config_path, config)
    }

    /// Get global configuration path
    fn get_global_config_path() -> TcpHexResult<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| TcpHexError::Config {
            message: "Could not determine home directory".to_string(),
        })?;

        Ok(home.join(".config").join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Find project configuration path by walking up directory tree
    fn find_project_config_path() -> Option<PathBuf> {
        let current_dir = std::env::current_dir().ok()?;
        let mut path = current_dir.as_path();

        loop {
            let config_path = path.join(PROJECT_DIR).join(CONFIG_FILE);
            if config_path.exists() {
                return Some(config_path);
            }

            path = path.parent()?;
        }
    }

    /// Load a single configuration file, filling gaps with defaults
    pub fn load_config_from_path(&self, path: &Path) -> TcpHexResult<TcpHexConfig> {
        let content = fs::read_to_string(path).map_err(|e| TcpHexError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| TcpHexError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    /// Save configuration to specific path
    pub fn save_config_to_path(&self, path: &Path, config: &TcpHexConfig) -> TcpHexResult<()> {
        let content = toml::to_string_pretty(config).map_err(|e| TcpHexError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        fs::write(path, content).map_err(|e| TcpHexError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })
    }

    /// Create `.tcphex/config.toml` with defaults under `path`
    pub fn init_project_config(&self, path: &Path) -> TcpHexResult<PathBuf> {
        let config_dir = path.join(PROJECT_DIR);
        let config_file = config_dir.join(CONFIG_FILE);

        if config_file.exists() {
            return Err(TcpHexError::Config {
                message: "Project configuration already exists".to_string(),
            });
        }

        fs::create_dir_all(&config_dir).map_err(|e| TcpHexError::Config {
            message: format!("Failed to create {} directory: {}", PROJECT_DIR, e),
        })?;

        self.save_config_to_path(&config_file, &TcpHexConfig::default())?;
        Ok(config_file)
    }

    /// Create the global configuration file with defaults
    pub fn init_global_config(&self) -> TcpHexResult<PathBuf> {
        if self.global_config_path.exists() {
            return Err(TcpHexError::Config {
                message: "Global configuration already exists".to_string(),
            });
        }

        self.save_config(&TcpHexConfig::default())?;
        Ok(self.global_config_path.clone())
    }

    /// Get the current project config path (if any)
    pub fn get_project_config_path(&self) -> Option<&PathBuf> {
        self.project_config_path.as_ref()
    }

    /// Get the global config path
    pub fn get_global_config_path_ref(&self) -> &PathBuf {
        &self.global_config_path
    }
}

fn read_value(path: &Path) -> TcpHexResult<toml::Value> {
    let content = fs::read_to_string(path).map_err(|e| TcpHexError::Config {
        message: format!("Failed to read config file {}: {}", path.display(), e),
    })?;

    content.parse::<toml::Value>().map_err(|e| TcpHexError::Config {
        message: format!("Failed to parse config file {}: {}", path.display(), e),
    })
}

fn merge_values(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn manager_in(dir: &TempDir) -> ConfigManager {
        ConfigManager::with_paths(
            dir.path().join("global").join(CONFIG_FILE),
            Some(dir.path().join(PROJECT_DIR).join(CONFIG_FILE)),
        )
    }

    #[test]
    fn test_load_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config = manager_in(&temp_dir).load_config().unwrap();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.client.read_timeout_ms, 2000);
        assert!(!config.presets.is_empty());
    }

    #[test]
    fn test_project_layer_overrides_single_keys() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir);

        let global_dir = temp_dir.path().join("global");
        fs::create_dir_all(&global_dir).unwrap();
        fs::write(
            global_dir.join(CONFIG_FILE),
            "[client]\nread_timeout_ms = 750\nconnect_timeout_ms = 900\n",
        )
        .unwrap();

        manager.init_project_config(temp_dir.path()).unwrap();
        fs::write(
            temp_dir.path().join(PROJECT_DIR).join(CONFIG_FILE),
            "[client]\nread_timeout_ms = 300\n\n[[presets]]\nname = \"Ping\"\ncode = \"AA55\"\n",
        )
        .unwrap();

        let config = manager.load_config().unwrap();
        assert_eq!(config.client.read_timeout_ms, 300);
        assert_eq!(config.client.connect_timeout_ms, 900);
        assert_eq!(config.presets.len(), 1);
        assert_eq!(config.presets[0].group, "custom");
    }

    #[test]
    fn test_explicit_file_wins() {
        let temp_dir = TempDir::new().unwrap();
        let explicit = temp_dir.path().join("explicit.toml");
        fs::write(&explicit, "[logging]\nlevel = \"debug\"\n").unwrap();

        let config = manager_in(&temp_dir)
            .load_config_with(Some(&explicit))
            .unwrap();
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_invalid_layer_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let explicit = temp_dir.path().join("bad.toml");
        fs::write(&explicit, "[client]\nread_timeout_ms = 0\n").unwrap();

        let result = manager_in(&temp_dir).load_config_with(Some(&explicit));
        assert!(matches!(result, Err(TcpHexError::Config { .. })));
    }

    #[test]
    fn test_init_project_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir);

        let config_file = manager.init_project_config(temp_dir.path()).unwrap();
        assert!(config_file.exists());

        let config = manager.load_config_from_path(&config_file).unwrap();
        assert_eq!(config.client, TcpHexConfig::default().client);

        assert!(manager.init_project_config(temp_dir.path()).is_err());
    }

    #[test]
    fn test_init_global_config() {
        let temp_dir = TempDir::new().unwrap();
        let manager = manager_in(&temp_dir);

        let path = manager.init_global_config().unwrap();
        assert!(path.exists());
        assert!(manager.init_global_config().is_err());
    }
}
