use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CONFIG_FILE: &str = "config.json";
pub const THEMES: &[&str] = &["default", "nord", "dracula", "gruvbox", "solarized"];

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Config {
    pub sound_enabled: bool,
    /// Permission to raise desktop notifications. Off until the user grants it
    /// with `--allow-notifications` or by editing the config file.
    pub notifications_enabled: bool,
    /// Record a countdown that ran out while the app was closed.
    pub finalize_expired_sessions: bool,
    pub theme: String,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            notifications_enabled: false,
            finalize_expired_sessions: false,
            theme: "default".into(),
            log_level: "focusclock=info".into(),
        }
    }
}

pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "focusclock")
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("focusclock"))
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            path: dir.as_ref().join(CONFIG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// A missing file gives the default config. Unreadable or malformed files
    /// are errors, which callers report and replace with the defaults.
    pub fn load(&self) -> Result<Config> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, cfg: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_vec_pretty(cfg)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::in_dir(dir.path());
        assert!(!store.exists());
        assert_eq!(store.load().unwrap(), Config::default());
    }

    #[test]
    fn save_and_load_custom_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::in_dir(dir.path().join("cfg"));
        let cfg = Config {
            sound_enabled: false,
            notifications_enabled: false,
            finalize_expired_sessions: true,
            theme: "nord".into(),
            log_level: "debug".into(),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load().unwrap(), cfg);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"theme": "dracula"}"#).unwrap();
        let cfg = FileConfigStore::in_dir(dir.path()).load().unwrap();
        assert_eq!(cfg.theme, "dracula");
        assert!(cfg.sound_enabled);
    }

    #[test]
    fn notifications_need_an_explicit_grant() {
        assert!(!Config::default().notifications_enabled);

        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), r#"{"notifications_enabled": true}"#).unwrap();
        assert!(FileConfigStore::in_dir(dir.path()).load().unwrap().notifications_enabled);
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{theme").unwrap();
        assert!(FileConfigStore::in_dir(dir.path()).load().is_err());
    }
}
