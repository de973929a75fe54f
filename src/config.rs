//! Repository settings.
//!
//! Read from `.grypt.toml` at the repository root:
//!
//! ```toml
//! [grypt]
//! keyring = "default"
//! scheme = "default"
//! ```
//!
//! `GRYPT_KEYRING` and `GRYPT_SCHEME` override the file, and command line
//! flags override both.

use crate::error::{GryptError, Result};
use crate::keyring::DEFAULT_KEYRING;
use config::{Config, File, FileFormat};
use serde::Deserialize;
use std::env;
use std::path::Path;
use tracing::debug;

pub const CONFIG_FILE: &str = ".grypt.toml";
const ENV_PREFIX: &str = "GRYPT_";

/// Scheme name used when nothing else is configured
pub const DEFAULT_SCHEME: &str = "default";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_keyring")]
    pub keyring: String,
    #[serde(default = "default_scheme")]
    pub scheme: String,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    grypt: Settings,
}

fn default_keyring() -> String {
    DEFAULT_KEYRING.to_string()
}

fn default_scheme() -> String {
    DEFAULT_SCHEME.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            keyring: default_keyring(),
            scheme: default_scheme(),
        }
    }
}

impl Settings {
    /// Apply command line overrides
    pub fn with_overrides(mut self, keyring: Option<&str>, scheme: Option<&str>) -> Self {
        if let Some(keyring) = keyring {
            self.keyring = keyring.to_string();
        }
        if let Some(scheme) = scheme {
            self.scheme = scheme.to_string();
        }
        self
    }
}

/// Load settings for the repository rooted at `repo_root`
pub fn load_settings(repo_root: &Path) -> Result<Settings> {
    let config_path = repo_root.join(CONFIG_FILE);

    let mut settings = if config_path.exists() {
        let file_cfg = Config::builder()
            .add_source(File::new(
                config_path
                    .to_str()
                    .ok_or_else(|| GryptError::Config("Invalid config path".into()))?,
                FileFormat::Toml,
            ))
            .build()
            .map_err(|err| GryptError::Config(format!("Failed to load {CONFIG_FILE}: {err}")))?;

        file_cfg
            .try_deserialize::<SettingsFile>()
            .map_err(|err| GryptError::Config(format!("Invalid {CONFIG_FILE}: {err}")))?
            .grypt
    } else {
        Settings::default()
    };

    if let Some(keyring) = env_override("KEYRING") {
        settings.keyring = keyring;
    }
    if let Some(scheme) = env_override("SCHEME") {
        settings.scheme = scheme;
    }

    debug!(keyring = %settings.keyring, scheme = %settings.scheme, "loaded settings");
    Ok(settings)
}

fn env_override(name: &str) -> Option<String> {
    env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn clear_env() {
        env::remove_var("GRYPT_KEYRING");
        env::remove_var("GRYPT_SCHEME");
    }

    #[test]
    #[serial]
    fn test_defaults_without_file() {
        clear_env();
        let temp = TempDir::new().unwrap();

        let settings = load_settings(temp.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.keyring, "default");
        assert_eq!(settings.scheme, "default");
    }

    #[test]
    #[serial]
    fn test_reads_file() {
        clear_env();
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "[grypt]\nkeyring = \"prod\"\nscheme = \"blowfish\"\n",
        )
        .unwrap();

        let settings = load_settings(temp.path()).unwrap();
        assert_eq!(settings.keyring, "prod");
        assert_eq!(settings.scheme, "blowfish");
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults() {
        clear_env();
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "[grypt]\nkeyring = \"dev\"\n").unwrap();

        let settings = load_settings(temp.path()).unwrap();
        assert_eq!(settings.keyring, "dev");
        assert_eq!(settings.scheme, DEFAULT_SCHEME);
    }

    #[test]
    #[serial]
    fn test_file_without_section() {
        clear_env();
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "[other]\nx = 1\n").unwrap();

        assert_eq!(load_settings(temp.path()).unwrap(), Settings::default());
    }

    #[test]
    #[serial]
    fn test_env_overrides_file() {
        clear_env();
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "[grypt]\nkeyring = \"prod\"\nscheme = \"blowfish\"\n",
        )
        .unwrap();

        env::set_var("GRYPT_KEYRING", "staging");
        env::set_var("GRYPT_SCHEME", "");
        let settings = load_settings(temp.path());
        clear_env();

        let settings = settings.unwrap();
        assert_eq!(settings.keyring, "staging");
        assert_eq!(settings.scheme, "blowfish");
    }

    #[test]
    #[serial]
    fn test_flags_override_everything() {
        clear_env();
        env::set_var("GRYPT_KEYRING", "staging");
        let temp = TempDir::new().unwrap();
        let settings = load_settings(temp.path());
        clear_env();

        let settings = settings.unwrap().with_overrides(Some("cli"), None);
        assert_eq!(settings.keyring, "cli");
        assert_eq!(settings.scheme, DEFAULT_SCHEME);
    }

    #[test]
    #[serial]
    fn test_invalid_toml_is_config_error() {
        clear_env();
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join(CONFIG_FILE), "[grypt\nkeyring = ").unwrap();

        assert!(matches!(
            load_settings(temp.path()),
            Err(GryptError::Config(_))
        ));
    }
}
