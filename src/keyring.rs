//! # Keyring Storage
//!
//! Keys live inside the git data directory, one file per keyring:
//!
//! - **Key path**: `.git/grypt/<keyring>.key`
//! - **Format**: base64 key file, see [`crate::key`]
//! - **Permissions**: 0600 on Unix (owner read/write only)
//! - **Never committed**: keys stay in `.git/`
//!
//! A repository can hold several keyrings (say `dev` and `prod`); each sealed
//! file records the keyring it was sealed with in its headers.
//!
//! Keyring names become file names, so they are limited to ASCII letters,
//! digits, `.`, `_` and `-`, and may not start with a dot.

use crate::error::{GryptError, Result};
use crate::key::{read_key_file, write_key_file, Key};
use crate::scheme::{Scheme, SchemeRegistry};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Keyring used when nothing else is configured
pub const DEFAULT_KEYRING: &str = "default";

/// Key storage and management
pub struct KeyManager {
    git_dir: PathBuf,
}

impl KeyManager {
    pub fn new(git_dir: impl AsRef<Path>) -> Self {
        Self {
            git_dir: git_dir.as_ref().to_path_buf(),
        }
    }

    /// Get the path to the grypt directory
    pub fn grypt_dir(&self) -> PathBuf {
        self.git_dir.join("grypt")
    }

    /// Get the path to a keyring's key file
    pub fn key_path(&self, keyring: &str) -> Result<PathBuf> {
        validate_keyring(keyring)?;
        Ok(self.grypt_dir().join(format!("{keyring}.key")))
    }

    /// Check if any key has been stored
    pub fn is_initialized(&self) -> bool {
        self.grypt_dir().is_dir()
    }

    pub fn has_key(&self, keyring: &str) -> Result<bool> {
        Ok(self.key_path(keyring)?.is_file())
    }

    /// Generate and save a new random key
    pub fn generate_key(&self, keyring: &str, scheme: Scheme) -> Result<Key> {
        let key = Key::random(scheme)?;
        self.save_key(keyring, &key)?;
        Ok(key)
    }

    /// Derive and save a key from a passphrase
    pub fn derive_key(&self, keyring: &str, scheme: Scheme, passphrase: &[u8]) -> Result<Key> {
        let key = Key::from_passphrase(scheme, passphrase)?;
        self.save_key(keyring, &key)?;
        Ok(key)
    }

    /// Save a key to disk
    pub fn save_key(&self, keyring: &str, key: &Key) -> Result<()> {
        let key_path = self.key_path(keyring)?;
        let dir = self.grypt_dir();
        fs::create_dir_all(&dir)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&dir, fs::Permissions::from_mode(0o700))?;
        }

        write_key_file(&key_path, key)?;
        debug!(keyring, scheme = key.scheme().name(), "saved key");
        Ok(())
    }

    /// Load a keyring's key from disk
    pub fn load_key(&self, keyring: &str, registry: &SchemeRegistry) -> Result<Key> {
        let key_path = self.key_path(keyring)?;
        match read_key_file(&key_path, registry) {
            Err(GryptError::KeyNotFound(_)) => Err(GryptError::KeyNotFound(keyring.to_string())),
            other => other,
        }
    }

    /// Copy a key file from elsewhere into a keyring
    pub fn import_key(
        &self,
        keyring: &str,
        input_path: impl AsRef<Path>,
        registry: &SchemeRegistry,
    ) -> Result<Key> {
        let key = read_key_file(input_path, registry)?;
        self.save_key(keyring, &key)?;
        Ok(key)
    }
}

/// Check that `keyring` is safe to use as a file name.
pub fn validate_keyring(keyring: &str) -> Result<()> {
    let valid = !keyring.is_empty()
        && !keyring.starts_with('.')
        && keyring
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(GryptError::InvalidKeyring(keyring.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn create_test_git_dir() -> TempDir {
        TempDir::new().unwrap()
    }

    fn registry() -> &'static SchemeRegistry {
        SchemeRegistry::builtin()
    }

    #[test]
    fn test_grypt_dir_path() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        assert_eq!(key_manager.grypt_dir(), temp.path().join("grypt"));
    }

    #[test]
    fn test_key_path() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        let expected = temp.path().join("grypt").join("prod.key");
        assert_eq!(key_manager.key_path("prod").unwrap(), expected);
    }

    #[test]
    fn test_keyring_names() {
        for ok in ["default", "prod", "team-a", "v2.1", "under_score"] {
            assert!(validate_keyring(ok).is_ok(), "{ok}");
        }
        for bad in ["", ".hidden", "../escape", "a/b", "with space", "ünicode"] {
            assert!(
                matches!(validate_keyring(bad), Err(GryptError::InvalidKeyring(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_is_initialized() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());
        assert!(!key_manager.is_initialized());

        key_manager.generate_key(DEFAULT_KEYRING, Scheme::DEFAULT).unwrap();
        assert!(key_manager.is_initialized());
        assert!(key_manager.has_key(DEFAULT_KEYRING).unwrap());
        assert!(!key_manager.has_key("other").unwrap());
    }

    #[test]
    fn test_generate_and_load_key() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        let key1 = key_manager
            .generate_key(DEFAULT_KEYRING, Scheme::Blowfish448Sha256Ctr)
            .unwrap();
        let key2 = key_manager.load_key(DEFAULT_KEYRING, registry()).unwrap();

        assert_eq!(key1, key2);
        assert_eq!(key2.scheme(), Scheme::Blowfish448Sha256Ctr);
    }

    #[test]
    fn test_keyrings_are_independent() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        let dev = key_manager.generate_key("dev", Scheme::DEFAULT).unwrap();
        let prod = key_manager.generate_key("prod", Scheme::DEFAULT).unwrap();

        assert_ne!(dev, prod);
        assert_eq!(key_manager.load_key("dev", registry()).unwrap(), dev);
        assert_eq!(key_manager.load_key("prod", registry()).unwrap(), prod);
    }

    #[test]
    fn test_derived_keys_match_across_repos() {
        let temp1 = create_test_git_dir();
        let temp2 = create_test_git_dir();

        let key1 = KeyManager::new(temp1.path())
            .derive_key(DEFAULT_KEYRING, Scheme::DEFAULT, b"asdf")
            .unwrap();
        let key2 = KeyManager::new(temp2.path())
            .derive_key(DEFAULT_KEYRING, Scheme::DEFAULT, b"asdf")
            .unwrap();

        assert_eq!(key1, key2);
    }

    #[test]
    fn test_load_missing_key_fails() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        let result = key_manager.load_key(DEFAULT_KEYRING, registry());
        assert!(matches!(result, Err(GryptError::KeyNotFound(name)) if name == DEFAULT_KEYRING));
    }

    #[test]
    fn test_load_invalid_keyring_fails() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        let result = key_manager.load_key("../../etc/passwd", registry());
        assert!(matches!(result, Err(GryptError::InvalidKeyring(_))));
    }

    #[test]
    fn test_import_key() {
        let temp = create_test_git_dir();
        let source = KeyManager::new(temp.path().join("a"));
        let original = source.generate_key(DEFAULT_KEYRING, Scheme::DEFAULT).unwrap();

        let target = KeyManager::new(temp.path().join("b"));
        let export_path = source.key_path(DEFAULT_KEYRING).unwrap();
        target.import_key("shared", &export_path, registry()).unwrap();

        assert_eq!(target.load_key("shared", registry()).unwrap(), original);
    }

    #[test]
    fn test_import_invalid_key_file() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        let invalid_key_path = temp.path().join("invalid.key");
        fs::write(&invalid_key_path, b"too short").unwrap();

        let result = key_manager.import_key(DEFAULT_KEYRING, &invalid_key_path, registry());
        assert!(matches!(result, Err(GryptError::KeyFile(_))));
        assert!(!key_manager.has_key(DEFAULT_KEYRING).unwrap());
    }

    #[test]
    fn test_multiple_save_overwrites() {
        let temp = create_test_git_dir();
        let key_manager = KeyManager::new(temp.path());

        let key1 = Key::random(Scheme::DEFAULT).unwrap();
        key_manager.save_key(DEFAULT_KEYRING, &key1).unwrap();

        let key2 = Key::random(Scheme::DEFAULT).unwrap();
        key_manager.save_key(DEFAULT_KEYRING, &key2).unwrap();

        let loaded = key_manager.load_key(DEFAULT_KEYRING, registry()).unwrap();
        assert_eq!(key2, loaded);
        assert_ne!(key1, loaded);
    }

    #[test]
    fn test_key_dir_permissions_unix() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let temp = create_test_git_dir();
            let key_manager = KeyManager::new(temp.path());
            key_manager.generate_key(DEFAULT_KEYRING, Scheme::DEFAULT).unwrap();

            let metadata = fs::metadata(key_manager.grypt_dir()).unwrap();
            assert_eq!(metadata.permissions().mode() & 0o777, 0o700);
        }
    }
}
