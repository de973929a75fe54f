use crate::config::{load_settings, Settings};
use crate::error::{GryptError, Result};
use crate::git::GitRepo;
use crate::key::Key;
use crate::keyring::{validate_keyring, KeyManager};
use crate::scheme::{resolve_scheme, Scheme, SchemeRegistry};

/// Repository plus resolved settings for one command invocation
pub struct Context {
    repo: GitRepo,
    settings: Settings,
}

impl Context {
    /// Find the repository around the current directory and resolve settings
    pub fn detect(keyring: Option<&str>, scheme: Option<&str>) -> Result<Self> {
        let repo = GitRepo::open(".")?;
        let settings = load_settings(repo.workdir()?)?.with_overrides(keyring, scheme);
        validate_keyring(&settings.keyring)?;
        Ok(Self { repo, settings })
    }

    pub fn repo(&self) -> &GitRepo {
        &self.repo
    }

    pub fn keyring(&self) -> &str {
        &self.settings.keyring
    }

    pub fn scheme(&self) -> Result<Scheme> {
        resolve_scheme(&self.settings.scheme)
    }

    pub fn key_manager(&self) -> KeyManager {
        KeyManager::new(self.repo.git_dir())
    }

    /// Load the key for the selected keyring
    pub fn load_key(&self) -> Result<Key> {
        let key_manager = self.key_manager();
        if !key_manager.is_initialized() {
            return Err(GryptError::NotInitialized);
        }
        key_manager.load_key(self.keyring(), SchemeRegistry::builtin())
    }
}
