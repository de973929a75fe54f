use crate::error::{GryptError, Result};
use crate::key::Key;
use crate::scheme::SchemeRegistry;
use crate::vault::{is_envelope, open, read_headers, seal, Metadata};
use git2::Repository;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;
use std::process::Command;
use tracing::{debug, warn};

/// Name of the filter and diff drivers in `.git/config` and `.gitattributes`
pub const FILTER_NAME: &str = "grypt";

const FILTER_CLEAN: &str = "filter.grypt.clean";
const FILTER_SMUDGE: &str = "filter.grypt.smudge";
const FILTER_REQUIRED: &str = "filter.grypt.required";
const DIFF_TEXTCONV: &str = "diff.grypt.textconv";

pub struct GitRepo {
    repo: Repository,
}

impl GitRepo {
    /// Open the repository containing `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let repo = Repository::discover(path).map_err(|_| GryptError::NotInGitRepo)?;
        Ok(Self { repo })
    }

    /// Get the git directory path
    pub fn git_dir(&self) -> &Path {
        self.repo.path()
    }

    /// Get repository root path
    pub fn workdir(&self) -> Result<&Path> {
        self.repo.workdir().ok_or(GryptError::Other(
            "Repository has no working directory".into(),
        ))
    }

    /// Point the grypt filter and diff drivers at `keyring`
    pub fn configure_filters(&self, keyring: &str) -> Result<()> {
        let mut config = self.repo.config()?;

        // Seal on add/commit
        config.set_str(FILTER_CLEAN, &format!("grypt clean --keyring {keyring}"))?;

        // Open on checkout
        config.set_str(FILTER_SMUDGE, &format!("grypt smudge --keyring {keyring}"))?;

        config.set_bool(FILTER_REQUIRED, true)?;

        // Readable diffs of sealed blobs
        config.set_str(DIFF_TEXTCONV, &format!("grypt textconv --keyring {keyring}"))?;

        debug!(keyring, "configured git filters");
        Ok(())
    }

    /// Remove grypt filters
    pub fn remove_filters(&self) -> Result<()> {
        let mut config = self.repo.config()?;

        let _ = config.remove(FILTER_CLEAN);
        let _ = config.remove(FILTER_SMUDGE);
        let _ = config.remove(FILTER_REQUIRED);
        let _ = config.remove(DIFF_TEXTCONV);

        Ok(())
    }

    /// Stage `path` (relative to the root) as it is on disk
    pub fn stage(&self, path: &Path) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_path(path)?;
        index.write()?;
        Ok(())
    }

    /// Stage `path` with `git add`, so the configured filters seal it.
    /// libgit2 does not run external filter drivers.
    pub fn stage_filtered(&self, path: &str) -> Result<()> {
        let output = Command::new("git")
            .args(["add", "--", path])
            .current_dir(self.workdir()?)
            .output()?;
        if !output.status.success() {
            return Err(GryptError::Other(format!(
                "git add {path} failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    /// The clean command currently configured, if any
    pub fn configured_clean(&self) -> Result<Option<String>> {
        let config = self.repo.config()?.snapshot()?;
        Ok(config.get_string(FILTER_CLEAN).ok())
    }
}

/// Clean filter: seal file content
pub fn clean_filter<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    key: &Key,
    keyring: &str,
    registry: &SchemeRegistry,
) -> Result<()> {
    let mut content = Vec::new();
    input.read_to_end(&mut content)?;

    // Only an envelope this key opens counts as already sealed
    if is_envelope(&content) {
        match open(content.as_slice(), io::sink(), key, registry) {
            Ok(_) => {
                debug!("input is already sealed, passing through");
                output.write_all(&content)?;
                output.flush()?;
                return Ok(());
            }
            Err(err) => debug!("input looks sealed but does not open ({err}), sealing it"),
        }
    }

    seal(
        content.as_slice(),
        output,
        key,
        key.scheme(),
        &Metadata::new(keyring),
    )
}

/// Smudge filter: open sealed content, pass anything else through
pub fn smudge_filter<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    key: &Key,
    keyring: &str,
    registry: &SchemeRegistry,
) -> Result<()> {
    let mut content = Vec::new();
    input.read_to_end(&mut content)?;

    if !is_envelope(&content) {
        output.write_all(&content)?;
        output.flush()?;
        return Ok(());
    }

    match open(content.as_slice(), &mut output, key, registry) {
        Ok(_) => Ok(()),
        Err(GryptError::Integrity) => {
            warn_on_keyring_mismatch(&content, keyring);
            Err(GryptError::Integrity)
        }
        Err(err) => Err(err),
    }
}

/// Textconv filter: like smudge, reading the file git hands us
pub fn textconv_filter<W: Write>(
    path: impl AsRef<Path>,
    output: W,
    key: &Key,
    keyring: &str,
    registry: &SchemeRegistry,
) -> Result<()> {
    let file = File::open(path)?;
    smudge_filter(file, output, key, keyring, registry)
}

fn warn_on_keyring_mismatch(content: &[u8], keyring: &str) {
    let Ok(headers) = read_headers(&mut &content[..]) else {
        return;
    };
    if let Some(sealed_with) = headers.keyring() {
        if sealed_with != keyring {
            warn!(
                "content was sealed with keyring {sealed_with:?} but keyring {keyring:?} is in use"
            );
        }
    }
}
