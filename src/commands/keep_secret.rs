use crate::commands::Context;
use crate::error::{GryptError, Result};
use crate::gitattributes::{GitAttributes, GITATTRIBUTES};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Mark files for sealing and wire up the filters
pub fn keep_secret(keyring: Option<&str>, files: &[PathBuf]) -> Result<()> {
    let ctx = Context::detect(keyring, None)?;

    // The clean filter needs the key on the next add
    ctx.load_key()?;

    // Check everything up front so nothing is half-configured
    for file in files {
        if !file.exists() {
            return Err(GryptError::Other(format!(
                "No such file: {}",
                file.display()
            )));
        }
    }

    ctx.repo().configure_filters(ctx.keyring())?;

    let workdir = ctx.repo().workdir()?;
    let attributes_path = workdir.join(GITATTRIBUTES);
    let mut attributes = GitAttributes::load(&attributes_path)?;
    let mut patterns = Vec::with_capacity(files.len());
    for file in files {
        let pattern = attribute_pattern(workdir, file)?;
        debug!(pattern = %pattern, "adding gitattributes entry");
        attributes.put_entry(&pattern);
        println!("Keeping secret: {pattern}");
        patterns.push(pattern);
    }
    attributes.save(&attributes_path)?;
    ctx.repo().stage(Path::new(GITATTRIBUTES))?;

    // A failed add only warns; the file stays unstaged
    let mut unstaged = 0;
    for pattern in &patterns {
        if let Err(err) = ctx.repo().stage_filtered(pattern) {
            warn!("{err}");
            unstaged += 1;
        }
    }

    if unstaged == 0 {
        println!(
            "\nStaged {GITATTRIBUTES} and the files. Commit to seal them with keyring '{}'.",
            ctx.keyring()
        );
    } else {
        println!(
            "\nStaged {GITATTRIBUTES}. Run 'git add' on the files once grypt is on PATH, then commit to seal them with keyring '{}'.",
            ctx.keyring()
        );
    }
    Ok(())
}

/// Path of `file` relative to the repository root, with forward slashes
fn attribute_pattern(workdir: &Path, file: &Path) -> Result<String> {
    let absolute = file.canonicalize()?;
    let root = workdir.canonicalize()?;
    let relative = absolute.strip_prefix(&root).map_err(|_| {
        GryptError::Other(format!(
            "{} is outside the repository",
            file.display()
        ))
    })?;

    let parts: Vec<_> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    let pattern = parts.join("/");

    if pattern.is_empty() || pattern.contains(char::is_whitespace) {
        return Err(GryptError::Other(format!(
            "Cannot keep {} secret: gitattributes patterns cannot be empty or contain whitespace",
            file.display()
        )));
    }
    Ok(pattern)
}
