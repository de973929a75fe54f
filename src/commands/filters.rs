use crate::commands::Context;
use crate::error::Result;
use crate::git::{clean_filter, smudge_filter, textconv_filter};
use crate::scheme::SchemeRegistry;
use std::io;
use std::path::Path;

/// Clean filter implementation (called by git during add/commit)
pub fn clean(keyring: Option<&str>) -> Result<()> {
    let ctx = Context::detect(keyring, None)?;
    let key = ctx.load_key()?;
    clean_filter(
        io::stdin().lock(),
        io::stdout().lock(),
        &key,
        ctx.keyring(),
        SchemeRegistry::builtin(),
    )
}

/// Smudge filter implementation (called by git during checkout)
pub fn smudge(keyring: Option<&str>) -> Result<()> {
    let ctx = Context::detect(keyring, None)?;
    let key = ctx.load_key()?;
    smudge_filter(
        io::stdin().lock(),
        io::stdout().lock(),
        &key,
        ctx.keyring(),
        SchemeRegistry::builtin(),
    )
}

/// Textconv implementation (called by git during diff)
pub fn textconv(file: &Path, keyring: Option<&str>) -> Result<()> {
    let ctx = Context::detect(keyring, None)?;
    let key = ctx.load_key()?;
    textconv_filter(
        file,
        io::stdout().lock(),
        &key,
        ctx.keyring(),
        SchemeRegistry::builtin(),
    )
}
