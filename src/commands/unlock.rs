use crate::commands::Context;
use crate::error::Result;
use crate::scheme::SchemeRegistry;
use std::path::Path;

/// Unlock the repository (open sealed files on checkout)
pub fn unlock(keyring: Option<&str>, key_file: Option<&Path>) -> Result<()> {
    println!("Unlocking repository...");

    let ctx = Context::detect(keyring, None)?;
    let key_manager = ctx.key_manager();

    // If key file provided, import it
    if let Some(key_path) = key_file {
        println!("Importing key from: {}", key_path.display());
        key_manager.import_key(ctx.keyring(), key_path, SchemeRegistry::builtin())?;
    }

    // Make sure the key is there and readable
    let key = ctx.load_key()?;

    ctx.repo().configure_filters(ctx.keyring())?;

    println!(
        "Repository unlocked with keyring '{}' ({})",
        ctx.keyring(),
        key.scheme().label()
    );
    println!("\nRun 'git checkout HEAD -- .' to open all tracked secrets");

    Ok(())
}
