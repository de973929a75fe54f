use crate::commands::Context;
use crate::error::Result;
use crate::key::write_key_file;
use std::path::Path;

/// Export a keyring's key to a file
pub fn export_key(keyring: Option<&str>, output_path: &Path) -> Result<()> {
    let ctx = Context::detect(keyring, None)?;
    let key = ctx.load_key()?;

    write_key_file(output_path, &key)?;

    println!(
        "Exported keyring '{}' to: {}",
        ctx.keyring(),
        output_path.display()
    );
    println!("\nWARNING: Keep this key file secure!");
    println!("Anyone with this key can open the secrets sealed with it.");

    Ok(())
}
