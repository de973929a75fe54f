use crate::commands::Context;
use crate::error::{GryptError, Result};

/// Lock the repository (remove filters so sealed content shows as is)
pub fn lock() -> Result<()> {
    println!("Locking repository...");

    let ctx = Context::detect(None, None)?;

    if !ctx.key_manager().is_initialized() {
        return Err(GryptError::NotInitialized);
    }

    ctx.repo().remove_filters()?;

    println!("Repository locked!");
    println!("\nSealed files will now show their sealed content after checkout.");
    println!("Run 'grypt unlock' to restore access.");

    Ok(())
}
