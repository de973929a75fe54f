use crate::commands::Context;
use crate::error::{GryptError, Result};
use rpassword::prompt_password;

pub struct GenerateKeyOptions<'a> {
    pub keyring: Option<&'a str>,
    pub scheme: Option<&'a str>,
    pub random: bool,
    pub password: Option<&'a str>,
    pub force: bool,
}

/// Generate a key for a keyring, from a passphrase or at random
pub fn generate_key(options: GenerateKeyOptions<'_>) -> Result<()> {
    let ctx = Context::detect(options.keyring, options.scheme)?;
    let scheme = ctx.scheme()?;
    let key_manager = ctx.key_manager();
    let keyring = ctx.keyring();

    if key_manager.has_key(keyring)? && !options.force {
        return Err(GryptError::Other(format!(
            "Keyring '{keyring}' already has a key. Use --force to replace it"
        )));
    }

    let key = if options.random {
        key_manager.generate_key(keyring, scheme)?
    } else {
        let passphrase = match options.password {
            Some(password) => password.to_string(),
            None => read_passphrase()?,
        };
        if passphrase.is_empty() {
            return Err(GryptError::Other("Passphrase cannot be empty".into()));
        }
        key_manager.derive_key(keyring, scheme, passphrase.as_bytes())?
    };

    println!(
        "Generated {} key for keyring '{}'",
        key.scheme().label(),
        keyring
    );
    println!("Key saved to {}", key_manager.key_path(keyring)?.display());
    if options.random {
        println!("\nThis key cannot be recreated from a passphrase.");
        println!("Share it with 'grypt export-key' over a secure channel.");
    }

    Ok(())
}

fn read_passphrase() -> Result<String> {
    let passphrase = prompt_password("Passphrase: ")?;
    let confirm = prompt_password("Confirm passphrase: ")?;
    if passphrase != confirm {
        return Err(GryptError::Other("Passphrases do not match".into()));
    }
    Ok(passphrase)
}
