//! # grypt
//!
//! Keep secrets in a git repository. Files marked in `.gitattributes` are
//! sealed when committed and opened again on checkout, using git's
//! clean/smudge filters.
//!
//! ## Features
//!
//! - **Deterministic sealing**: the same file sealed with the same key always
//!   produces the same bytes, so git does not see spurious changes
//! - **Authenticated**: every sealed file carries an HMAC tag that is checked
//!   before any plaintext is released
//! - **Several schemes**: AES-256 or Blowfish-448 in CTR mode, with SHA-256,
//!   Keccak-256, BLAKE2b-256 or BLAKE2b-512 HMACs
//! - **Keyrings**: keep separate keys for, say, `dev` and `prod` secrets
//! - **Passphrase keys**: collaborators who share a passphrase derive the same
//!   key without ever passing key files around
//! - **Readable provenance**: sealed files start with a text header block
//!   naming the scheme and keyring
//!
//! ## Quick Start
//!
//! ```bash
//! # Derive a key from a passphrase (prompted for)
//! grypt generate-key
//!
//! # Seal a file from now on (stages it and .gitattributes)
//! grypt keep-secret config/database.yml
//! git commit -m "Keep database config secret"
//!
//! # Who sealed this, and how?
//! git show HEAD:config/database.yml > sealed.yml
//! grypt headers sealed.yml
//! ```
//!
//! ## How It Works
//!
//! 1. **Clean filter** (`git add`): plaintext is sealed into an envelope
//! 2. **Smudge filter** (`git checkout`): envelopes are verified and opened
//! 3. **Textconv** (`git diff`): sealed blobs are shown as plaintext
//!
//! Keys live in `.git/grypt/<keyring>.key` and are never committed.
//!
//! ### Sealing
//!
//! ```text
//! IV   = HMAC(mac_key, plaintext)[..block size]
//! body = CTR(cipher_key, IV, plaintext)
//! tag  = HMAC(mac_key, body)
//! ```
//!
//! The IV depends only on the key and the content. Identical files seal to
//! identical bytes, which leaks that two files (or two revisions) are equal;
//! in exchange, git's deduplication and diffing keep working.
//!
//! ### Sealed File Format
//!
//! ```text
//! -----BEGIN GRYPT CIPHERTEXT HEADER-----
//! Grypt-Version: 0.2.0
//! Grypt-Scheme: aes256sha256ctr
//! Grypt-Keyring: default
//! -----END GRYPT CIPHERTEXT HEADER-----
//! [IV][8-byte big-endian length][body][tag]
//! ```
//!
//! ## Module Overview
//!
//! - [`scheme`] - Encryption schemes and the registry that names them
//! - [`crypto`] - The deterministic encrypt/decrypt codec
//! - [`vault`] - Envelope headers and framing
//! - [`key`] - Key material and the key file format
//! - [`keyring`] - Per-keyring key storage under `.git/grypt/`
//! - [`git`] - Filter configuration and the clean/smudge/textconv filters
//! - [`gitattributes`] - Editing `.gitattributes` without disturbing it
//! - [`config`] - `.grypt.toml` settings and environment overrides
//! - [`commands`] - The `grypt` subcommands
//! - [`error`] - Error types and unified error handling
//!
//! ## Commands
//!
//! - `generate-key [--keyring NAME] [--scheme NAME] [--random-key] [--password P]`
//! - `keep-secret [--keyring NAME] FILE...`
//! - `unlock [--keyring NAME] [--key-file PATH]`
//! - `lock`
//! - `export-key [--keyring NAME] OUTPUT`
//! - `headers FILE`
//! - `schemes`
//! - `clean`, `smudge`, `textconv FILE` - plumbing used by git
//!
//! Logging goes to stderr and is controlled by `GRYPT_LOG` (for example
//! `GRYPT_LOG=debug`).
//!
//! ## Library Use
//!
//! ```no_run
//! use grypt::{open, seal, Key, Metadata, Scheme, SchemeRegistry};
//!
//! # fn main() -> grypt::Result<()> {
//! let key = Key::from_passphrase(Scheme::DEFAULT, b"correct horse")?;
//!
//! let mut sealed = Vec::new();
//! seal(&b"hello world"[..], &mut sealed, &key, key.scheme(), &Metadata::new("default"))?;
//!
//! let mut opened = Vec::new();
//! open(sealed.as_slice(), &mut opened, &key, SchemeRegistry::builtin())?;
//! assert_eq!(opened, b"hello world");
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod config;
pub mod crypto;
pub mod error;
pub mod git;
pub mod gitattributes;
pub mod key;
pub mod keyring;
pub mod scheme;
pub mod vault;

// Re-export commonly used types
pub use error::{GryptError, Result};
pub use git::GitRepo;
pub use key::{read_key_file, write_key_file, Key};
pub use keyring::KeyManager;
pub use scheme::{resolve_scheme, Scheme, SchemeRegistry};
pub use vault::{is_envelope, open, read_headers, seal, Envelope, Headers, Metadata};
