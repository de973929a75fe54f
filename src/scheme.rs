//! # Encryption Schemes
//!
//! A [`Scheme`] names one fixed combination of block cipher, HMAC hash and
//! stream mode. The set is closed: every variant is known at compile time and
//! dispatch happens by matching on the variant, which picks the concrete
//! cipher/hash types for the generic codec in [`crate::crypto`].
//!
//! | Canonical name            | Cipher       | Block | MAC hash    | MAC |
//! |---------------------------|--------------|-------|-------------|-----|
//! | `aes256sha256ctr`         | AES-256      | 16    | SHA-256     | 32  |
//! | `aes256keccak256ctr`      | AES-256      | 16    | Keccak-256  | 32  |
//! | `aes256blake2256ctr`      | AES-256      | 16    | BLAKE2b-256 | 32  |
//! | `blowfish448sha256ctr`    | Blowfish-448 | 8     | SHA-256     | 32  |
//! | `blowfish448blake2512ctr` | Blowfish-448 | 8     | BLAKE2b-512 | 64  |
//!
//! Canonical names are written into envelope headers and key files, so they
//! must never change meaning. Aliases are for humans typing on a command line.
//!
//! Name resolution goes through a [`SchemeRegistry`]: the canonical table is
//! consulted first, then the alias table. Lookups are case-sensitive.

use crate::crypto;
use crate::error::{GryptError, Result};
use crate::key::Key;
use aes::Aes256;
use blake2::{digest::consts::U32, Blake2b, Blake2b512};
use blowfish::Blowfish;
use ctr::{Ctr128BE, Ctr64BE};
use sha2::Sha256;
use sha3::Keccak256;
use std::collections::HashMap;
use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;
use std::sync::OnceLock;

type Blake2b256 = Blake2b<U32>;
type AesCtr = Ctr128BE<Aes256>;
type BlowfishCtr = Ctr64BE<Blowfish>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    /// AES-256 in CTR mode with an HMAC-SHA-256 tag
    Aes256Sha256Ctr,
    /// AES-256 in CTR mode with an HMAC-Keccak-256 tag
    Aes256Keccak256Ctr,
    /// AES-256 in CTR mode with an HMAC-BLAKE2b-256 tag
    Aes256Blake2b256Ctr,
    /// Blowfish-448 in CTR mode with an HMAC-SHA-256 tag
    Blowfish448Sha256Ctr,
    /// Blowfish-448 in CTR mode with an HMAC-BLAKE2b-512 tag
    Blowfish448Blake2b512Ctr,
}

impl Scheme {
    pub const ALL: [Scheme; 5] = [
        Scheme::Aes256Sha256Ctr,
        Scheme::Aes256Keccak256Ctr,
        Scheme::Aes256Blake2b256Ctr,
        Scheme::Blowfish448Sha256Ctr,
        Scheme::Blowfish448Blake2b512Ctr,
    ];

    /// Scheme used for new keys when nothing else is asked for.
    pub const DEFAULT: Scheme = Scheme::Aes256Sha256Ctr;

    /// Stable name used in envelope headers and key files.
    pub fn name(self) -> &'static str {
        match self {
            Scheme::Aes256Sha256Ctr => "aes256sha256ctr",
            Scheme::Aes256Keccak256Ctr => "aes256keccak256ctr",
            Scheme::Aes256Blake2b256Ctr => "aes256blake2256ctr",
            Scheme::Blowfish448Sha256Ctr => "blowfish448sha256ctr",
            Scheme::Blowfish448Blake2b512Ctr => "blowfish448blake2512ctr",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            Scheme::Aes256Sha256Ctr => "AES-256/SHA-256",
            Scheme::Aes256Keccak256Ctr => "AES-256/Keccak-256",
            Scheme::Aes256Blake2b256Ctr => "AES-256/BLAKE2-256",
            Scheme::Blowfish448Sha256Ctr => "Blowfish-448/SHA-256",
            Scheme::Blowfish448Blake2b512Ctr => "Blowfish-448/BLAKE2-512",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Scheme::Aes256Sha256Ctr => &["default", "aes256sha256", "AES-256/SHA-256", "aes-256/sha-256"],
            Scheme::Aes256Keccak256Ctr => &["keccak", "aes256keccak256", "AES-256/Keccak-256"],
            Scheme::Aes256Blake2b256Ctr => &["blake2", "aes256blake2256", "AES-256/BLAKE2-256"],
            Scheme::Blowfish448Sha256Ctr => &["blowfish", "blowfish448sha256", "Blowfish-448/SHA-256"],
            Scheme::Blowfish448Blake2b512Ctr => {
                &["blakefish", "blowfish448blake2512", "Blowfish-448/BLAKE2-512"]
            }
        }
    }

    /// Cipher key length in bytes
    pub fn key_size(self) -> usize {
        match self {
            Scheme::Aes256Sha256Ctr | Scheme::Aes256Keccak256Ctr | Scheme::Aes256Blake2b256Ctr => 32,
            Scheme::Blowfish448Sha256Ctr | Scheme::Blowfish448Blake2b512Ctr => 56,
        }
    }

    /// MAC key and tag length in bytes
    pub fn mac_size(self) -> usize {
        match self {
            Scheme::Blowfish448Blake2b512Ctr => 64,
            _ => 32,
        }
    }

    /// Cipher block length in bytes, which is also the IV length
    pub fn block_size(self) -> usize {
        match self {
            Scheme::Aes256Sha256Ctr | Scheme::Aes256Keccak256Ctr | Scheme::Aes256Blake2b256Ctr => 16,
            Scheme::Blowfish448Sha256Ctr | Scheme::Blowfish448Blake2b512Ctr => 8,
        }
    }

    /// Encrypt `input` into `output` as `IV || length || body || tag`.
    pub fn encrypt<R, W>(self, input: &mut R, output: &mut W, key: &Key) -> Result<()>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        self.check_key(key)?;
        match self {
            Scheme::Aes256Sha256Ctr => crypto::encrypt::<AesCtr, Sha256, _, _>(self, input, output, key),
            Scheme::Aes256Keccak256Ctr => {
                crypto::encrypt::<AesCtr, Keccak256, _, _>(self, input, output, key)
            }
            Scheme::Aes256Blake2b256Ctr => {
                crypto::encrypt::<AesCtr, Blake2b256, _, _>(self, input, output, key)
            }
            Scheme::Blowfish448Sha256Ctr => {
                crypto::encrypt::<BlowfishCtr, Sha256, _, _>(self, input, output, key)
            }
            Scheme::Blowfish448Blake2b512Ctr => {
                crypto::encrypt::<BlowfishCtr, Blake2b512, _, _>(self, input, output, key)
            }
        }
    }

    /// Verify and decrypt a payload produced by [`Scheme::encrypt`].
    ///
    /// Nothing is written to `output` unless the tag verifies.
    pub fn decrypt<R, W>(self, input: &mut R, output: &mut W, key: &Key) -> Result<()>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        self.check_key(key)?;
        match self {
            Scheme::Aes256Sha256Ctr => crypto::decrypt::<AesCtr, Sha256, _, _>(self, input, output, key),
            Scheme::Aes256Keccak256Ctr => {
                crypto::decrypt::<AesCtr, Keccak256, _, _>(self, input, output, key)
            }
            Scheme::Aes256Blake2b256Ctr => {
                crypto::decrypt::<AesCtr, Blake2b256, _, _>(self, input, output, key)
            }
            Scheme::Blowfish448Sha256Ctr => {
                crypto::decrypt::<BlowfishCtr, Sha256, _, _>(self, input, output, key)
            }
            Scheme::Blowfish448Blake2b512Ctr => {
                crypto::decrypt::<BlowfishCtr, Blake2b512, _, _>(self, input, output, key)
            }
        }
    }

    fn check_key(self, key: &Key) -> Result<()> {
        if key.scheme() != self {
            return Err(GryptError::SchemeMismatch {
                envelope: self.name().to_string(),
                key: key.scheme().name().to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scheme {
    type Err = GryptError;

    fn from_str(s: &str) -> Result<Self> {
        SchemeRegistry::builtin().lookup(s)
    }
}

/// Name and alias tables for the supported schemes.
///
/// Built once and read-only afterwards, so a shared reference can be used
/// from any number of threads.
#[derive(Debug, Clone)]
pub struct SchemeRegistry {
    canonical: HashMap<&'static str, Scheme>,
    aliases: HashMap<&'static str, Scheme>,
}

impl SchemeRegistry {
    pub fn new() -> Self {
        let mut canonical = HashMap::new();
        let mut aliases = HashMap::new();
        for scheme in Scheme::ALL {
            let previous = canonical.insert(scheme.name(), scheme);
            debug_assert!(previous.is_none(), "duplicate scheme name {}", scheme.name());
            for alias in scheme.aliases() {
                aliases.insert(*alias, scheme);
            }
        }
        Self { canonical, aliases }
    }

    /// The registry holding every built-in scheme.
    pub fn builtin() -> &'static SchemeRegistry {
        static REGISTRY: OnceLock<SchemeRegistry> = OnceLock::new();
        REGISTRY.get_or_init(SchemeRegistry::new)
    }

    /// Resolve a canonical name or alias.
    pub fn lookup(&self, name: &str) -> Result<Scheme> {
        self.canonical
            .get(name)
            .or_else(|| self.aliases.get(name))
            .copied()
            .ok_or_else(|| GryptError::UnknownScheme(name.to_string()))
    }

    /// Registered schemes in a stable order.
    pub fn schemes(&self) -> impl Iterator<Item = Scheme> + '_ {
        Scheme::ALL
            .into_iter()
            .filter(|scheme| self.canonical.contains_key(scheme.name()))
    }
}

impl Default for SchemeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve a scheme name against the built-in registry.
pub fn resolve_scheme(name: &str) -> Result<Scheme> {
    SchemeRegistry::builtin().lookup(name)
}
