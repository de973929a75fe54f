//! # Key Material
//!
//! A [`Key`] is a cipher key and an independent MAC key, bound for its whole
//! life to one [`Scheme`]. Keys are never mutated after creation.
//!
//! ## Creating Keys
//!
//! - [`Key::random`]: bytes from the OS random number generator
//! - [`Key::from_passphrase`]: HKDF-SHA256 over a passphrase, so everyone who
//!   knows the passphrase can regenerate the same key
//! - [`Key::from_entropy`]: any byte source (MAC key is drawn first, then the
//!   cipher key)
//!
//! ## Key File Format
//!
//! Key files are base64 text (standard alphabet, padded) of:
//!
//! ```text
//! [version: u8][name len: u32 BE][scheme name][cipher key len: u32 BE][cipher key][mac key len: u32 BE][mac key]
//! ```
//!
//! The scheme name is resolved through the registry when the file is read.
//! Any malformed field is a [`GryptError::KeyFile`]; nothing is ever padded
//! or defaulted. A missing file is [`GryptError::KeyNotFound`].

use crate::error::{GryptError, Result};
use crate::scheme::{Scheme, SchemeRegistry};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use sha2::Sha256;
use std::fmt;
use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::Path;

/// Current key file format version
pub const KEY_FORMAT_VERSION: u8 = 1;

#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    scheme: Scheme,
    cipher_key: Vec<u8>,
    mac_key: Vec<u8>,
}

impl Key {
    /// Build a key from raw parts, checking the lengths against the scheme.
    pub fn from_parts(scheme: Scheme, cipher_key: Vec<u8>, mac_key: Vec<u8>) -> Result<Self> {
        if cipher_key.len() != scheme.key_size() {
            return Err(GryptError::KeyFile(format!(
                "cipher key is {} bytes, {} needs {}",
                cipher_key.len(),
                scheme,
                scheme.key_size()
            )));
        }
        if mac_key.len() != scheme.mac_size() {
            return Err(GryptError::KeyFile(format!(
                "MAC key is {} bytes, {} needs {}",
                mac_key.len(),
                scheme,
                scheme.mac_size()
            )));
        }
        Ok(Self {
            scheme,
            cipher_key,
            mac_key,
        })
    }

    /// Draw `mac_size() + key_size()` bytes from `entropy`.
    pub fn from_entropy<R: Read + ?Sized>(scheme: Scheme, entropy: &mut R) -> Result<Self> {
        let mut mac_key = vec![0u8; scheme.mac_size()];
        let mut cipher_key = vec![0u8; scheme.key_size()];
        entropy.read_exact(&mut mac_key)?;
        entropy.read_exact(&mut cipher_key)?;
        Self::from_parts(scheme, cipher_key, mac_key)
    }

    /// Generate a new random key
    pub fn random(scheme: Scheme) -> Result<Self> {
        let mut entropy = vec![0u8; scheme.mac_size() + scheme.key_size()];
        OsRng
            .try_fill_bytes(&mut entropy)
            .map_err(|e| GryptError::Other(format!("random number generator failed: {e}")))?;
        Self::from_entropy(scheme, &mut entropy.as_slice())
    }

    /// Derive a key from a passphrase
    pub fn from_passphrase(scheme: Scheme, passphrase: &[u8]) -> Result<Self> {
        let hkdf = Hkdf::<Sha256>::new(None, passphrase);
        let mut entropy = vec![0u8; scheme.mac_size() + scheme.key_size()];
        hkdf.expand(&[], &mut entropy)
            .map_err(|e| GryptError::Other(format!("key derivation failed: {e}")))?;
        Self::from_entropy(scheme, &mut entropy.as_slice())
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    pub fn cipher_key(&self) -> &[u8] {
        &self.cipher_key
    }

    pub fn mac_key(&self) -> &[u8] {
        &self.mac_key
    }

    /// Encrypt with this key's scheme
    pub fn encrypt<R: Read, W: Write>(&self, mut input: R, mut output: W) -> Result<()> {
        self.scheme.encrypt(&mut input, &mut output, self)
    }

    /// Decrypt with this key's scheme
    pub fn decrypt<R: Read, W: Write>(&self, mut input: R, mut output: W) -> Result<()> {
        self.scheme.decrypt(&mut input, &mut output, self)
    }

    /// Binary form, see the module docs
    pub fn to_bytes(&self) -> Vec<u8> {
        let name = self.scheme.name().as_bytes();
        let mut out =
            Vec::with_capacity(1 + 12 + name.len() + self.cipher_key.len() + self.mac_key.len());
        out.push(KEY_FORMAT_VERSION);
        for field in [name, &self.cipher_key[..], &self.mac_key[..]] {
            out.extend_from_slice(&(field.len() as u32).to_be_bytes());
            out.extend_from_slice(field);
        }
        out
    }

    /// Parse the binary form
    pub fn from_bytes(data: &[u8], registry: &SchemeRegistry) -> Result<Self> {
        let mut fields = FieldReader::new(data);

        let version = fields.version()?;
        if version != KEY_FORMAT_VERSION {
            return Err(GryptError::KeyFile(format!(
                "unsupported key format version {version}"
            )));
        }

        let name = fields.field("scheme name")?;
        let name = std::str::from_utf8(name)
            .map_err(|_| GryptError::KeyFile("scheme name is not valid UTF-8".into()))?;
        let scheme = registry.lookup(name)?;

        let cipher_key = fields.field("cipher key")?.to_vec();
        let mac_key = fields.field("MAC key")?.to_vec();
        fields.finish()?;

        Self::from_parts(scheme, cipher_key, mac_key)
    }

    /// Base64 text form, as stored in key files
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(text: &str, registry: &SchemeRegistry) -> Result<Self> {
        let data = STANDARD
            .decode(text.trim())
            .map_err(|e| GryptError::KeyFile(format!("not valid base64: {e}")))?;
        Self::from_bytes(&data, registry)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Key")
            .field("scheme", &self.scheme)
            .field("cipher_key", &"<redacted>")
            .field("mac_key", &"<redacted>")
            .finish()
    }
}

/// Write `key` to `path`, readable by the owner only on Unix.
pub fn write_key_file(path: impl AsRef<Path>, key: &Key) -> Result<()> {
    let path = path.as_ref();
    let mut file = File::create(path)?;
    file.write_all(key.to_base64().as_bytes())?;
    file.write_all(b"\n")?;

    // Set restrictive permissions (Unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)?.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(path, perms)?;
    }

    Ok(())
}

/// Read a key file written by [`write_key_file`].
pub fn read_key_file(path: impl AsRef<Path>, registry: &SchemeRegistry) -> Result<Key> {
    let path = path.as_ref();
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(GryptError::KeyNotFound(path.display().to_string()))
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(GryptError::KeyFile("key file is not text".into()))
        }
        Err(e) => return Err(e.into()),
    };
    Key::from_base64(&text, registry)
}

/// Cursor over the length-prefixed fields of a binary key.
struct FieldReader<'a> {
    data: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        if self.data.len() < n {
            return Err(GryptError::KeyFile(format!(
                "{what} needs {n} bytes, only {} left",
                self.data.len()
            )));
        }
        let (head, rest) = self.data.split_at(n);
        self.data = rest;
        Ok(head)
    }

    fn version(&mut self) -> Result<u8> {
        Ok(self.take(1, "version tag")?[0])
    }

    fn field(&mut self, what: &str) -> Result<&'a [u8]> {
        let mut len = [0u8; 4];
        len.copy_from_slice(self.take(4, what)?);
        let len = u32::from_be_bytes(len) as usize;
        self.take(len, what)
    }

    fn finish(self) -> Result<()> {
        if !self.data.is_empty() {
            return Err(GryptError::KeyFile(format!(
                "{} unexpected trailing bytes",
                self.data.len()
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn registry() -> &'static SchemeRegistry {
        SchemeRegistry::builtin()
    }

    #[test]
    fn test_random_key_sizes() {
        for scheme in Scheme::ALL {
            let key = Key::random(scheme).unwrap();
            assert_eq!(key.scheme(), scheme);
            assert_eq!(key.cipher_key().len(), scheme.key_size());
            assert_eq!(key.mac_key().len(), scheme.mac_size());
        }
    }

    #[test]
    fn test_random_keys_differ() {
        let key1 = Key::random(Scheme::DEFAULT).unwrap();
        let key2 = Key::random(Scheme::DEFAULT).unwrap();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_from_entropy_draws_mac_key_first() {
        let scheme = Scheme::Aes256Sha256Ctr;
        let entropy: Vec<u8> = (0..64).collect();
        let key = Key::from_entropy(scheme, &mut entropy.as_slice()).unwrap();
        assert_eq!(key.mac_key(), &entropy[..32]);
        assert_eq!(key.cipher_key(), &entropy[32..]);
    }

    #[test]
    fn test_from_entropy_short_source_fails() {
        let entropy = [0u8; 10];
        assert!(Key::from_entropy(Scheme::DEFAULT, &mut &entropy[..]).is_err());
    }

    #[test]
    fn test_passphrase_keys_are_reproducible() {
        let key1 = Key::from_passphrase(Scheme::Blowfish448Blake2b512Ctr, b"asdf").unwrap();
        let key2 = Key::from_passphrase(Scheme::Blowfish448Blake2b512Ctr, b"asdf").unwrap();
        let key3 = Key::from_passphrase(Scheme::Blowfish448Blake2b512Ctr, b"asdg").unwrap();
        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }

    #[test]
    fn test_from_parts_checks_lengths() {
        let scheme = Scheme::DEFAULT;
        assert!(Key::from_parts(scheme, vec![0; 31], vec![0; 32]).is_err());
        assert!(Key::from_parts(scheme, vec![0; 32], vec![0; 33]).is_err());
        assert!(Key::from_parts(scheme, vec![0; 32], vec![0; 32]).is_ok());
    }

    #[test]
    fn test_binary_layout() {
        let key = Key::from_parts(Scheme::DEFAULT, vec![0xAA; 32], vec![0xBB; 32]).unwrap();
        let bytes = key.to_bytes();

        assert_eq!(bytes[0], KEY_FORMAT_VERSION);
        assert_eq!(&bytes[1..5], &15u32.to_be_bytes());
        assert_eq!(&bytes[5..20], b"aes256sha256ctr");
        assert_eq!(&bytes[20..24], &32u32.to_be_bytes());
        assert_eq!(bytes.len(), 1 + 4 + 15 + 4 + 32 + 4 + 32);
    }

    #[test]
    fn test_binary_roundtrip_every_scheme() {
        for scheme in Scheme::ALL {
            let key = Key::random(scheme).unwrap();
            let parsed = Key::from_bytes(&key.to_bytes(), registry()).unwrap();
            assert_eq!(key, parsed);
        }
    }

    #[test]
    fn test_overlong_length_prefix_fails() {
        let key = Key::random(Scheme::DEFAULT).unwrap();
        let mut bytes = key.to_bytes();
        // cipher key length prefix sits after version + name field
        let offset = 1 + 4 + key.scheme().name().len();
        bytes[offset..offset + 4].copy_from_slice(&u32::MAX.to_be_bytes());

        assert!(matches!(
            Key::from_bytes(&bytes, registry()),
            Err(GryptError::KeyFile(_))
        ));
    }

    #[test]
    fn test_every_truncation_fails() {
        let key = Key::random(Scheme::Blowfish448Sha256Ctr).unwrap();
        let bytes = key.to_bytes();
        for cut in 0..bytes.len() {
            assert!(
                matches!(Key::from_bytes(&bytes[..cut], registry()), Err(GryptError::KeyFile(_))),
                "cut at {cut}"
            );
        }
    }

    #[test]
    fn test_trailing_bytes_fail() {
        let key = Key::random(Scheme::DEFAULT).unwrap();
        let mut bytes = key.to_bytes();
        bytes.push(0);
        assert!(matches!(
            Key::from_bytes(&bytes, registry()),
            Err(GryptError::KeyFile(_))
        ));
    }

    #[test]
    fn test_unknown_version_fails() {
        let key = Key::random(Scheme::DEFAULT).unwrap();
        let mut bytes = key.to_bytes();
        bytes[0] = 2;
        assert!(matches!(
            Key::from_bytes(&bytes, registry()),
            Err(GryptError::KeyFile(_))
        ));
    }

    #[test]
    fn test_unknown_scheme_name_fails() {
        let mut bytes = vec![KEY_FORMAT_VERSION];
        for field in [&b"rot13"[..], &[0u8; 32][..], &[0u8; 32][..]] {
            bytes.extend_from_slice(&(field.len() as u32).to_be_bytes());
            bytes.extend_from_slice(field);
        }
        assert!(matches!(
            Key::from_bytes(&bytes, registry()),
            Err(GryptError::UnknownScheme(name)) if name == "rot13"
        ));
    }

    #[test]
    fn test_mismatched_key_size_fails() {
        let mut bytes = vec![KEY_FORMAT_VERSION];
        for field in [&b"blowfish448sha256ctr"[..], &[0u8; 32][..], &[0u8; 32][..]] {
            bytes.extend_from_slice(&(field.len() as u32).to_be_bytes());
            bytes.extend_from_slice(field);
        }
        assert!(matches!(
            Key::from_bytes(&bytes, registry()),
            Err(GryptError::KeyFile(_))
        ));
    }

    #[test]
    fn test_key_file_roundtrip() {
        let temp = TempDir::new().unwrap();
        for scheme in Scheme::ALL {
            let path = temp.path().join(format!("{scheme}.key"));
            let key = Key::random(scheme).unwrap();
            write_key_file(&path, &key).unwrap();
            assert_eq!(read_key_file(&path, registry()).unwrap(), key);
        }
    }

    #[test]
    fn test_key_file_is_base64_text() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("default.key");
        let key = Key::random(Scheme::DEFAULT).unwrap();
        write_key_file(&path, &key).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(STANDARD.decode(text.trim()).unwrap(), key.to_bytes());
    }

    #[test]
    fn test_missing_key_file() {
        let temp = TempDir::new().unwrap();
        let result = read_key_file(temp.path().join("absent.key"), registry());
        assert!(matches!(result, Err(GryptError::KeyNotFound(_))));
    }

    #[test]
    fn test_garbage_key_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("garbage.key");
        fs::write(&path, "this is not base64!!").unwrap();
        assert!(matches!(
            read_key_file(&path, registry()),
            Err(GryptError::KeyFile(_))
        ));

        fs::write(&path, STANDARD.encode(b"\x01\x00\x00")).unwrap();
        assert!(matches!(
            read_key_file(&path, registry()),
            Err(GryptError::KeyFile(_))
        ));
    }

    #[test]
    fn test_key_file_permissions_unix() {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let temp = TempDir::new().unwrap();
            let path = temp.path().join("default.key");
            write_key_file(&path, &Key::random(Scheme::DEFAULT).unwrap()).unwrap();

            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_debug_redacts_key_bytes() {
        let key = Key::from_parts(Scheme::DEFAULT, vec![0x41; 32], vec![0x42; 32]).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("redacted"));
        assert!(!debug.contains("65, 65"));
    }
}
