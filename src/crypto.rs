//! # Symmetric Envelope Codec
//!
//! Deterministic authenticated encryption, generic over a stream cipher and a
//! hash function. Every [`Scheme`](crate::Scheme) is one instantiation of the
//! functions in this module.
//!
//! ## Payload Format
//!
//! ```text
//! [IV: block size][body length: u64 BE][ciphered body][HMAC tag: MAC size]
//! ```
//!
//! - **IV**: the leading block-size bytes of `HMAC(mac_key, plaintext)`.
//!   Identical plaintext under the same key always gets the same IV, so
//!   re-encrypting unchanged content is byte-stable and does not show up as a
//!   diff. The flip side is that equal plaintexts are recognisable as equal.
//! - **Body**: the plaintext run through the cipher in CTR mode. CTR never
//!   pads, so the body is exactly as long as the plaintext.
//! - **Tag**: `HMAC(mac_key, body)` from a second, independent HMAC instance.
//!
//! The IV needs a full pass over the plaintext before the first ciphertext
//! byte exists, so encryption buffers the whole input. Decryption also
//! buffers: plaintext is only written out once the tag has been verified.
//!
//! After the tag check, decryption recomputes the plaintext HMAC and checks it
//! against the IV. The tag does not cover the IV, and this second check is
//! what catches an altered IV.

use crate::error::{GryptError, Result};
use crate::key::Key;
use crate::scheme::Scheme;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::digest::{core_api::BlockSizeUser, Digest};
use hmac::{Mac, SimpleHmac};
use std::io::{ErrorKind, Read, Write};
use tracing::debug;

/// Size of the big-endian body length field
pub const LENGTH_FIELD_SIZE: usize = 8;

const CHUNK_SIZE: usize = 64 * 1024;

/// Encrypt everything readable from `input` and write the payload to `output`.
pub(crate) fn encrypt<C, D, R, W>(
    scheme: Scheme,
    input: &mut R,
    output: &mut W,
    key: &Key,
) -> Result<()>
where
    C: StreamCipher + KeyIvInit,
    D: Digest + BlockSizeUser + Clone,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    // Buffer the plaintext while deriving the IV from it
    let mut plaintext = Vec::new();
    let mut iv_mac = new_mac::<D>(key.mac_key())?;
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = read_some(input, &mut chunk)?;
        if n == 0 {
            break;
        }
        iv_mac.update(&chunk[..n]);
        plaintext.extend_from_slice(&chunk[..n]);
    }
    let digest = iv_mac.finalize().into_bytes();
    let iv = &digest[..scheme.block_size()];

    debug!(
        scheme = scheme.name(),
        len = plaintext.len(),
        iv = %hex::encode(iv),
        "encrypting"
    );

    output.write_all(iv)?;
    output.write_all(&(plaintext.len() as u64).to_be_bytes())?;

    let mut cipher = new_stream::<C>(key.cipher_key(), iv)?;
    let mut body_mac = new_mac::<D>(key.mac_key())?;
    for block in plaintext.chunks_mut(CHUNK_SIZE) {
        cipher.apply_keystream(block);
        body_mac.update(block);
        output.write_all(block)?;
    }

    output.write_all(&body_mac.finalize().into_bytes())?;
    output.flush()?;
    Ok(())
}

/// Verify and decrypt one payload from `input`, writing the plaintext to
/// `output` only after verification succeeds.
///
/// Bytes after the tag are left unread.
pub(crate) fn decrypt<C, D, R, W>(
    scheme: Scheme,
    input: &mut R,
    output: &mut W,
    key: &Key,
) -> Result<()>
where
    C: StreamCipher + KeyIvInit,
    D: Digest + BlockSizeUser + Clone,
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    let mut iv = vec![0u8; scheme.block_size()];
    read_field(input, &mut iv, "IV")?;

    let mut length = [0u8; LENGTH_FIELD_SIZE];
    read_field(input, &mut length, "length field")?;
    let body_len = u64::from_be_bytes(length);

    debug!(scheme = scheme.name(), len = body_len, iv = %hex::encode(&iv), "decrypting");

    let mut cipher = new_stream::<C>(key.cipher_key(), &iv)?;
    let mut body_mac = new_mac::<D>(key.mac_key())?;

    // The declared length is untrusted; grow the buffer as bytes arrive.
    let mut plaintext = Vec::with_capacity(body_len.min(CHUNK_SIZE as u64) as usize);
    let mut chunk = vec![0u8; CHUNK_SIZE];
    let mut remaining = body_len;
    while remaining > 0 {
        let want = remaining.min(CHUNK_SIZE as u64) as usize;
        let n = read_some(input, &mut chunk[..want])?;
        if n == 0 {
            return Err(GryptError::Truncated(format!(
                "body declared {} bytes but the stream ended after {}",
                body_len,
                body_len - remaining
            )));
        }
        body_mac.update(&chunk[..n]);
        cipher.apply_keystream(&mut chunk[..n]);
        plaintext.extend_from_slice(&chunk[..n]);
        remaining -= n as u64;
    }

    let mut tag = vec![0u8; scheme.mac_size()];
    read_field(input, &mut tag, "MAC tag")?;
    body_mac.verify_slice(&tag).map_err(|_| GryptError::Integrity)?;

    let mut iv_mac = new_mac::<D>(key.mac_key())?;
    iv_mac.update(&plaintext);
    iv_mac
        .verify_truncated_left(&iv)
        .map_err(|_| GryptError::Integrity)?;

    output.write_all(&plaintext)?;
    output.flush()?;
    Ok(())
}

fn new_mac<D>(mac_key: &[u8]) -> Result<SimpleHmac<D>>
where
    D: Digest + BlockSizeUser + Clone,
{
    <SimpleHmac<D> as Mac>::new_from_slice(mac_key)
        .map_err(|e| GryptError::KeyFile(format!("unusable MAC key: {e}")))
}

fn new_stream<C>(cipher_key: &[u8], iv: &[u8]) -> Result<C>
where
    C: StreamCipher + KeyIvInit,
{
    C::new_from_slices(cipher_key, iv)
        .map_err(|e| GryptError::KeyFile(format!("unusable cipher key or IV: {e}")))
}

fn read_some<R: Read + ?Sized>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match input.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

fn read_field<R: Read + ?Sized>(input: &mut R, buf: &mut [u8], what: &str) -> Result<()> {
    input.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => {
            GryptError::Truncated(format!("stream ended inside the {what}"))
        }
        _ => GryptError::Io(e),
    })
}
