//! # Envelope Framing
//!
//! Sealed content is a short text header block followed by the raw payload
//! from [`crate::crypto`]:
//!
//! ```text
//! -----BEGIN GRYPT CIPHERTEXT HEADER-----
//! Grypt-Version: 0.2.0
//! Grypt-Scheme: aes256sha256ctr
//! Grypt-Keyring: default
//! -----END GRYPT CIPHERTEXT HEADER-----
//! <IV><length><body><tag>
//!
//!
//! ```
//!
//! The three `Grypt-*` headers are required and always come first, in that
//! order. Any other headers follow in lexicographic order, so sealing the same
//! content twice produces the same bytes. Header names match
//! `[A-Z][A-Za-z0-9-]*`; values are a single line and are trimmed on read.
//!
//! Readers skip header lines they cannot parse, and give up with a format
//! error if no closing delimiter shows up within [`MAX_HEADER_BLOCK`] bytes.
//! The headers are not authenticated; only the scheme header affects how the
//! payload is opened.

use crate::error::{GryptError, Result};
use crate::key::Key;
use crate::scheme::{Scheme, SchemeRegistry};
use std::collections::BTreeMap;
use std::io::{BufRead, BufReader, Read, Write};
use tracing::debug;

pub const BEGIN_LINE: &str = "-----BEGIN GRYPT CIPHERTEXT HEADER-----";
pub const END_LINE: &str = "-----END GRYPT CIPHERTEXT HEADER-----";

/// Upper bound on the header block, delimiters included.
pub const MAX_HEADER_BLOCK: usize = 1024 * 1024;

/// Version of the tool that produced the envelope
pub const HEADER_VERSION: &str = "Grypt-Version";
/// Canonical name of the scheme the payload was sealed with
pub const HEADER_SCHEME: &str = "Grypt-Scheme";
/// Name of the keyring whose key sealed the payload
pub const HEADER_KEYRING: &str = "Grypt-Keyring";

pub const REQUIRED_HEADERS: [&str; 3] = [HEADER_VERSION, HEADER_SCHEME, HEADER_KEYRING];

/// Header block of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: BTreeMap<String, String>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(name.into(), value.into());
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in serialization order: required headers first, then the rest
    /// sorted by name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        let required = REQUIRED_HEADERS
            .iter()
            .filter_map(|name| self.entries.get_key_value(*name));
        let rest = self
            .entries
            .iter()
            .filter(|(name, _)| !REQUIRED_HEADERS.contains(&name.as_str()));
        required
            .chain(rest)
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn version(&self) -> Option<&str> {
        self.get(HEADER_VERSION)
    }

    pub fn scheme(&self) -> Option<&str> {
        self.get(HEADER_SCHEME)
    }

    pub fn keyring(&self) -> Option<&str> {
        self.get(HEADER_KEYRING)
    }

    fn require(&self, name: &'static str) -> Result<&str> {
        self.get(name)
            .ok_or_else(|| GryptError::Format(format!("missing required header {name}")))
    }

    fn check_required(&self) -> Result<()> {
        for name in REQUIRED_HEADERS {
            self.require(name)?;
        }
        Ok(())
    }
}

/// Caller-supplied values for the envelope headers.
#[derive(Debug, Clone)]
pub struct Metadata {
    version: String,
    keyring: String,
    extra: Headers,
}

impl Metadata {
    /// Metadata stamped with this crate's version.
    pub fn new(keyring: impl Into<String>) -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            keyring: keyring.into(),
            extra: Headers::new(),
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a pass-through header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(name, value);
        self
    }

    pub fn keyring(&self) -> &str {
        &self.keyring
    }

    fn headers_for(&self, scheme: Scheme) -> Result<Headers> {
        let mut headers = Headers::new();
        for (name, value) in self.extra.iter() {
            if REQUIRED_HEADERS.contains(&name) {
                return Err(GryptError::Format(format!(
                    "header {name} is set by grypt and cannot be overridden"
                )));
            }
            headers.insert(name, value);
        }
        headers.insert(HEADER_VERSION, self.version.as_str());
        headers.insert(HEADER_SCHEME, scheme.name());
        headers.insert(HEADER_KEYRING, self.keyring.as_str());
        Ok(headers)
    }
}

/// A header block plus the payload it describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    headers: Headers,
    ciphertext: Vec<u8>,
}

impl Envelope {
    pub fn new(headers: Headers, ciphertext: Vec<u8>) -> Result<Self> {
        validate(&headers)?;
        Ok(Self {
            headers,
            ciphertext,
        })
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    pub fn write_to<W: Write + ?Sized>(&self, output: &mut W) -> Result<()> {
        output.write_all(&header_block(&self.headers))?;
        output.write_all(&self.ciphertext)?;

        // Keeps terminals happy when someone cats a sealed file
        output.write_all(b"\n\n")?;
        output.flush()?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = header_block(&self.headers);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(b"\n\n");
        out
    }
}

/// Seal everything readable from `input` under `key` and write the envelope
/// to `output`.
///
/// `scheme` must be the scheme the key is bound to.
pub fn seal<R: Read, W: Write>(
    mut input: R,
    mut output: W,
    key: &Key,
    scheme: Scheme,
    metadata: &Metadata,
) -> Result<()> {
    if scheme != key.scheme() {
        return Err(GryptError::SchemeMismatch {
            envelope: scheme.name().to_string(),
            key: key.scheme().name().to_string(),
        });
    }

    // Validate before doing any crypto work
    let headers = metadata.headers_for(scheme)?;
    validate(&headers)?;

    let mut ciphertext = Vec::new();
    scheme.encrypt(&mut input, &mut ciphertext, key)?;
    debug!(scheme = scheme.name(), keyring = metadata.keyring(), "sealed envelope");

    Envelope::new(headers, ciphertext)?.write_to(&mut output)
}

/// Open an envelope from `input`, writing the verified plaintext to `output`.
///
/// Returns the parsed headers so callers can inspect provenance.
pub fn open<R: Read, W: Write>(
    input: R,
    mut output: W,
    key: &Key,
    registry: &SchemeRegistry,
) -> Result<Headers> {
    let mut reader = BufReader::new(input);
    let headers = read_headers(&mut reader)?;

    let scheme = registry.lookup(headers.require(HEADER_SCHEME)?)?;
    if scheme != key.scheme() {
        return Err(GryptError::SchemeMismatch {
            envelope: scheme.name().to_string(),
            key: key.scheme().name().to_string(),
        });
    }

    // The BufReader still holds whatever it read past the header block
    scheme.decrypt(&mut reader, &mut output, key)?;
    debug!(
        scheme = scheme.name(),
        keyring = headers.keyring().unwrap_or_default(),
        "opened envelope"
    );
    Ok(headers)
}

/// Parse the header block, leaving `reader` positioned at the first payload
/// byte. No key is needed.
pub fn read_headers<R: BufRead + ?Sized>(reader: &mut R) -> Result<Headers> {
    let mut budget = MAX_HEADER_BLOCK;

    match next_line(reader, &mut budget)? {
        Line::Complete(line) if line == BEGIN_LINE.as_bytes() => {}
        _ => {
            return Err(GryptError::Format(
                "not an envelope: missing opening delimiter".into(),
            ))
        }
    }

    let mut headers = Headers::new();
    loop {
        match next_line(reader, &mut budget)? {
            Line::Complete(line) if line == END_LINE.as_bytes() => break,
            Line::Complete(line) => {
                let Ok(line) = std::str::from_utf8(&line) else {
                    continue;
                };
                if let Some((name, value)) = parse_header_line(line) {
                    // first occurrence wins
                    if !headers.contains(name) {
                        headers.insert(name, value);
                    }
                }
            }
            Line::Eof => {
                return Err(GryptError::Format(
                    "missing closing delimiter before end of input".into(),
                ))
            }
            Line::OverCap => {
                return Err(GryptError::Format(format!(
                    "no closing delimiter within {MAX_HEADER_BLOCK} bytes"
                )))
            }
        }
    }

    headers.check_required()?;
    Ok(headers)
}

/// Whether `data` starts with an envelope's opening delimiter line.
pub fn is_envelope(data: &[u8]) -> bool {
    data.strip_prefix(BEGIN_LINE.as_bytes())
        .is_some_and(|rest| rest.starts_with(b"\n") || rest.starts_with(b"\r\n"))
}

/// Whether `name` is usable as a header name.
pub fn is_valid_header_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_uppercase() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn parse_header_line(line: &str) -> Option<(&str, &str)> {
    let (name, value) = line.split_once(':')?;
    if !is_valid_header_name(name) {
        return None;
    }
    Some((name, value.trim()))
}

fn validate(headers: &Headers) -> Result<()> {
    headers.check_required()?;
    for (name, value) in headers.iter() {
        if !is_valid_header_name(name) {
            return Err(GryptError::Format(format!("invalid header name {name:?}")));
        }
        if value.contains(['\n', '\r']) {
            return Err(GryptError::Format(format!(
                "header {name} has a multi-line value"
            )));
        }
    }
    if header_block(headers).len() > MAX_HEADER_BLOCK {
        return Err(GryptError::Format(format!(
            "header block exceeds {MAX_HEADER_BLOCK} bytes"
        )));
    }
    Ok(())
}

fn header_block(headers: &Headers) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(BEGIN_LINE.as_bytes());
    out.push(b'\n');
    for (name, value) in headers.iter() {
        out.extend_from_slice(name.as_bytes());
        out.extend_from_slice(b": ");
        out.extend_from_slice(value.as_bytes());
        out.push(b'\n');
    }
    out.extend_from_slice(END_LINE.as_bytes());
    out.push(b'\n');
    out
}

enum Line {
    /// A full line with its terminator stripped
    Complete(Vec<u8>),
    Eof,
    OverCap,
}

fn next_line<R: BufRead + ?Sized>(reader: &mut R, budget: &mut usize) -> Result<Line> {
    let mut line = Vec::new();
    let n = Read::take(&mut *reader, *budget as u64).read_until(b'\n', &mut line)?;
    *budget -= n;

    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        return Ok(Line::Complete(line));
    }
    if *budget == 0 {
        Ok(Line::OverCap)
    } else {
        Ok(Line::Eof)
    }
}
