//! The Cipher21 symmetric key.
//!
//! [`Key`] has no public raw constructor. It can only be built through
//! the `from_*` factories below, each of which runs an entropy
//! assessment before accepting the bytes. Module privacy stands in for
//! a guarded constructor.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use secrecy::{ExposeSecret, SecretBox};
use zeroize::Zeroize;

use crate::error::{Error, Result};
use crate::scrub::{self, count_unique_bytes, differentiate};

pub const KEY_LENGTH: usize = 32;

/// `floor(2 * KEY_LENGTH / 3)`, the minimum number of distinct byte
/// values a key (and its [`differentiate`]d form) must contain.
const MIN_UNIQUE_BYTES: usize = 2 * KEY_LENGTH / 3;

/// Newtype so we can give the key's backing array our own
/// [`Zeroize`] impl, routed through [`scrub::scrub`] for the same
/// three-pass overwrite used everywhere else, rather than `zeroize`'s
/// default zero-only blanket behaviour.
#[derive(Clone)]
struct KeyBytes([u8; KEY_LENGTH]);

impl Zeroize for KeyBytes {
    fn zeroize(&mut self) {
        scrub::scrub(&mut self.0);
    }
}

/// A validated 32-byte key. Scrubbed on drop.
pub struct Key(SecretBox<KeyBytes>);

impl Key {
    /// Validate a 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`Error::KeyEntropy`] if `bytes` is not exactly
    /// [`KEY_LENGTH`] long, or fails either uniqueness heuristic.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != KEY_LENGTH {
            return Err(Error::KeyEntropy(format!(
                "key must be {KEY_LENGTH} bytes long, got {}",
                bytes.len()
            )));
        }
        let mut data = [0u8; KEY_LENGTH];
        data.copy_from_slice(bytes);
        Self::from_array(data)
    }

    /// Validate a hex-encoded key, tolerating the separators
    /// [`scrub::unhex`] understands.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Format`] if the hex is malformed, or
    /// [`Error::KeyEntropy`] if the decoded bytes fail assessment.
    pub fn from_hex_bytes(hex: &[u8]) -> Result<Self> {
        let mut decoded = scrub::unhex(hex)?;
        let result = Self::from_bytes(&decoded);
        scrub::scrub(&mut decoded);
        result
    }

    /// Validate a key read from a binary file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on read failure, [`Error::KeyEntropy`]
    /// otherwise per [`Self::from_bytes`].
    pub fn from_binary_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut buffer = read_file(path.as_ref())?;
        let result = Self::from_bytes(&buffer);
        scrub::scrub(&mut buffer);
        result
    }

    /// Validate a key read from a file holding hex text.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] on read failure, [`Error::Format`] on
    /// malformed hex, [`Error::KeyEntropy`] otherwise.
    pub fn from_hex_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut hex = read_file(path.as_ref())?;
        let result = Self::from_hex_bytes(&hex);
        scrub::scrub(&mut hex);
        result
    }

    fn from_array(mut data: [u8; KEY_LENGTH]) -> Result<Self> {
        if let Err(err) = assess(&data) {
            scrub::scrub(&mut data);
            return Err(err);
        }
        Ok(Self(SecretBox::new(Box::new(KeyBytes(data)))))
    }

    /// Borrow the raw 32 key bytes. Crate-internal: callers outside
    /// this crate only ever see a validated, opaque `Key`.
    pub(crate) fn expose(&self) -> &[u8; KEY_LENGTH] {
        &self.0.expose_secret().0
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    let mut file = File::open(path)?;
    // One byte more than any valid key/hex-key so a too-long file is
    // still rejected by the length/entropy checks rather than
    // silently truncated.
    let mut buffer = vec![0u8; 4 * KEY_LENGTH];
    let n = file.read(&mut buffer)?;
    buffer.truncate(n);
    Ok(buffer)
}

fn assess(data: &[u8; KEY_LENGTH]) -> Result<()> {
    if count_unique_bytes(data) < MIN_UNIQUE_BYTES {
        return Err(Error::KeyEntropy(
            "key does not contain enough unique bytes".into(),
        ));
    }
    let mut derivative = differentiate(data);
    let unique = count_unique_bytes(&derivative);
    scrub::scrub(&mut derivative);
    if unique < MIN_UNIQUE_BYTES {
        return Err(Error::KeyEntropy(
            "key does not contain enough unique differences between consecutive bytes".into(),
        ));
    }
    Ok(())
}
