//! Secret-source loader hooks.
//!
//! The core only defines the interface: consume a location reference,
//! yield an already-validated [`Key`]. Parsing a `scheme:value`
//! command-line argument into one of these concrete sources is the
//! CLI layer's job; the core never parses argument strings itself.

use std::fs::File;
use std::io::Read;
use std::os::fd::{FromRawFd, RawFd};
use std::path::PathBuf;

use crate::error::Result;
use crate::key::Key;

/// Yields a scrubbed, validated [`Key`] from wherever it is parked.
pub trait KeySource {
    /// # Errors
    ///
    /// Returns whatever [`Key::from_bytes`] / [`Key::from_hex_bytes`]
    /// return, plus [`crate::error::Error::Io`] if the source cannot
    /// be read.
    fn load(&self) -> Result<Key>;
}

/// `env:NAME` — the named environment variable holds a hex-encoded key.
pub struct EnvKeySource(pub String);

impl KeySource for EnvKeySource {
    fn load(&self) -> Result<Key> {
        let hex = std::env::var(&self.0).map_err(|_| {
            crate::error::Error::Argument(format!(
                "no value under {} environment variable",
                self.0
            ))
        })?;
        Key::from_hex_bytes(hex.as_bytes())
    }
}

/// `file:PATH` — the file holds a hex-encoded key, same tolerant
/// alphabet as [`crate::scrub::unhex`].
pub struct HexFileKeySource(pub PathBuf);

impl KeySource for HexFileKeySource {
    fn load(&self) -> Result<Key> {
        Key::from_hex_file(&self.0)
    }
}

/// `fd:NUMBER` — an already-open file descriptor holds a hex-encoded
/// key. Unix-only: a raw fd is not a portable concept.
pub struct FdKeySource(pub RawFd);

impl KeySource for FdKeySource {
    fn load(&self) -> Result<Key> {
        // SAFETY: the fd was handed to us by the caller (typically
        // inherited from the parent process) and we take exclusive
        // ownership of it for the single read below.
        let mut file = unsafe { File::from_raw_fd(self.0) };
        let mut buffer = crate::scrub::Scratch::zeroed(4 * crate::key::KEY_LENGTH);
        let n = file.read(&mut buffer)?;
        Key::from_hex_bytes(&buffer[..n])
    }
}
