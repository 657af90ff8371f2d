//! Secret-hygiene primitives shared by the key, the AEAD context and
//! the streaming driver.
//!
//! Every buffer that has held secret material goes through [`scrub`]
//! before it is freed: all `0xFF`, then all `0x00`, then OS-CSPRNG
//! bytes. Three passes rather than one guard against compilers or
//! allocators that might otherwise special-case an all-zero write.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};

/// Overwrite `buf` three times: `0xFF`, `0x00`, then random bytes.
pub fn scrub(buf: &mut [u8]) {
    buf.fill(0xFF);
    buf.fill(0x00);
    OsRng.fill_bytes(buf);
}

/// A heap buffer that is [`scrub`]bed when dropped, on every exit
/// path (normal return, early return, panic unwinding).
pub(crate) struct Scratch(pub Vec<u8>);

impl Scratch {
    pub(crate) fn zeroed(len: usize) -> Self {
        Self(vec![0u8; len])
    }
}

impl std::ops::Deref for Scratch {
    type Target = Vec<u8>;
    fn deref(&self) -> &Vec<u8> {
        &self.0
    }
}

impl std::ops::DerefMut for Scratch {
    fn deref_mut(&mut self) -> &mut Vec<u8> {
        &mut self.0
    }
}

impl Drop for Scratch {
    fn drop(&mut self) {
        scrub(&mut self.0);
    }
}

/// Count how many distinct byte values occur in `data`.
pub fn count_unique_bytes(data: &[u8]) -> usize {
    let mut seen = [0u8; 256];
    for &byte in data {
        seen[byte as usize] = 1;
    }
    let count = seen.iter().map(|&v| v as usize).sum();
    scrub(&mut seen);
    count
}

/// Byte-wise circular difference: `out[i] = data[i] - data[i-1] (mod 256)`,
/// with a virtual `data[-1] = 0`.
pub fn differentiate(data: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; data.len()];
    let mut prev = 0u8;
    for (i, &byte) in data.iter().enumerate() {
        out[i] = byte.wrapping_sub(prev);
        prev = byte;
    }
    out
}

/// Octets tolerated as separators between hex digits: horizontal tab,
/// line feed, vertical tab, form feed, carriage return, space, `.`
/// and `:`.
const IGNORED_SEPARATORS: &[u8] = b"\t\n\x0b\x0c\r .:";

/// Decode a hex string tolerating [`IGNORED_SEPARATORS`] between
/// digits. Rejects any other non-hex-digit octet, and an odd count of
/// hex digits. All scratch buffers are scrubbed on every exit path;
/// the returned buffer is a fresh, independently-owned copy.
pub fn unhex(hex: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = Scratch::zeroed(hex.len() / 2 + 1);
    let mut len = 0usize;
    let mut awaiting_low_nibble = false;

    for &byte in hex {
        let nibble = match byte {
            b'0'..=b'9' => byte - b'0',
            b'A'..=b'F' => byte - b'A' + 10,
            b'a'..=b'f' => byte - b'a' + 10,
            separator if IGNORED_SEPARATORS.contains(&separator) => continue,
            other => {
                return Err(Error::Format(format!(
                    "invalid hexadecimal symbol: {other:#04x}"
                )));
            }
        };
        if awaiting_low_nibble {
            buffer[len] += nibble;
            len += 1;
        } else {
            buffer[len] = nibble << 4;
        }
        awaiting_low_nibble = !awaiting_low_nibble;
    }

    if awaiting_low_nibble {
        return Err(Error::Format("odd number of hexadecimal digits".into()));
    }

    Ok(buffer[..len].to_vec())
}
