//! Stream framing.
//!
//! # Wire format
//!
//! ```text
//! [ signature (4) ][ nonce (12) ][ encrypted timestamp (8) ]
//! [ encrypted payload (payload_length) ]
//! [ encrypted padding (padding_length) ][ encrypted padding length (1) ]
//! [ tag (16) ]
//! ```
//!
//! The total length is always a positive multiple of [`BLOCK_MULTIPLE`].
//! `padding_length` is chosen so that it is:
//!
//! ```text
//! (2 * BLOCK_MULTIPLE - STREAM_METADATA_LENGTH - payload_length % BLOCK_MULTIPLE) % BLOCK_MULTIPLE
//! ```
//!
//! There is exactly one Poly1305 tag per stream, accumulated
//! incrementally over the header's encrypted timestamp, the encrypted
//! payload and the encrypted padding — never one tag per chunk. See
//! [`aead::AeadContext`].

mod aead;
mod decrypter;
mod driver;
mod encrypter;
mod null_sink;

pub use decrypter::Decrypter;
pub use driver::{decrypt_stream, encrypt_stream};
pub use encrypter::Encrypter;
pub use null_sink::NullSink;

/// 4 ASCII bytes identifying the format.
pub const SIGNATURE: &[u8; 4] = b"CI21";
pub const NONCE_LENGTH: usize = 12;
pub const TIMESTAMP_LENGTH: usize = 8;
pub const PADDING_FIELD_LENGTH: usize = 1;
pub const MAC_LENGTH: usize = 16;

/// Signature + nonce + encrypted timestamp.
pub const HEADER_LENGTH: usize = SIGNATURE.len() + NONCE_LENGTH + TIMESTAMP_LENGTH;

/// Fixed per-stream overhead: header + padding-length field + tag.
pub const STREAM_METADATA_LENGTH: usize = HEADER_LENGTH + PADDING_FIELD_LENGTH + MAC_LENGTH;

/// The total stream length is always a multiple of this.
pub const BLOCK_MULTIPLE: u64 = 64;

/// Trailing segment (padding-length octet + tag) the streaming driver
/// must always keep buffered and contiguous before calling
/// [`Decrypter::finalize`].
pub const FOOTER_LENGTH: usize = PADDING_FIELD_LENGTH + MAC_LENGTH;

/// Default chunk size the driver reads/writes at a time. Large enough
/// to be efficient, a multiple of [`BLOCK_MULTIPLE`], and always
/// bigger than [`FOOTER_LENGTH`] so the two-buffer look-ahead in
/// [`driver`] never has to special-case a tiny final read.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Observable stream metadata, populated once `Finalize` succeeds.
#[derive(Clone, Debug)]
pub struct StreamAttributes {
    pub nonce: [u8; NONCE_LENGTH],
    pub timestamp_ns: u64,
    pub payload_length: u64,
    pub padding_length: u8,
    pub tag: [u8; MAC_LENGTH],
}
