use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::{Error, Result};
use crate::key::Key;
use crate::stream::aead::AeadContext;
use crate::stream::{
    StreamAttributes, BLOCK_MULTIPLE, HEADER_LENGTH, MAC_LENGTH, NONCE_LENGTH, SIGNATURE,
    STREAM_METADATA_LENGTH,
};

#[derive(Debug, Eq, PartialEq)]
enum State {
    Fresh,
    Streaming,
    Final,
}

/// Drives one encryption from a fresh key to a finalized, tagged
/// stream.
pub struct Encrypter<'k> {
    key: &'k Key,
    state: State,
    aead: Option<AeadContext>,
    nonce: [u8; NONCE_LENGTH],
    timestamp_ns: u64,
    payload_length: u64,
    padding_length: u8,
    tag: [u8; MAC_LENGTH],
}

impl<'k> Encrypter<'k> {
    #[must_use]
    pub fn new(key: &'k Key) -> Self {
        Self {
            key,
            state: State::Fresh,
            aead: None,
            nonce: [0; NONCE_LENGTH],
            timestamp_ns: 0,
            payload_length: 0,
            padding_length: 0,
            tag: [0; MAC_LENGTH],
        }
    }

    /// Start the stream, returning the `HEADER_LENGTH`-byte header.
    ///
    /// `nonce`, if given, must be exactly [`NONCE_LENGTH`] bytes; a
    /// fresh one is drawn from an OS CSPRNG otherwise.
    ///
    /// # Errors
    ///
    /// [`Error::Format`] if a supplied nonce has the wrong length.
    ///
    /// # Panics
    ///
    /// Panics if already initialized — the streaming driver is the
    /// only caller and never does this.
    pub fn initialize(&mut self, nonce: Option<&[u8]>) -> Result<Vec<u8>> {
        assert!(self.state == State::Fresh, "encrypter already initialized");

        let mut nonce_buf = [0u8; NONCE_LENGTH];
        match nonce {
            Some(given) if given.len() == NONCE_LENGTH => nonce_buf.copy_from_slice(given),
            Some(given) => {
                return Err(Error::Format(format!(
                    "nonce must be {NONCE_LENGTH} bytes long, got {}",
                    given.len()
                )));
            }
            None => OsRng.fill_bytes(&mut nonce_buf),
        }

        let mut aead = AeadContext::new(self.key.expose(), &nonce_buf);

        let timestamp_ns = now_ns();
        let mut timestamp_bytes = timestamp_ns.to_le_bytes();
        aead.encrypt_in_place(&mut timestamp_bytes);

        let mut header = Vec::with_capacity(HEADER_LENGTH);
        header.extend_from_slice(SIGNATURE);
        header.extend_from_slice(&nonce_buf);
        header.extend_from_slice(&timestamp_bytes);

        self.nonce = nonce_buf;
        self.timestamp_ns = timestamp_ns;
        self.aead = Some(aead);
        self.state = State::Streaming;

        Ok(header)
    }

    /// Encrypt one chunk, in any non-empty length.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Self::initialize`] or after
    /// [`Self::finalize`].
    pub fn process_chunk(&mut self, chunk: &[u8]) -> Vec<u8> {
        assert!(self.state == State::Streaming, "encrypter not streaming");
        if chunk.is_empty() {
            return Vec::new();
        }
        let mut buffer = chunk.to_vec();
        self.aead.as_mut().unwrap().encrypt_in_place(&mut buffer);
        self.payload_length += chunk.len() as u64;
        buffer
    }

    /// Emit the padding trailer and the final tag. Stream attributes
    /// become observable via [`Self::attributes`] after this returns.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Self::initialize`] or more than once.
    pub fn finalize(&mut self) -> Vec<u8> {
        assert!(self.state == State::Streaming, "encrypter not streaming");

        let padding_length = ((2 * BLOCK_MULTIPLE
            - STREAM_METADATA_LENGTH as u64
            - self.payload_length % BLOCK_MULTIPLE)
            % BLOCK_MULTIPLE) as u8;

        let mut trailer = vec![0u8; padding_length as usize + 1];
        OsRng.fill_bytes(&mut trailer[..padding_length as usize]);
        trailer[padding_length as usize] = padding_length;

        let mut aead = self.aead.take().unwrap();
        aead.encrypt_in_place(&mut trailer);
        let tag = aead.finalize_encrypt();

        self.padding_length = padding_length;
        self.tag = tag;
        self.state = State::Final;

        trailer.extend_from_slice(&tag);
        trailer
    }

    /// Stream metadata. Only meaningful after [`Self::finalize`].
    #[must_use]
    pub fn attributes(&self) -> StreamAttributes {
        StreamAttributes {
            nonce: self.nonce,
            timestamp_ns: self.timestamp_ns,
            payload_length: self.payload_length,
            padding_length: self.padding_length,
            tag: self.tag,
        }
    }
}

fn now_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the Unix epoch")
        .as_nanos() as u64
}
