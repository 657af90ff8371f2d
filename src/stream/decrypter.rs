use crate::error::{Error, Result};
use crate::key::Key;
use crate::scrub::Scratch;
use crate::stream::aead::AeadContext;
use crate::stream::{
    StreamAttributes, BLOCK_MULTIPLE, FOOTER_LENGTH, HEADER_LENGTH, MAC_LENGTH, NONCE_LENGTH,
    SIGNATURE,
};

#[derive(Debug, Eq, PartialEq)]
enum State {
    Fresh,
    HeaderParsed,
    Streaming,
    Final,
}

/// Drives one decryption from a fresh key to verified plaintext.
///
/// Intermediate chunks are released to the caller as soon as they are
/// decrypted — only the final, footer-bearing chunk is withheld
/// (in [`Self::finalize`]) until its tag has been checked, since that
/// chunk alone encodes the integrity-free padding-length octet.
pub struct Decrypter<'k> {
    key: &'k Key,
    state: State,
    aead: Option<AeadContext>,
    nonce: [u8; NONCE_LENGTH],
    timestamp_ns: u64,
    payload_length: u64,
    padding_length: u8,
    tag: [u8; MAC_LENGTH],
}

impl<'k> Decrypter<'k> {
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

    /// Parse the `HEADER_LENGTH`-byte header.
    ///
    /// # Errors
    ///
    /// [`Error::Format`] if `header` is the wrong length, or its
    /// signature is not recognized.
    ///
    /// # Panics
    ///
    /// Panics if already initialized.
    pub fn initialize(&mut self, header: &[u8]) -> Result<()> {
        assert!(self.state == State::Fresh, "decrypter already initialized");

        if header.len() != HEADER_LENGTH {
            return Err(Error::Format(format!(
                "header must be {HEADER_LENGTH} bytes long, got {}",
                header.len()
            )));
        }
        if &header[..SIGNATURE.len()] != SIGNATURE.as_slice() {
            return Err(Error::Format("unrecognized stream signature".into()));
        }

        let mut nonce = [0u8; NONCE_LENGTH];
        nonce.copy_from_slice(&header[SIGNATURE.len()..SIGNATURE.len() + NONCE_LENGTH]);

        let mut aead = AeadContext::new(self.key.expose(), &nonce);
        let mut timestamp_bytes = [0u8; 8];
        timestamp_bytes.copy_from_slice(&header[SIGNATURE.len() + NONCE_LENGTH..]);
        aead.decrypt_in_place(&mut timestamp_bytes);

        self.nonce = nonce;
        self.timestamp_ns = u64::from_le_bytes(timestamp_bytes);
        self.aead = Some(aead);
        self.state = State::HeaderParsed;

        Ok(())
    }

    /// Decrypt one non-final chunk, in any non-empty length.
    ///
    /// # Panics
    ///
    /// Panics if called before [`Self::initialize`] or after
    /// [`Self::finalize`].
    pub fn process_chunk(&mut self, ciphertext: &[u8]) -> Vec<u8> {
        if self.state == State::HeaderParsed {
            self.state = State::Streaming;
        }
        assert!(self.state == State::Streaming, "decrypter not streaming");
        if ciphertext.is_empty() {
            return Vec::new();
        }
        let mut buffer = ciphertext.to_vec();
        self.aead.as_mut().unwrap().decrypt_in_place(&mut buffer);
        self.payload_length += ciphertext.len() as u64;
        buffer
    }

    /// Verify the tag and, only once that succeeds, return the final
    /// plaintext slice (padding stripped).
    ///
    /// `trailing_ciphertext` must be the true tail of the stream: the
    /// last `FOOTER_LENGTH` bytes at minimum, and everything from
    /// there to the end.
    ///
    /// # Errors
    ///
    /// - [`Error::Format`] if `trailing_ciphertext` is shorter than
    ///   [`FOOTER_LENGTH`].
    /// - [`Error::Authentication`] if the tag does not match. No
    ///   decrypted byte — including the padding-length octet — is
    ///   exposed on this path.
    /// - [`Error::Padding`] if, after successful verification, the
    ///   decrypted padding-length octet is `>= BLOCK_MULTIPLE`.
    ///
    /// # Panics
    ///
    /// Panics if called before streaming has started, or more than
    /// once.
    pub fn finalize(&mut self, trailing_ciphertext: &[u8]) -> Result<Vec<u8>> {
        if self.state == State::HeaderParsed {
            self.state = State::Streaming;
        }
        assert!(self.state == State::Streaming, "decrypter not streaming");

        if trailing_ciphertext.len() < FOOTER_LENGTH {
            return Err(Error::Format(
                "final chunk too small to hold the trailer".into(),
            ));
        }

        let body_len = trailing_ciphertext.len() - MAC_LENGTH;
        let (body, candidate_tag) = trailing_ciphertext.split_at(body_len);

        let mut scratch = Scratch::zeroed(body_len);
        scratch.copy_from_slice(body);

        let aead = self.aead.take().unwrap();
        aead.verify_then_decrypt_in_place(&mut scratch, candidate_tag)?;

        // Only past this point has the tag been checked; `scratch`
        // only now holds genuine plaintext, including the
        // padding-length octet it would otherwise be unsafe to trust.
        let padding_length = scratch[scratch.len() - 1];
        if u64::from(padding_length) >= BLOCK_MULTIPLE {
            return Err(Error::Padding("padding length field too large".into()));
        }
        let tail_length = scratch
            .len()
            .checked_sub(1 + padding_length as usize)
            .ok_or_else(|| Error::Format("final chunk too small for declared padding".into()))?;

        self.payload_length += tail_length as u64;
        self.padding_length = padding_length;
        self.tag.copy_from_slice(candidate_tag);
        self.state = State::Final;

        Ok(scratch[..tail_length].to_vec())
    }

    /// Stream metadata. Only meaningful after [`Self::finalize`]
    /// succeeds.
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
