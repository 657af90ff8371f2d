//! Incremental ChaCha20-Poly1305, RFC 8439, with no associated data.
//!
//! `chacha20poly1305`'s one-shot `Aead`/`AeadInPlace` traits need the
//! whole message up front, and its `stream` feature frames the stream
//! into independently-tagged chunks (`EncryptorBE32`/`DecryptorBE32`) —
//! neither gives a single tag accumulated across an arbitrary number
//! of calls. This module builds that directly from the `chacha20`
//! keystream and the `poly1305` universal hash, the same construction
//! `chacha20poly1305` itself uses internally:
//!
//! 1. Derive the one-time Poly1305 key from the first 64 bytes of the
//!    ChaCha20 keystream (block counter 0); only the first 32 are
//!    used, the rest is discarded keystream.
//! 2. From block counter 1 onward, the keystream encrypts/decrypts
//!    payload octets; Poly1305 authenticates those same octets as
//!    they go by, zero-padded to a 16-byte boundary.
//! 3. On finalize, Poly1305 additionally authenticates a 16-byte block
//!    holding the (always-zero, we have no AAD) associated-data length
//!    and the total ciphertext length, both as 64-bit little-endian
//!    integers.

use chacha20::cipher::{KeyIvInit, StreamCipher};
use chacha20::ChaCha20;
use poly1305::universal_hash::{KeyInit, UniversalHash};
use poly1305::Poly1305;
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};
use crate::key::KEY_LENGTH;
use crate::scrub;
use crate::stream::{MAC_LENGTH, NONCE_LENGTH};

pub(crate) struct AeadContext {
    keystream: ChaCha20,
    mac: Poly1305,
    ciphertext_len: u64,
}

impl AeadContext {
    pub(crate) fn new(key: &[u8; KEY_LENGTH], nonce: &[u8; NONCE_LENGTH]) -> Self {
        let mut keystream = ChaCha20::new(key.into(), nonce.into());

        let mut poly_key_block = [0u8; 64];
        keystream.apply_keystream(&mut poly_key_block);
        let mac = Poly1305::new(poly1305::Key::from_slice(&poly_key_block[..32]));
        scrub::scrub(&mut poly_key_block);

        Self {
            keystream,
            mac,
            ciphertext_len: 0,
        }
    }

    /// Encrypt `buf` in place, advancing the keystream and folding the
    /// resulting ciphertext into the running tag.
    pub(crate) fn encrypt_in_place(&mut self, buf: &mut [u8]) {
        self.keystream.apply_keystream(buf);
        self.mac.update_padded(buf);
        self.ciphertext_len += buf.len() as u64;
    }

    /// Decrypt `buf` in place. The MAC is fed the ciphertext bytes
    /// *before* they are overwritten with plaintext — order matters.
    pub(crate) fn decrypt_in_place(&mut self, buf: &mut [u8]) {
        self.mac.update_padded(buf);
        self.keystream.apply_keystream(buf);
        self.ciphertext_len += buf.len() as u64;
    }

    fn finalize_tag(mut self) -> [u8; MAC_LENGTH] {
        let mut length_block = poly1305::Block::default();
        length_block[8..16].copy_from_slice(&self.ciphertext_len.to_le_bytes());
        self.mac.update(&[length_block]);
        self.mac.finalize().into()
    }

    /// Consume the context, returning the final tag.
    pub(crate) fn finalize_encrypt(self) -> [u8; MAC_LENGTH] {
        self.finalize_tag()
    }

    /// Consume the context, verifying `candidate_tag` in constant
    /// time.
    ///
    /// # Errors
    ///
    /// [`Error::Authentication`] if the tags do not match.
    pub(crate) fn finalize_decrypt(self, candidate_tag: &[u8]) -> Result<()> {
        let tag = self.finalize_tag();
        if bool::from(tag.as_slice().ct_eq(candidate_tag)) {
            Ok(())
        } else {
            Err(Error::Authentication)
        }
    }

    /// Authenticate and verify `buf` (still ciphertext) against
    /// `candidate_tag`, decrypting `buf` in place only once
    /// verification succeeds. No byte of `buf` is touched by the
    /// keystream before the tag has been checked.
    ///
    /// # Errors
    ///
    /// [`Error::Authentication`] if the tags do not match. `buf` is
    /// left as ciphertext in that case.
    pub(crate) fn verify_then_decrypt_in_place(self, buf: &mut [u8], candidate_tag: &[u8]) -> Result<()> {
        let Self {
            mut keystream,
            mut mac,
            ciphertext_len,
        } = self;

        mac.update_padded(buf);
        let total_len = ciphertext_len + buf.len() as u64;
        let mut length_block = poly1305::Block::default();
        length_block[8..16].copy_from_slice(&total_len.to_le_bytes());
        mac.update(&[length_block]);
        let tag: [u8; MAC_LENGTH] = mac.finalize().into();

        if !bool::from(tag.as_slice().ct_eq(candidate_tag)) {
            return Err(Error::Authentication);
        }

        keystream.apply_keystream(buf);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; KEY_LENGTH] = [0x11; KEY_LENGTH];
    const NONCE: [u8; NONCE_LENGTH] = [0x22; NONCE_LENGTH];

    #[test]
    fn roundtrip_single_call() {
        let mut plaintext = b"the quick brown fox".to_vec();
        let original = plaintext.clone();

        let mut enc = AeadContext::new(&KEY, &NONCE);
        enc.encrypt_in_place(&mut plaintext);
        let tag = enc.finalize_encrypt();

        let mut dec = AeadContext::new(&KEY, &NONCE);
        dec.decrypt_in_place(&mut plaintext);
        dec.finalize_decrypt(&tag).unwrap();

        assert_eq!(plaintext, original);
    }

    #[test]
    fn tag_is_independent_of_chunk_boundaries() {
        let message = b"0123456789abcdef0123456789abcdef".to_vec();

        let mut whole = message.clone();
        let mut enc_whole = AeadContext::new(&KEY, &NONCE);
        enc_whole.encrypt_in_place(&mut whole);
        let tag_whole = enc_whole.finalize_encrypt();

        let (first, second) = message.split_at(7);
        let mut first = first.to_vec();
        let mut second = second.to_vec();
        let mut enc_split = AeadContext::new(&KEY, &NONCE);
        enc_split.encrypt_in_place(&mut first);
        enc_split.encrypt_in_place(&mut second);
        let tag_split = enc_split.finalize_encrypt();

        assert_eq!(tag_whole, tag_split);
        assert_eq!([first, second].concat(), whole);
    }

    #[test]
    fn tamper_is_detected() {
        let mut plaintext = b"authenticate me".to_vec();
        let mut enc = AeadContext::new(&KEY, &NONCE);
        enc.encrypt_in_place(&mut plaintext);
        let tag = enc.finalize_encrypt();

        plaintext[0] ^= 0x01;

        let mut dec = AeadContext::new(&KEY, &NONCE);
        dec.decrypt_in_place(&mut plaintext);
        assert_eq!(dec.finalize_decrypt(&tag), Err(Error::Authentication));
    }

    #[test]
    fn wrong_key_is_detected() {
        let mut plaintext = b"authenticate me".to_vec();
        let mut enc = AeadContext::new(&KEY, &NONCE);
        enc.encrypt_in_place(&mut plaintext);
        let tag = enc.finalize_encrypt();

        let wrong_key = [0x33; KEY_LENGTH];
        let mut dec = AeadContext::new(&wrong_key, &NONCE);
        dec.decrypt_in_place(&mut plaintext);
        assert_eq!(dec.finalize_decrypt(&tag), Err(Error::Authentication));
    }

    #[test]
    fn empty_message_has_a_valid_tag() {
        let mut empty: Vec<u8> = Vec::new();
        let enc = AeadContext::new(&KEY, &NONCE);
        let tag = enc.finalize_encrypt();

        let dec = AeadContext::new(&KEY, &NONCE);
        dec.finalize_decrypt(&tag).unwrap();
        assert!(empty.is_empty());
        empty.clear();
    }
}
