//! Pumps bytes between a [`Read`]/[`Write`] pair and the
//! [`Encrypter`]/[`Decrypter`] state machines.

use std::io::{self, Read, Write};
use std::thread;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::key::Key;
use crate::stream::decrypter::Decrypter;
use crate::stream::encrypter::Encrypter;
use crate::stream::{StreamAttributes, CHUNK_SIZE, HEADER_LENGTH};

/// Read until `buf` is full or the source is exhausted, retrying on
/// `WouldBlock` instead of treating it as an error. Returns the
/// number of bytes actually read, which is less than `buf.len()` only
/// at genuine EOF.
fn read_fill(reader: &mut dyn Read, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_secs_f64(1.0 / 32.0));
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(filled)
}

fn write_all_retrying(writer: &mut dyn Write, mut buf: &[u8]) -> Result<()> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) => {
                return Err(Error::Io("short write: sink accepted 0 bytes".into()));
            }
            Ok(n) => buf = &buf[n..],
            Err(err) if err.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_secs_f64(1.0 / 32.0));
            }
            Err(err) => return Err(err.into()),
        }
    }
    Ok(())
}

/// Encrypt everything `reader` yields into `writer`, returning the
/// finished stream's attributes.
///
/// # Errors
///
/// Propagates any I/O error from `reader`/`writer`.
pub fn encrypt_stream(
    key: &Key,
    reader: &mut dyn Read,
    writer: &mut dyn Write,
) -> Result<StreamAttributes> {
    let mut encrypter = Encrypter::new(key);
    let header = encrypter.initialize(None)?;
    write_all_retrying(writer, &header)?;

    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = read_fill(reader, &mut chunk)?;
        if n == 0 {
            break;
        }
        let ciphertext = encrypter.process_chunk(&chunk[..n]);
        write_all_retrying(writer, &ciphertext)?;
        if n < chunk.len() {
            break;
        }
    }

    let trailer = encrypter.finalize();
    write_all_retrying(writer, &trailer)?;

    Ok(encrypter.attributes())
}

/// Decrypt a stream from `reader` into `writer`, returning the
/// verified stream's attributes.
///
/// Implements the two-buffer look-ahead: the last chunk read is never
/// handed to [`Decrypter::process_chunk`] until it is known not to be
/// the true tail, so [`Decrypter::finalize`] always receives the
/// trailer contiguously and the MAC is always checked before the last
/// chunk's plaintext is released.
///
/// # Errors
///
/// [`Error::Format`] if the stream is too short to hold a header or a
/// footer. [`Error::Authentication`] if the tag does not verify.
/// Propagates any I/O error from `reader`/`writer`.
pub fn decrypt_stream(
    key: &Key,
    reader: &mut dyn Read,
    writer: &mut dyn Write,
) -> Result<StreamAttributes> {
    let mut decrypter = Decrypter::new(key);

    let mut header = vec![0u8; HEADER_LENGTH];
    let n = read_fill(reader, &mut header)?;
    if n != HEADER_LENGTH {
        return Err(Error::Format("stream too short for header".into()));
    }
    decrypter.initialize(&header)?;

    let mut prev: Option<Vec<u8>> = None;
    loop {
        let mut chunk = vec![0u8; CHUNK_SIZE];
        let n = read_fill(reader, &mut chunk)?;
        chunk.truncate(n);

        if chunk.is_empty() {
            break;
        }

        if let Some(prev_chunk) = prev.take() {
            let plaintext = decrypter.process_chunk(&prev_chunk);
            write_all_retrying(writer, &plaintext)?;
        }
        prev = Some(chunk);
    }

    let tail = prev.ok_or_else(|| Error::Format("stream shorter than one frame".into()))?;
    let plaintext = decrypter.finalize(&tail)?;
    write_all_retrying(writer, &plaintext)?;

    Ok(decrypter.attributes())
}
