//! Stream authenticated encryption for year 2021.
//!
//! [`key`] and [`source`] turn caller-supplied bytes into a validated
//! [`Key`]; [`stream`] turns a [`Key`] and a byte stream into an
//! authenticated Cipher21 stream and back.

pub mod error;
pub mod key;
pub mod scrub;
pub mod source;
pub mod stream;

pub use error::{Error, Result};
pub use key::Key;
pub use source::{EnvKeySource, FdKeySource, HexFileKeySource, KeySource};
pub use stream::{decrypt_stream, encrypt_stream, Decrypter, Encrypter, NullSink, StreamAttributes};
