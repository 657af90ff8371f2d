use std::fmt;

/// Error conditions a Cipher21 core operation can fail with.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Error {
    /// A caller-supplied argument (e.g. a nonce of the wrong length)
    /// is malformed.
    Argument(String),
    /// A candidate key failed the entropy assessment.
    KeyEntropy(String),
    /// The stream does not conform to the wire format (bad signature,
    /// truncated header, truncated trailer, oversized padding field).
    Format(String),
    /// The Poly1305 tag did not match. Opaque on purpose: a wrong key
    /// and a tampered stream are indistinguishable to the caller.
    Authentication,
    /// The decrypted padding-length octet was `>= 64`.
    Padding(String),
    /// Decryption succeeded but the stream's timestamp does not lie
    /// strictly after the caller's `--after` threshold.
    TimestampRejected { threshold_ns: u64, actual_ns: u64 },
    /// The underlying reader/writer failed.
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Argument(reason)
            | Self::KeyEntropy(reason)
            | Self::Format(reason)
            | Self::Padding(reason)
            | Self::Io(reason) => write!(f, "{reason}"),
            Self::Authentication => write!(f, "MAC check failed"),
            Self::TimestampRejected {
                threshold_ns,
                actual_ns,
            } => write!(
                f,
                "stream timestamp {actual_ns}ns is not after threshold {threshold_ns}ns"
            ),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
