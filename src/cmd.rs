//! Wires parsed command-line arguments to the streaming core.

pub mod cli;

use std::fmt;
use std::io;
use std::time::Instant;

use log::info;

use cipher21::error::Error;
use cipher21::source::KeySource;
use cipher21::stream::{self, NullSink, StreamAttributes};

use cli::{Args, Mode};

/// An error surfaced to `main`, carrying which exit code it maps to.
///
/// [`Self::Usage`] covers a malformed flag, an unparsable
/// `--key`/`--after` value, or a key that fails the entropy
/// assessment (the `--key` value is at fault either way) — and exits
/// 2. Everything else, including a stream that fails authentication
/// or one that predates the `--after` threshold, exits 1.
#[derive(Debug)]
pub enum CliError {
    Usage(String),
    /// The stream decrypted and authenticated, but its timestamp does
    /// not lie strictly after the `--after` threshold. `after_text` is
    /// the literal, unparsed `--after` argument, reused verbatim in
    /// the user-facing message; `source` is the core's own
    /// [`Error::TimestampRejected`], carrying the structured values.
    NotAfter {
        after_text: String,
        source: Error,
    },
    Core(Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage(message) => write!(f, "{message}"),
            Self::NotAfter { after_text, .. } => {
                write!(f, "Not encrypted --after {after_text}.")
            }
            Self::Core(error) => write!(f, "{error}"),
        }
    }
}

impl From<Error> for CliError {
    fn from(error: Error) -> Self {
        Self::Core(error)
    }
}

impl CliError {
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::NotAfter { .. } | Self::Core(_) => 1,
        }
    }
}

/// Run the mode `args` selected. `start` is the instant the process
/// began, used only to log processing time.
///
/// # Errors
///
/// See [`CliError`].
///
/// # Panics
///
/// Panics if `args.mode`/`args.key_location` are `None` — the caller
/// (`main`) checks both before calling this.
pub fn run(args: &Args, start: Instant) -> Result<(), CliError> {
    let mode = args.mode.expect("main checks mode is Some");
    let location = args
        .key_location
        .as_deref()
        .expect("main checks key_location is Some");

    let key = load_key(location)?;
    let after_ns = cli::parse_after(&args.after).map_err(CliError::Usage)?;

    let attrs = match mode {
        Mode::Encrypt => {
            let mut stdin = io::stdin().lock();
            let mut stdout = io::stdout().lock();
            stream::encrypt_stream(&key, &mut stdin, &mut stdout)?
        }
        Mode::Verify => {
            let mut stdin = io::stdin().lock();
            let mut sink = NullSink;
            let attrs = stream::decrypt_stream(&key, &mut stdin, &mut sink)?;
            check_after(&attrs, after_ns, &args.after)?;
            attrs
        }
        Mode::Decrypt => {
            let mut stdin = io::stdin().lock();
            let mut stdout = io::stdout().lock();
            let attrs = stream::decrypt_stream(&key, &mut stdin, &mut stdout)?;
            check_after(&attrs, after_ns, &args.after)?;
            attrs
        }
    };

    log_attributes(&attrs, start);
    Ok(())
}

fn load_key(location: &str) -> Result<cipher21::Key, CliError> {
    let source = cli::parse_key_location(location).map_err(CliError::Usage)?;
    source.load().map_err(|err| {
        CliError::Usage(format!(
            "Error occurred while reading key from {location}: {err}"
        ))
    })
}

fn check_after(attrs: &StreamAttributes, after_ns: u64, after_text: &str) -> Result<(), CliError> {
    if attrs.timestamp_ns <= after_ns {
        return Err(CliError::NotAfter {
            after_text: after_text.to_string(),
            source: Error::TimestampRejected {
                threshold_ns: after_ns,
                actual_ns: attrs.timestamp_ns,
            },
        });
    }
    Ok(())
}

fn log_attributes(attrs: &StreamAttributes, start: Instant) {
    info!("processing time: {:.3} s", start.elapsed().as_secs_f64());
    info!(
        "encryption timestamp: {}",
        cli::format_timestamp_ns(attrs.timestamp_ns)
    );
    info!("payload length: {} B", format_thousands(attrs.payload_length));
    info!("MAC: {}", hex_upper(&attrs.tag));
}

fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped.chars().rev().collect()
}

fn hex_upper(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_thousands_groups_digits() {
        assert_eq!(format_thousands(0), "0");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_000), "1,000");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn hex_upper_matches_poly1305_tag_width() {
        assert_eq!(hex_upper(&[0xde, 0xad, 0xbe, 0xef]), "DEADBEEF");
    }

    #[test]
    fn exit_codes_match_the_original_mapping() {
        assert_eq!(CliError::Usage("x".into()).exit_code(), 2);
        assert_eq!(
            CliError::NotAfter {
                after_text: "2021-01-01T00Z".into(),
                source: Error::TimestampRejected {
                    threshold_ns: 0,
                    actual_ns: 0,
                },
            }
            .exit_code(),
            1
        );
        assert_eq!(CliError::Core(Error::Authentication).exit_code(), 1);
        assert_eq!(CliError::Core(Error::KeyEntropy("x".into())).exit_code(), 1);
    }

    #[test]
    fn not_after_message_uses_the_literal_argument_text() {
        let err = CliError::NotAfter {
            after_text: "2099-06-01T00Z".into(),
            source: Error::TimestampRejected {
                threshold_ns: 1,
                actual_ns: 0,
            },
        };
        assert_eq!(err.to_string(), "Not encrypted --after 2099-06-01T00Z.");
    }
}
