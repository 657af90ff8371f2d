use std::str::FromStr;

use cipher21::source::{EnvKeySource, FdKeySource, HexFileKeySource, KeySource};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Mode {
    Encrypt,
    Verify,
    Decrypt,
}

const DEFAULT_AFTER: &str = "2021-01-01T00Z";

#[derive(Debug, Default, Eq, PartialEq)]
pub struct Args {
    pub mode: Option<Mode>,
    pub key_location: Option<String>,
    pub after: String,
    pub debug: bool,
    pub help: bool,
    pub version: bool,
}

impl Args {
    pub fn build_from_args<I>(mut cli_args: I) -> Result<Self, String>
    where
        I: Iterator<Item: AsRef<str> + ToString>,
    {
        let mut args = Self {
            after: DEFAULT_AFTER.to_string(),
            ..Self::default()
        };

        while let Some(arg) = cli_args.next() {
            match arg.as_ref() {
                "-h" | "--help" => args.help = true,
                "-V" | "--version" => args.version = true,
                "--debug" => args.debug = true,
                "-e" | "--encrypt" => set_mode(&mut args, Mode::Encrypt)?,
                "-v" | "--verify" => set_mode(&mut args, Mode::Verify)?,
                "-d" | "--decrypt" => set_mode(&mut args, Mode::Decrypt)?,
                "-k" | "--key" => {
                    let value = cli_args
                        .next()
                        .ok_or_else(|| "'--key' expects a LOCATION argument".to_string())?;
                    args.key_location = Some(value.to_string());
                }
                "-a" | "--after" => {
                    let value = cli_args
                        .next()
                        .ok_or_else(|| "'--after' expects a DATE_TIME argument".to_string())?;
                    args.after = value.to_string();
                }
                unknown => return Err(format!("Unknown argument: '{unknown}'.")),
            }
        }

        if args.mode.is_some() && args.key_location.is_none() {
            return Err("Encryption, verification and decryption require a --key.".into());
        }

        Ok(args)
    }
}

fn set_mode(args: &mut Args, mode: Mode) -> Result<(), String> {
    if args.mode.is_some() {
        return Err("'--encrypt', '--verify' and '--decrypt' are mutually exclusive.".into());
    }
    args.mode = Some(mode);
    Ok(())
}

/// Parse a `LOCATION` of the form `scheme:value` into the
/// corresponding [`KeySource`].
///
/// # Errors
///
/// Returns a user-facing message if `location` has no `scheme:`
/// prefix, or the scheme is not one of `env`, `file`, `fd`.
pub fn parse_key_location(location: &str) -> Result<Box<dyn KeySource>, String> {
    let (scheme, value) = location
        .split_once(':')
        .ok_or_else(|| "No --key LOCATION scheme. Use env: or file: or fd: prefix.".to_string())?;

    match scheme {
        "env" => Ok(Box::new(EnvKeySource(value.to_string()))),
        "file" => Ok(Box::new(HexFileKeySource(value.into()))),
        "fd" => {
            let fd = i32::from_str(value)
                .map_err(|_| format!("Invalid file descriptor number `{value}`."))?;
            Ok(Box::new(FdKeySource(fd)))
        }
        other => Err(format!("Unsupported secret source scheme `{other}:`.")),
    }
}

/// Parse an ISO 8601-1:2019 combined date/time value ending in `Z`
/// (e.g. `2021-01-01T00Z`, `2024-03-05T14:30:00.5Z`) into nanoseconds
/// since the Unix epoch.
///
/// # Errors
///
/// Returns a user-facing message if `text` does not conform to the
/// expected shape, or denotes a calendar date/time that does not
/// exist.
pub fn parse_after(text: &str) -> Result<u64, String> {
    let body = text
        .strip_suffix('Z')
        .ok_or_else(|| "Malformed --after date and time value.".to_string())?;

    let (date, time) = body.split_once('T').unwrap_or((body, ""));

    let mut date_parts = date.split('-');
    let year: i64 = parse_component(date_parts.next(), "year")?;
    let month: u32 = parse_component(date_parts.next(), "month")?;
    let day: u32 = parse_component(date_parts.next(), "day")?;
    if date_parts.next().is_some() {
        return Err("Invalid --after date value.".into());
    }

    let (time, fraction) = time
        .split_once('.')
        .map_or((time, None), |(t, f)| (t, Some(f)));
    let mut time_parts = time.split(':');
    let hour: u32 = if time.is_empty() {
        0
    } else {
        parse_component(time_parts.next(), "hour")?
    };
    let minute: u32 = match time_parts.next() {
        Some(m) => parse_component(Some(m), "minute")?,
        None => 0,
    };
    let second: u32 = match time_parts.next() {
        Some(s) => parse_component(Some(s), "second")?,
        None => 0,
    };
    if time_parts.next().is_some() {
        return Err("Malformed --after date and time value.".into());
    }

    if !(2000..=2099).contains(&year)
        || !(1..=12).contains(&month)
        || !(1..=31).contains(&day)
        || hour > 23
        || minute > 59
        || second > 59
    {
        return Err("Invalid --after date value.".into());
    }

    let days = days_from_civil(year, month, day);
    let mut nanos = days
        .checked_mul(86_400)
        .and_then(|s| s.checked_add(i64::from(hour) * 3600))
        .and_then(|s| s.checked_add(i64::from(minute) * 60))
        .and_then(|s| s.checked_add(i64::from(second)))
        .and_then(|s| s.checked_mul(1_000_000_000))
        .ok_or_else(|| "Invalid --after date value.".to_string())?;

    if let Some(fraction) = fraction {
        if fraction.is_empty()
            || fraction.len() > 9
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return Err("Malformed --after date and time value.".into());
        }
        let padded = format!("{fraction:0<9}");
        let frac_ns: i64 = padded
            .parse()
            .map_err(|_| "Malformed --after date and time value.".to_string())?;
        nanos += frac_ns;
    }

    u64::try_from(nanos).map_err(|_| "Invalid --after date value.".to_string())
}

fn parse_component<T: FromStr>(part: Option<&str>, name: &str) -> Result<T, String> {
    part.filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| format!("Malformed --after {name}."))
}

/// Days between the Unix epoch and a civil (proleptic Gregorian)
/// date. Howard Hinnant's well-known `days_from_civil` algorithm.
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = i64::from((m + 9) % 12);
    let doy = (153 * mp + 2) / 5 + i64::from(d) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// The inverse of [`days_from_civil`].
fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = if mp < 10 { mp + 3 } else { mp - 9 } as u32;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Render a nanosecond epoch timestamp as an ISO 8601 instant, for
/// logging a stream's encryption timestamp.
#[must_use]
pub fn format_timestamp_ns(ns: u64) -> String {
    let secs = (ns / 1_000_000_000) as i64;
    let subsec = ns % 1_000_000_000;
    let days = secs.div_euclid(86_400);
    let time_of_day = secs.rem_euclid(86_400);
    let (year, month, day) = civil_from_days(days);
    let hour = time_of_day / 3600;
    let minute = (time_of_day % 3600) / 60;
    let second = time_of_day % 60;
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}.{subsec:09}Z")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_encrypt_regular() {
        let args = Args::build_from_args(["-e", "-k", "env:FOO"].into_iter()).unwrap();
        assert_eq!(args.mode, Some(Mode::Encrypt));
    }

    #[test]
    fn mode_verify_long_form() {
        let args = Args::build_from_args(["--verify", "--key", "env:FOO"].into_iter()).unwrap();
        assert_eq!(args.mode, Some(Mode::Verify));
    }

    #[test]
    fn mode_decrypt_regular() {
        let args = Args::build_from_args(["-d", "-k", "env:FOO"].into_iter()).unwrap();
        assert_eq!(args.mode, Some(Mode::Decrypt));
    }

    #[test]
    fn a_second_mode_flag_is_rejected() {
        let err = Args::build_from_args(["-e", "-d", "-k", "env:FOO"].into_iter()).unwrap_err();
        assert!(err.contains("mutually exclusive"));
    }

    #[test]
    fn mode_without_key_is_an_error() {
        let err = Args::build_from_args(["-e"].into_iter()).unwrap_err();
        assert!(err.contains("--key"));
    }

    #[test]
    fn help_without_mode_does_not_require_key() {
        let args = Args::build_from_args(["-h"].into_iter()).unwrap();
        assert!(args.help);
    }

    #[test]
    fn after_defaults_when_unset() {
        let args = Args::build_from_args(["-h"].into_iter()).unwrap();
        assert_eq!(args.after, DEFAULT_AFTER);
    }

    #[test]
    fn after_is_captured() {
        let args =
            Args::build_from_args(["-e", "-k", "env:FOO", "-a", "2024-03-05T14:30Z"].into_iter())
                .unwrap();
        assert_eq!(args.after, "2024-03-05T14:30Z");
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let err = Args::build_from_args(["--bogus"].into_iter()).unwrap_err();
        assert!(err.contains("--bogus"));
    }

    #[test]
    fn key_location_parses_env_scheme() {
        assert!(parse_key_location("env:SOME_VAR").is_ok());
    }

    #[test]
    fn key_location_parses_file_scheme() {
        assert!(parse_key_location("file:/tmp/key.hex").is_ok());
    }

    #[test]
    fn key_location_parses_fd_scheme() {
        assert!(parse_key_location("fd:3").is_ok());
    }

    #[test]
    fn key_location_rejects_missing_scheme() {
        assert!(parse_key_location("/tmp/key.hex").is_err());
    }

    #[test]
    fn key_location_rejects_unknown_scheme() {
        assert!(parse_key_location("http:example.com").is_err());
    }

    #[test]
    fn parse_after_accepts_date_only() {
        assert_eq!(
            parse_after("2021-01-01T00Z").unwrap(),
            1_609_459_200_000_000_000
        );
    }

    #[test]
    fn parse_after_accepts_full_precision() {
        let ns = parse_after("2021-01-01T00:00:00.5Z").unwrap();
        assert_eq!(ns, 1_609_459_200_500_000_000);
    }

    #[test]
    fn parse_after_rejects_missing_z() {
        assert!(parse_after("2021-01-01T00").is_err());
    }

    #[test]
    fn parse_after_rejects_garbage() {
        assert!(parse_after("not-a-date").is_err());
    }

    #[test]
    fn parse_after_rejects_invalid_month() {
        assert!(parse_after("2021-13-01T00Z").is_err());
    }

    #[test]
    fn format_timestamp_round_trips_through_parse_after() {
        let ns = parse_after("2024-03-05T14:30:07.123456789Z").unwrap();
        assert_eq!(format_timestamp_ns(ns), "2024-03-05T14:30:07.123456789Z");
    }

    #[test]
    fn format_timestamp_handles_the_epoch() {
        assert_eq!(format_timestamp_ns(0), "1970-01-01T00:00:00.000000000Z");
    }
}
