#![allow(dead_code)]

use std::io::Write as _;
use std::process::{Command, Stdio};

const CIPHER21: &str = env!("CARGO_BIN_EXE_cipher21");

/// Hex encoding of a key that passes the entropy assessment, shared
/// by every test that needs one. Matches the fixture used by the
/// crate's own unit tests.
pub const GOOD_KEY_HEX: &str = "4e9102d83f77c10a56ee29b3641df2883a9c056fe14b9712c85d31a67e08bf43";
pub const GOOD_KEY_ENV: &str = "env:CIPHER21_TEST_KEY";

#[derive(Debug)]
pub struct Output {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Run the `cipher21` binary with `args`, feeding `stdin` to it and
/// capturing everything it writes to stdout/stderr.
pub fn run(args: &[&str], stdin: &[u8]) -> Output {
    let mut child = Command::new(CIPHER21)
        .args(args)
        .env("CIPHER21_TEST_KEY", GOOD_KEY_HEX)
        .env_remove("PAGER")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();

    child.stdin.take().unwrap().write_all(stdin).unwrap();
    let output = child.wait_with_output().unwrap();

    Output {
        exit_code: output.status.code().unwrap(),
        stdout: output.stdout,
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    }
}

pub fn encrypt(plaintext: &[u8]) -> Output {
    run(&["-e", "-k", GOOD_KEY_ENV], plaintext)
}

pub fn decrypt(stream: &[u8]) -> Output {
    run(&["-d", "-k", GOOD_KEY_ENV], stream)
}

/// Hex-encoded BLAKE3 digest, used to compare large payloads without
/// carrying the whole buffer around in assertion failure output.
pub fn checksum(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}
