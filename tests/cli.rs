mod utils;

use utils::{checksum, decrypt, encrypt, run, GOOD_KEY_ENV};

#[test]
fn empty_input_produces_a_64_byte_stream() {
    let out = encrypt(b"");
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.stdout.len(), 64);
}

#[test]
fn one_octet_payload_produces_a_64_byte_stream() {
    let out = encrypt(b"x");
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.stdout.len(), 64);
}

#[test]
fn twenty_three_octet_payload_produces_a_64_byte_stream() {
    let out = encrypt(&[0u8; 23]);
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.stdout.len(), 64);
}

#[test]
fn twenty_four_octet_payload_spans_two_blocks() {
    let out = encrypt(&[0u8; 24]);
    assert_eq!(out.exit_code, 0);
    assert_eq!(out.stdout.len(), 128);
}

#[test]
fn roundtrip_recovers_the_original_payload() {
    let plaintext = b"the quick brown fox jumps over the lazy dog";
    let encrypted = encrypt(plaintext);
    assert_eq!(encrypted.exit_code, 0);

    let decrypted = decrypt(&encrypted.stdout);
    assert_eq!(decrypted.exit_code, 0);
    assert_eq!(decrypted.stdout, plaintext);
}

#[test]
fn a_single_flipped_bit_fails_decryption() {
    let encrypted = encrypt(b"authenticate me, please");
    let mut tampered = encrypted.stdout;
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;

    let out = decrypt(&tampered);
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("MAC check failed"));
}

#[test]
fn verification_mode_writes_nothing_to_stdout() {
    let encrypted = encrypt(b"some payload");
    let out = run(&["-v", "-k", GOOD_KEY_ENV], &encrypted.stdout);
    assert_eq!(out.exit_code, 0);
    assert!(out.stdout.is_empty());
}

#[test]
fn a_stream_older_than_the_after_threshold_is_rejected() {
    let encrypted = encrypt(b"payload");
    let out = run(
        &["-d", "-k", GOOD_KEY_ENV, "-a", "2099-01-01T00Z"],
        &encrypted.stdout,
    );
    assert_eq!(out.exit_code, 1);
    assert!(out.stderr.contains("Not encrypted --after"));
}

#[test]
fn a_mode_without_a_key_argument_is_a_usage_error() {
    let out = run(&["-e"], b"");
    assert_eq!(out.exit_code, 2);
}

#[test]
fn an_unsupported_key_scheme_is_a_usage_error() {
    let out = run(&["-e", "-k", "http:example.com"], b"");
    assert_eq!(out.exit_code, 2);
}

#[test]
fn a_truncated_stream_is_rejected() {
    let out = decrypt(&[0u8; 10]);
    assert_eq!(out.exit_code, 1);
}

#[test]
fn help_exits_successfully_without_a_key() {
    let out = run(&["-h"], b"");
    assert_eq!(out.exit_code, 0);
}

#[test]
fn version_exits_successfully() {
    let out = run(&["-V"], b"");
    assert_eq!(out.exit_code, 0);
    assert!(!out.stdout.is_empty());
}

#[test]
fn a_payload_spanning_multiple_chunks_roundtrips() {
    let plaintext = vec![0x5au8; 256 * 1024 + 17];
    let encrypted = encrypt(&plaintext);
    assert_eq!(encrypted.exit_code, 0);

    let decrypted = decrypt(&encrypted.stdout);
    assert_eq!(decrypted.exit_code, 0);
    assert_eq!(checksum(&decrypted.stdout), checksum(&plaintext));
}

#[test]
fn padding_boundary_payload_lengths_roundtrip() {
    for &len in &[63usize, 64, 65, 87, 88, (1 << 16) - 41, 1 << 16, (1 << 16) + 1] {
        let plaintext = vec![0xa5u8; len];
        let encrypted = encrypt(&plaintext);
        assert_eq!(encrypted.exit_code, 0, "payload length {len}");
        assert_eq!(encrypted.stdout.len() % 64, 0, "payload length {len}");

        let decrypted = decrypt(&encrypted.stdout);
        assert_eq!(decrypted.exit_code, 0, "payload length {len}");
        assert_eq!(
            checksum(&decrypted.stdout),
            checksum(&plaintext),
            "payload length {len}"
        );
    }
}
