//! Format sniffing and end-to-end parse tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha512};

use super::*;

const SHA256: &str = "5891b5b522d5df086d0ff0b110fbd9d21bb4fc7163af34d08286a2e846f6be03";

fn ctx() -> ParseContext<'static> {
    ParseContext::new("myapp.AppImage")
}

#[test]
fn detect_json_manifest() {
    assert_eq!(
        detect_format("\n  {\"a\": \"b\"}"),
        Some(ChecksumFormat::Manifest)
    );
}

#[test]
fn detect_yaml_manifest() {
    assert_eq!(
        detect_format("version: 1.0.0\nsha512: abc\n"),
        Some(ChecksumFormat::Manifest)
    );
    assert_eq!(
        detect_format("# generated\n---\nfiles: []\n"),
        Some(ChecksumFormat::Manifest)
    );
}

#[test]
fn detect_sums_file() {
    let text = format!("{SHA256}  myapp.AppImage\n");
    assert_eq!(detect_format(&text), Some(ChecksumFormat::SumsFile));
    let bsd = format!("SHA256 (myapp.AppImage) = {SHA256}\n");
    assert_eq!(detect_format(&bsd), Some(ChecksumFormat::SumsFile));
}

#[test]
fn detect_bare_hash() {
    assert_eq!(detect_format(SHA256), Some(ChecksumFormat::BareHash));
    assert_eq!(
        detect_format(&format!("sha256:{SHA256}\n")),
        Some(ChecksumFormat::BareHash)
    );
    assert_eq!(
        detect_format(&format!("{SHA256}\nmyapp.AppImage\n")),
        Some(ChecksumFormat::BareHash)
    );
}

#[test]
fn detect_nothing_plausible() {
    assert_eq!(detect_format("hello"), None);
    assert_eq!(detect_format("# only a comment\n"), None);
}

#[test]
fn sums_file_single_entry() {
    let text = format!("{SHA256}  myapp.AppImage\n");
    let entries = parse_checksum(text.as_bytes(), &ctx()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].matched_filename, "myapp.AppImage");
    assert_eq!(entries[0].hash, normalize::normalize(SHA256, None).unwrap());
}

#[test]
fn manifest_base64_sha512_for_named_file() {
    let digest = Sha512::digest(b"release binary");
    let yml = format!(
        "files:\n  - url: myapp.AppImage\n    sha512: {}\n",
        STANDARD.encode(digest)
    );
    let entries = parse_checksum(yml.as_bytes(), &ctx()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].algorithm, HashAlgorithm::Sha512);
    assert_eq!(entries[0].hash, hex::encode(digest));
}

#[test]
fn every_entry_is_canonical() {
    let text = format!(
        "{}  a.AppImage\n{} *b.AppImage\n",
        SHA256.to_uppercase(),
        STANDARD.encode(Sha512::digest(b"b"))
    );
    for e in parse_checksum(text.as_bytes(), &ctx()).unwrap() {
        assert!(normalize::is_canonical_hex(&e.hash), "{}", e.hash);
        assert_eq!(e.hash.len(), e.algorithm.hex_len());
    }
}

#[test]
fn empty_and_binary_payloads() {
    assert_eq!(parse_checksum(b"  \n", &ctx()), Err(ParseError::Empty));
    assert_eq!(
        parse_checksum(&[0xff, 0xfe, 0x00], &ctx()),
        Err(ParseError::NotUtf8)
    );
    assert_eq!(
        parse_checksum(b"hello", &ctx()),
        Err(ParseError::UnrecognizedFormat)
    );
}

#[test]
fn hint_flows_into_entries() {
    let ctx = ParseContext::new("x").with_hint(Some(HashAlgorithm::Sha256));
    let entries = parse_checksum(SHA256.as_bytes(), &ctx).unwrap();
    assert_eq!(entries[0].algorithm, HashAlgorithm::Sha256);
    assert_eq!(entries[0].matched_filename, "x");
}

#[test]
fn byte_order_mark_does_not_swallow_first_line() {
    let other = "c".repeat(64);
    let text = format!("\u{feff}{SHA256}  Tool.AppImage\n{other}  other.AppImage\n");
    let entries = parse_checksum(text.as_bytes(), &ctx()).unwrap();
    let names: Vec<&str> = entries.iter().map(|e| e.matched_filename.as_str()).collect();
    assert_eq!(names, vec!["Tool.AppImage", "other.AppImage"]);
    assert_eq!(entries[0].hash, SHA256);

    let bare = format!("\u{feff}{SHA256}\n");
    let entries = parse_checksum(bare.as_bytes(), &ctx()).unwrap();
    assert_eq!(entries[0].hash, SHA256);
    assert_eq!(entries[0].matched_filename, "myapp.AppImage");

    let entries = parse_as(ChecksumFormat::BareHash, &bare, &ctx()).unwrap();
    assert_eq!(entries[0].hash, SHA256);
}
