//! Exit codes and output of the `unglue` and `untnd` binaries.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn unglue(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_unglue"))
        .args(args)
        .current_dir(cwd)
        .output()
        .unwrap()
}

fn untnd(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_untnd"))
        .args(args)
        .current_dir(cwd)
        .output()
        .unwrap()
}

/// Helper: TND archive with one entry per (name, contents) pair
fn write_tnd(path: &Path, files: &[(&str, &[u8])]) {
    let mut table = Vec::new();
    let mut data = Vec::new();
    for (name, contents) in files {
        let mut field = [0u8; 8];
        field[..name.len()].copy_from_slice(name.as_bytes());
        table.extend_from_slice(&field);
        table.extend_from_slice(&(contents.len() as u32).to_be_bytes());
        table.extend_from_slice(&(data.len() as u32).to_be_bytes());
        data.extend_from_slice(contents);
    }

    let total = (8 + table.len() + data.len()) as u32;
    let mut image = total.to_be_bytes().to_vec();
    image.extend_from_slice(&(files.len() as u32).to_be_bytes());
    image.extend_from_slice(&table);
    image.extend_from_slice(&data);
    std::fs::write(path, image).unwrap();
}

#[test]
fn no_arguments_prints_usage_and_succeeds() {
    let dir = TempDir::new().unwrap();
    let out = unglue(&[], dir.path());

    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Dark Seed II Glue archive extractor"));
    assert!(stdout.contains("https://github.com/DrMcCoy/darkseed2-tools/"));
    assert!(stdout.contains("Usage:"));
}

#[test]
fn wrong_arguments_exit_with_one() {
    let dir = TempDir::new().unwrap();

    for args in [&["q", "A.GLU"][..], &["l"][..], &["l", "A.GLU", "B.GLU"][..]] {
        let out = unglue(args, dir.path());
        assert_eq!(out.status.code(), Some(1), "{args:?}");
        assert!(
            String::from_utf8_lossy(&out.stderr).contains("Usage: unglue"),
            "{args:?}"
        );
    }
}

#[test]
fn unreadable_file_exits_with_two() {
    let dir = TempDir::new().unwrap();
    let out = unglue(&["l", "MISSING.GLU"], dir.path());

    assert_eq!(out.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&out.stderr).contains("Error opening file \"MISSING.GLU\""));
}

#[test]
fn bad_tnd_header_exits_with_three() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("BAD.TND"), [0, 0, 0, 200, 0, 0, 0, 0]).unwrap();

    let out = untnd(&["x", "BAD.TND"], dir.path());
    assert_eq!(out.status.code(), Some(3));
}

#[test]
fn corrupt_packed_glue_exits_with_four() {
    let dir = TempDir::new().unwrap();
    // Count 0xFFFF cannot fit, so this is probed as packed, but it is far
    // shorter than one chunk.
    std::fs::write(dir.path().join("BAD.GLU"), [0xFF; 100]).unwrap();

    let out = unglue(&["l", "BAD.GLU"], dir.path());
    assert_eq!(out.status.code(), Some(4));
}

#[test]
fn lists_and_extracts_tnd_archive() {
    let dir = TempDir::new().unwrap();
    write_tnd(
        &dir.path().join("TEXT.TND"),
        &[("INTRO", &b"Welcome home."[..]), ("OUTRO", &b"The end"[..])],
    );

    let out = untnd(&["l", "TEXT.TND"], dir.path());
    assert_eq!(out.status.code(), Some(0));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Number of files: 2"));
    assert!(stdout.contains("   INTRO.TXT |         13"));
    assert!(stdout.contains("   OUTRO.TXT |          7"));

    let out = untnd(&["x", "TEXT.TND", "-d", "text"], dir.path());
    assert_eq!(out.status.code(), Some(0));
    assert_eq!(
        std::fs::read(dir.path().join("text").join("INTRO.TXT")).unwrap(),
        b"Welcome home."
    );
    assert_eq!(
        std::fs::read(dir.path().join("text").join("OUTRO.TXT")).unwrap(),
        b"The end"
    );
}
