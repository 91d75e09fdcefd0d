use pysim_analyzer::canonicalize;
use pysim_analyzer::core::read_submission_file;
use std::io::Write;
use tempfile::NamedTempFile;

fn temp_file(bytes: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_utf8_bom_submission_parses() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("def f(x):\n    return x + 1\n".as_bytes());
    let file = temp_file(&bytes);

    let content = read_submission_file(file.path()).unwrap();
    assert!(content.starts_with("def"));
    assert!(!content.starts_with('\u{FEFF}'));
    assert_eq!(
        canonicalize(&content).unwrap(),
        canonicalize("def f(y):\n    return y + 1\n").unwrap()
    );
}

#[test]
fn test_utf16le_bom_submission() {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in "print('привет')\n".encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    let file = temp_file(&bytes);

    let content = read_submission_file(file.path()).unwrap();
    assert_eq!(content, "print('привет')\n");
}

#[test]
fn test_windows_1252_submission() {
    // "é" в Windows-1252
    let bytes = b"s = 'caf\xE9'\n";
    let file = temp_file(bytes);

    let content = read_submission_file(file.path()).unwrap();
    assert_eq!(content, "s = 'café'\n");
    assert!(canonicalize(&content).is_ok());
}

#[test]
fn test_plain_utf8_is_unchanged() {
    let file = temp_file("x = 'ünïcode'\n".as_bytes());
    assert_eq!(read_submission_file(file.path()).unwrap(), "x = 'ünïcode'\n");
}
