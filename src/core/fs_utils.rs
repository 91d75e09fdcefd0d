//! File system utility helpers (BOM-aware readers, etc.)
use std::path::Path;

/// Reads a submission with encoding detection and BOM handling.
///
/// UTF-16 files are recognised by their BOM. Anything else is tried as
/// UTF-8 first and falls back to Windows-1252, which is what older
/// editors on student machines tend to produce.
pub fn read_submission_file(path: &Path) -> std::io::Result<String> {
    let bytes = std::fs::read(path)?;
    Ok(decode_submission(&bytes))
}

/// Decodes raw submission bytes into UTF-8 text without a BOM
pub fn decode_submission(bytes: &[u8]) -> String {
    let content = match bytes {
        [0xFF, 0xFE, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16LE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16LE file");
            }
            decoded.into_owned()
        }
        [0xFE, 0xFF, ..] => {
            let (decoded, _, had_errors) = encoding_rs::UTF_16BE.decode(bytes);
            if had_errors {
                tracing::warn!("Errors detected while decoding UTF-16BE file");
            }
            decoded.into_owned()
        }
        _ => match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                tracing::debug!("UTF-8 decoding failed, trying Windows-1252");
                let (decoded, _, had_errors) = encoding_rs::WINDOWS_1252.decode(bytes);
                if had_errors {
                    tracing::warn!("Errors detected while decoding Windows-1252 file");
                }
                decoded.into_owned()
            }
        },
    };

    strip_bom(&content).to_string()
}

fn strip_bom(input: &str) -> &str {
    input.strip_prefix('\u{FEFF}').unwrap_or(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_utf8_bom_is_stripped() {
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(b"x = 1\n");
        assert_eq!(decode_submission(&bytes), "x = 1\n");
    }

    #[test]
    fn test_utf16le_with_bom() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "pass".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        assert_eq!(decode_submission(&bytes), "pass");
    }

    #[test]
    fn test_windows_1252_fallback() {
        // "õ" в Windows-1252
        let bytes = [b'#', b' ', 0xF5, b'\n'];
        assert_eq!(decode_submission(&bytes), "# õ\n");
    }
}
