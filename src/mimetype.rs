// src/mimetype.rs

//! Mimetype detection
//!
//! Two independent strategies, recorded side by side in PREMIS so a reader
//! can see which method produced which value:
//! - [`guess_from_name`]: extension lookup through `mime_guess`
//! - [`sniff`]: magic-number match against the first bytes of the content

use crate::error::Result;
use crate::item::{Item, OpenMode};

/// How many leading bytes [`sniff`] looks at
const SNIFF_LEN: usize = 512;

/// Returned when the content is empty
pub const EMPTY_MIMETYPE: &str = "application/x-empty";

/// Returned when no signature matches and the content is not text
pub const FALLBACK_MIMETYPE: &str = "application/octet-stream";

/// A magic-number signature; `None` bytes are wildcards
struct Signature {
    offset: usize,
    bytes: &'static [Option<u8>],
    mimetype: &'static str,
}

macro_rules! sig {
    (@byte _) => { None };
    (@byte $b:expr) => { Some($b) };
    ($offset:expr, [$($b:tt),*], $mime:expr) => {
        Signature {
            offset: $offset,
            bytes: &[$(sig!(@byte $b)),*],
            mimetype: $mime,
        }
    };
}

/// Ordered most specific first
static SIGNATURES: &[Signature] = &[
    sig!(0, [0x25, 0x50, 0x44, 0x46, 0x2D], "application/pdf"),
    sig!(0, [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A], "image/png"),
    sig!(0, [0xFF, 0xD8, 0xFF], "image/jpeg"),
    sig!(0, [0x47, 0x49, 0x46, 0x38, _, 0x61], "image/gif"),
    sig!(0, [0x49, 0x49, 0x2A, 0x00], "image/tiff"),
    sig!(0, [0x4D, 0x4D, 0x00, 0x2A], "image/tiff"),
    sig!(0, [0x42, 0x4D], "image/bmp"),
    sig!(0, [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50], "image/webp"),
    sig!(0, [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x41, 0x56, 0x45], "audio/x-wav"),
    sig!(0, [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x41, 0x56, 0x49, 0x20], "video/x-msvideo"),
    sig!(0, [0x49, 0x44, 0x33], "audio/mpeg"),
    sig!(0, [0x66, 0x4C, 0x61, 0x43], "audio/flac"),
    sig!(0, [0x4F, 0x67, 0x67, 0x53], "audio/ogg"),
    sig!(4, [0x66, 0x74, 0x79, 0x70, 0x71, 0x74], "video/quicktime"),
    sig!(4, [0x66, 0x74, 0x79, 0x70], "video/mp4"),
    sig!(0, [0x1A, 0x45, 0xDF, 0xA3], "video/webm"),
    sig!(0, [0x50, 0x4B, 0x03, 0x04], "application/zip"),
    sig!(0, [0x1F, 0x8B], "application/gzip"),
    sig!(0, [0x42, 0x5A, 0x68], "application/x-bzip2"),
    sig!(0, [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00], "application/x-xz"),
    sig!(0, [0x28, 0xB5, 0x2F, 0xFD], "application/zstd"),
    sig!(0, [0x37, 0x7A, 0xBC, 0xAF, 0x27, 0x1C], "application/x-7z-compressed"),
    sig!(257, [0x75, 0x73, 0x74, 0x61, 0x72], "application/x-tar"),
    sig!(0, [0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1], "application/x-ole-storage"),
    sig!(0, [0x7B, 0x5C, 0x72, 0x74, 0x66], "application/rtf"),
    sig!(0, [0x25, 0x21, 0x50, 0x53], "application/postscript"),
    sig!(0, [0x7F, 0x45, 0x4C, 0x46], "application/x-executable"),
    sig!(0, [0x4D, 0x5A], "application/x-dosexec"),
    sig!(0, [0x3C, 0x3F, 0x78, 0x6D, 0x6C], "text/xml"),
];

/// Guess a mimetype from the extension of `name`
pub fn guess_from_name(name: &str) -> Option<String> {
    mime_guess::from_path(name).first_raw().map(str::to_string)
}

/// Detect a mimetype from leading content bytes
pub fn sniff_bytes(head: &[u8]) -> String {
    if head.is_empty() {
        return EMPTY_MIMETYPE.to_string();
    }

    let matched = SIGNATURES.iter().find(|signature| {
        head.len() >= signature.offset + signature.bytes.len()
            && signature
                .bytes
                .iter()
                .zip(&head[signature.offset..])
                .all(|(expected, actual)| expected.is_none_or(|b| b == *actual))
    });
    if let Some(signature) = matched {
        return signature.mimetype.to_string();
    }

    if looks_like_text(head) {
        "text/plain".to_string()
    } else {
        FALLBACK_MIMETYPE.to_string()
    }
}

/// Detect a mimetype from the start of an item's content
pub fn sniff(item: &dyn Item) -> Result<String> {
    let mut handle = item.open(OpenMode::Read)?;
    let head = handle.read(SNIFF_LEN)?;
    Ok(sniff_bytes(&head))
}

fn looks_like_text(head: &[u8]) -> bool {
    if head.contains(&0) {
        return false;
    }
    match std::str::from_utf8(head) {
        Ok(_) => true,
        // The sniff window may cut a multi-byte character in half
        Err(e) => e.error_len().is_none() && e.valid_up_to() + 4 > head.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guess_from_name() {
        assert_eq!(guess_from_name("foo.pdf").as_deref(), Some("application/pdf"));
        assert_eq!(guess_from_name("dir/photo.JPG").as_deref(), Some("image/jpeg"));
        assert_eq!(guess_from_name("noextension"), None);
    }

    #[test]
    fn test_sniff_signatures() {
        assert_eq!(sniff_bytes(b"%PDF-1.7\n..."), "application/pdf");
        assert_eq!(
            sniff_bytes(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00]),
            "image/png"
        );
        assert_eq!(sniff_bytes(b"GIF89a...."), "image/gif");
        assert_eq!(sniff_bytes(b"PK\x03\x04rest"), "application/zip");
        assert_eq!(sniff_bytes(b"\x00\x00\x00\x18ftypmp42"), "video/mp4");
    }

    #[test]
    fn test_sniff_text_and_fallbacks() {
        assert_eq!(sniff_bytes(b""), EMPTY_MIMETYPE);
        assert_eq!(sniff_bytes(b"plain old text\n"), "text/plain");
        assert_eq!(sniff_bytes("caf\u{e9}".as_bytes()), "text/plain");
        assert_eq!(sniff_bytes(&[0x00, 0x01, 0x02, 0x03]), FALLBACK_MIMETYPE);
    }
}
