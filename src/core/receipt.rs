//! Receipt images as self-describing data URIs.
//!
//! An expense embeds its receipt as `data:<media-type>;base64,<payload>`; there is no
//! separate file storage. The AI adapters only want the payload, so the prefix is stripped
//! before transmission and put back on whatever comes back.

use crate::errors::{Error, Result};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// Largest upload accepted as a receipt.
pub const MAX_RECEIPT_BYTES: usize = 20 * 1024 * 1024;

/// Raster formats the AI adapters accept.
pub const SUPPORTED_MEDIA_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

/// Media type assumed for a stored value that carries no data-URI prefix.
const FALLBACK_MEDIA_TYPE: &str = "image/jpeg";

/// A receipt image encoded as a data URI.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptImage(String);

impl ReceiptImage {
    /// Encodes raw image bytes.
    ///
    /// The type sniffed from the leading bytes wins; `media_type`, the type the upload
    /// declared, is only used when the bytes are not recognised. Anything outside
    /// [`SUPPORTED_MEDIA_TYPES`] is rejected.
    pub fn from_bytes(media_type: Option<&str>, bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidImage {
                reason: "file is empty".to_string(),
            });
        }
        if bytes.len() > MAX_RECEIPT_BYTES {
            return Err(Error::InvalidImage {
                reason: format!(
                    "file is {} bytes, the limit is {MAX_RECEIPT_BYTES}",
                    bytes.len()
                ),
            });
        }

        let media_type = match sniff_media_type(bytes) {
            Some(sniffed) => sniffed,
            None => media_type
                .map(normalize_media_type)
                .filter(|mt| mt.starts_with("image/"))
                .unwrap_or_default(),
        };
        if !SUPPORTED_MEDIA_TYPES.contains(&media_type.as_str()) {
            return Err(Error::InvalidImage {
                reason: if media_type.is_empty() {
                    "not a recognised image format".to_string()
                } else {
                    format!(
                        "{media_type} is not supported, use {}",
                        SUPPORTED_MEDIA_TYPES.join(", ")
                    )
                },
            });
        }

        Ok(Self::from_base64(&media_type, &STANDARD.encode(bytes)))
    }

    /// Wraps an already base64-encoded payload.
    #[must_use]
    pub fn from_base64(media_type: &str, payload: &str) -> Self {
        Self(format!("data:{media_type};base64,{payload}"))
    }

    /// The full data URI.
    #[must_use]
    pub fn as_data_uri(&self) -> &str {
        &self.0
    }

    /// Media type named by the prefix.
    #[must_use]
    pub fn media_type(&self) -> &str {
        self.split().0
    }

    /// Base64 payload with the scheme/media-type prefix stripped.
    #[must_use]
    pub fn payload(&self) -> &str {
        self.split().1
    }

    /// Decoded image bytes.
    pub fn decode(&self) -> Result<Vec<u8>> {
        STANDARD
            .decode(self.payload())
            .map_err(|e| Error::InvalidImage {
                reason: format!("payload is not valid base64: {e}"),
            })
    }

    /// File extension matching the media type, for attachments.
    #[must_use]
    pub fn file_extension(&self) -> &'static str {
        match self.media_type() {
            "image/png" => "png",
            "image/webp" => "webp",
            "image/heic" => "heic",
            "image/heif" => "heif",
            _ => "jpg",
        }
    }

    fn split(&self) -> (&str, &str) {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split_once(";base64,"))
            .map_or((FALLBACK_MEDIA_TYPE, self.0.as_str()), |(media_type, payload)| {
                (media_type, payload)
            })
    }
}

/// Guesses the media type from the leading magic bytes.
///
/// Recognises a few unsupported formats too, so a mislabelled upload cannot slip through
/// on its declared type.
#[must_use]
pub fn sniff_media_type(bytes: &[u8]) -> Option<String> {
    let media_type = match bytes {
        [0xFF, 0xD8, 0xFF, ..] => "image/jpeg",
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => "image/png",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        [_, _, _, _, b'f', b't', b'y', b'p', b'h', b'e', b'i', b'c' | b'x', ..] => "image/heic",
        [_, _, _, _, b'f', b't', b'y', b'p', b'm', b'i', b'f', b'1', ..] => "image/heif",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'B', b'M', ..] => "image/bmp",
        _ => return None,
    };
    Some(media_type.to_string())
}

fn normalize_media_type(declared: &str) -> String {
    let media_type = declared
        .split(';')
        .next()
        .unwrap_or(declared)
        .trim()
        .to_ascii_lowercase();
    if media_type == "image/jpg" {
        "image/jpeg".to_string()
    } else {
        media_type
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    const PNG_HEADER: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn test_from_bytes_with_declared_type() {
        let image = ReceiptImage::from_bytes(Some("image/webp"), b"abc").unwrap();
        assert_eq!(image.as_data_uri(), "data:image/webp;base64,YWJj");
        assert_eq!(image.media_type(), "image/webp");
        assert_eq!(image.payload(), "YWJj");
        assert_eq!(image.decode().unwrap(), b"abc");
    }

    #[test]
    fn test_from_bytes_sniffs_when_type_missing_or_generic() {
        let image = ReceiptImage::from_bytes(None, &PNG_HEADER).unwrap();
        assert_eq!(image.media_type(), "image/png");
        assert_eq!(image.file_extension(), "png");

        let image =
            ReceiptImage::from_bytes(Some("application/octet-stream"), &[0xFF, 0xD8, 0xFF, 0xE0])
                .unwrap();
        assert_eq!(image.media_type(), "image/jpeg");
    }

    #[test]
    fn test_from_bytes_rejects_non_images() {
        assert!(matches!(
            ReceiptImage::from_bytes(Some("text/plain"), b"hello"),
            Err(Error::InvalidImage { .. })
        ));
        assert!(ReceiptImage::from_bytes(Some("image/png"), b"").is_err());
    }

    #[test]
    fn test_from_bytes_rejects_unsupported_formats() {
        let svg = ReceiptImage::from_bytes(Some("image/svg+xml"), b"<svg xmlns=\"x\"/>");
        assert!(matches!(svg, Err(Error::InvalidImage { .. })));

        assert!(ReceiptImage::from_bytes(Some("image/bmp"), b"abc").is_err());
        assert!(ReceiptImage::from_bytes(Some("image/png"), b"GIF89a....").is_err());
        assert!(ReceiptImage::from_bytes(None, b"BM\x36\x00").is_err());
    }

    #[test]
    fn test_sniffed_type_overrides_declared_type() {
        let image = ReceiptImage::from_bytes(Some("image/png"), &[0xFF, 0xD8, 0xFF, 0xE0]).unwrap();
        assert_eq!(image.media_type(), "image/jpeg");

        let heic = b"\x00\x00\x00\x18ftypheic\x00\x00";
        let image = ReceiptImage::from_bytes(None, heic).unwrap();
        assert_eq!(image.media_type(), "image/heic");
        assert_eq!(image.file_extension(), "heic");

        let image = ReceiptImage::from_bytes(Some("image/JPG"), b"abc").unwrap();
        assert_eq!(image.media_type(), "image/jpeg");
    }

    #[test]
    fn test_from_bytes_rejects_oversized_uploads() {
        let bytes = vec![0u8; MAX_RECEIPT_BYTES + 1];
        assert!(ReceiptImage::from_bytes(Some("image/jpeg"), &bytes).is_err());
    }

    #[test]
    fn test_unprefixed_value_passes_through() {
        let image: ReceiptImage = serde_json::from_str("\"QUJD\"").unwrap();
        assert_eq!(image.payload(), "QUJD");
        assert_eq!(image.media_type(), "image/jpeg");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let image = ReceiptImage::from_base64("image/png", "QUJD");
        assert_eq!(
            serde_json::to_string(&image).unwrap(),
            "\"data:image/png;base64,QUJD\""
        );
    }
}
