//! Image intake: turns a user-chosen file into a transfer-ready data URI

use crate::error::{DetectError, Result};
use base64::{engine::general_purpose, Engine as _};
use std::path::Path;
use tracing::debug;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

/// Prefix the service's annotated PNG is rendered with
pub const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

/// An image selected for detection, held only as a data URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedImage {
    data_uri: String,
    mime_len: usize,
}

impl SelectedImage {
    /// Encode raw image bytes as `data:<mime>;base64,<payload>`
    pub fn from_bytes(bytes: &[u8], mime: &str) -> Self {
        let payload = general_purpose::STANDARD.encode(bytes);
        let data_uri = format!("{}{}{}{}", DATA_PREFIX, mime, BASE64_MARKER, payload);
        Self {
            data_uri,
            mime_len: mime.len(),
        }
    }

    /// Accept an existing base64 data URI with an `image/*` media type
    pub fn parse(data_uri: &str) -> Result<Self> {
        let rest = data_uri
            .strip_prefix(DATA_PREFIX)
            .ok_or_else(|| DetectError::UnsupportedMediaType("not a data URI".to_string()))?;
        let marker = rest.find(BASE64_MARKER).ok_or_else(|| {
            DetectError::UnsupportedMediaType("data URI is not base64 encoded".to_string())
        })?;

        let mime = &rest[..marker];
        if !mime.starts_with("image/") {
            return Err(DetectError::UnsupportedMediaType(mime.to_string()));
        }

        let payload = &rest[marker + BASE64_MARKER.len()..];
        general_purpose::STANDARD.decode(payload).map_err(|e| {
            DetectError::UnsupportedMediaType(format!("invalid base64 payload: {}", e))
        })?;

        Ok(Self {
            data_uri: data_uri.to_string(),
            mime_len: mime.len(),
        })
    }

    pub fn as_data_uri(&self) -> &str {
        &self.data_uri
    }

    pub fn mime(&self) -> &str {
        &self.data_uri[DATA_PREFIX.len()..DATA_PREFIX.len() + self.mime_len]
    }

    /// The base64 text after the `;base64,` marker
    pub fn payload(&self) -> &str {
        &self.data_uri[DATA_PREFIX.len() + self.mime_len + BASE64_MARKER.len()..]
    }

    pub fn payload_len(&self) -> usize {
        self.payload().len()
    }

    /// Decode the payload back to the original file bytes
    pub fn decode(&self) -> Result<Vec<u8>> {
        general_purpose::STANDARD.decode(self.payload()).map_err(|e| {
            DetectError::UnsupportedMediaType(format!("invalid base64 payload: {}", e))
        })
    }
}

/// Identify an image's media type from its magic number, falling back to the extension
pub fn detect_mime(path: &Path, bytes: &[u8]) -> Option<&'static str> {
    sniff_mime(bytes).or_else(|| mime_from_extension(path))
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        return Some("image/png");
    }
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        return Some("image/jpeg");
    }
    if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
        return Some("image/gif");
    }
    if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        return Some("image/webp");
    }
    if is_bmp(bytes) {
        return Some("image/bmp");
    }
    if bytes.starts_with(&[b'I', b'I', 0x2A, 0x00]) || bytes.starts_with(&[b'M', b'M', 0x00, 0x2A]) {
        return Some("image/tiff");
    }
    if is_ico(bytes) {
        return Some("image/x-icon");
    }
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" && (&bytes[8..12] == b"avif" || &bytes[8..12] == b"avis") {
        return Some("image/avif");
    }
    None
}

/// `BM`, zeroed reserved words and a known DIB header size at offset 14
fn is_bmp(bytes: &[u8]) -> bool {
    if bytes.len() < 18 || !bytes.starts_with(b"BM") || bytes[6..10] != [0, 0, 0, 0] {
        return false;
    }
    let dib_size = u32::from_le_bytes([bytes[14], bytes[15], bytes[16], bytes[17]]);
    matches!(dib_size, 12 | 40 | 52 | 56 | 64 | 108 | 124)
}

/// ICONDIR with at least one complete directory entry
fn is_ico(bytes: &[u8]) -> bool {
    if bytes.len() < 22 || !bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return false;
    }
    let count = u16::from_le_bytes([bytes[4], bytes[5]]);
    // Reserved byte of the first entry
    count > 0 && bytes[6 + 3] == 0
}

fn mime_from_extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" | "jpe" | "jfif" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        "ico" => Some("image/x-icon"),
        "avif" => Some("image/avif"),
        "svg" => Some("image/svg+xml"),
        _ => None,
    }
}

/// Read a selected file into a [`SelectedImage`].
///
/// `None` means the picker closed without a file; that is not an error and
/// yields `Ok(None)`.
pub async fn read_image(path: Option<&Path>, max_bytes: u64) -> Result<Option<SelectedImage>> {
    let path = match path {
        Some(p) => p,
        None => return Ok(None),
    };

    let metadata = tokio::fs::metadata(path).await?;
    if metadata.len() > max_bytes {
        return Err(DetectError::ImageTooLarge {
            size: metadata.len(),
            limit: max_bytes,
        });
    }

    let bytes = tokio::fs::read(path).await?;
    if bytes.len() as u64 > max_bytes {
        return Err(DetectError::ImageTooLarge {
            size: bytes.len() as u64,
            limit: max_bytes,
        });
    }

    let mime = detect_mime(path, &bytes)
        .ok_or_else(|| DetectError::UnsupportedMediaType(path.display().to_string()))?;

    debug!("Read {} bytes of {} from {:?}", bytes.len(), mime, path);
    Ok(Some(SelectedImage::from_bytes(&bytes, mime)))
}

/// Re-add the PNG data URI prefix to the service's bare base64 output
pub fn annotated_data_uri(b64_png: &str) -> String {
    format!("{}{}", PNG_DATA_URI_PREFIX, b64_png)
}
