//! Codec Module
//!
//! Converts fetched resource bytes into the cache's storage representation,
//! a base64 `data:` URL that consumers can use directly as an image source.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::error::EncodingError;

const DATA_PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64";
const GENERIC_MEDIA_TYPE: &str = "application/octet-stream";

// How far into a text body to look for an <svg> root.
const SVG_SNIFF_WINDOW: usize = 1024;

// == Encode ==
/// Encodes raw bytes as `data:<media-type>;base64,<payload>`.
///
/// The declared content type wins when it is a well-formed, specific media
/// type. Otherwise the type is sniffed from the leading bytes, and a generic
/// `application/octet-stream` declaration is used only as a last resort.
pub fn encode(bytes: &[u8], declared_content_type: Option<&str>) -> Result<String, EncodingError> {
    if bytes.is_empty() {
        return Err(EncodingError::Empty);
    }

    let declared = declared_content_type.and_then(media_type_essence);
    let media_type = declared
        .as_deref()
        .filter(|declared| *declared != GENERIC_MEDIA_TYPE)
        .or_else(|| sniff_media_type(bytes))
        .map(str::to_string)
        .or(declared)
        .ok_or(EncodingError::UnknownMediaType)?;

    Ok(format!(
        "{DATA_PREFIX}{media_type}{BASE64_MARKER},{}",
        STANDARD.encode(bytes)
    ))
}

// == Decode ==
/// Splits a stored data URL back into its media type and raw bytes.
pub fn decode(value: &str) -> Result<(String, Vec<u8>), EncodingError> {
    let rest = value
        .strip_prefix(DATA_PREFIX)
        .ok_or_else(|| EncodingError::Malformed("missing data: prefix".to_string()))?;

    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| EncodingError::Malformed("missing payload separator".to_string()))?;

    let media_type = header
        .strip_suffix(BASE64_MARKER)
        .ok_or_else(|| EncodingError::Malformed("payload is not base64".to_string()))?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| EncodingError::Malformed(e.to_string()))?;

    Ok((media_type.to_string(), bytes))
}

/// Reduces a Content-Type header value to its lowercase `type/subtype`.
fn media_type_essence(content_type: &str) -> Option<String> {
    let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
    let (kind, subtype) = essence.split_once('/')?;

    let valid_part = |part: &str| {
        !part.is_empty()
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || "!#$&-^_.+".contains(c))
    };

    if valid_part(kind) && valid_part(subtype) {
        Some(essence)
    } else {
        None
    }
}

/// Identifies common image formats by their magic bytes.
fn sniff_media_type(bytes: &[u8]) -> Option<&'static str> {
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
    if bytes.starts_with(b"BM") {
        return Some("image/bmp");
    }
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return Some("image/x-icon");
    }
    if looks_like_svg(bytes) {
        return Some("image/svg+xml");
    }
    None
}

fn looks_like_svg(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(SVG_SNIFF_WINDOW)];
    let text = String::from_utf8_lossy(window);
    let text = text.trim_start_matches('\u{feff}').trim_start();

    (text.starts_with("<svg") || text.starts_with("<?xml") || text.starts_with("<!--"))
        && text.contains("<svg")
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    #[test]
    fn test_encode_uses_declared_content_type() {
        let encoded = encode(b"abc", Some("image/png")).unwrap();
        assert_eq!(encoded, "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_encode_strips_content_type_parameters() {
        let encoded = encode(b"<svg/>", Some("Image/SVG+XML; charset=utf-8")).unwrap();
        assert!(encoded.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_encode_sniffs_when_undeclared() {
        let encoded = encode(PNG_HEADER, None).unwrap();
        assert!(encoded.starts_with("data:image/png;base64,"));

        let encoded = encode(&[0xFF, 0xD8, 0xFF, 0xE0], None).unwrap();
        assert!(encoded.starts_with("data:image/jpeg;base64,"));

        let encoded = encode(b"GIF89a....", None).unwrap();
        assert!(encoded.starts_with("data:image/gif;base64,"));

        let encoded = encode(b"RIFF\x10\x00\x00\x00WEBPVP8 ", None).unwrap();
        assert!(encoded.starts_with("data:image/webp;base64,"));
    }

    #[test]
    fn test_encode_prefers_sniffed_over_generic_declaration() {
        let encoded = encode(PNG_HEADER, Some("application/octet-stream")).unwrap();
        assert!(encoded.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_encode_falls_back_to_generic_declaration() {
        let encoded = encode(b"\x01\x02\x03", Some("application/octet-stream")).unwrap();
        assert!(encoded.starts_with("data:application/octet-stream;base64,"));
    }

    #[test]
    fn test_encode_sniffs_svg_with_xml_prolog() {
        let body = b"\n  <?xml version=\"1.0\"?>\n<svg xmlns=\"http://www.w3.org/2000/svg\"/>";
        let encoded = encode(body, Some("not a media type")).unwrap();
        assert!(encoded.starts_with("data:image/svg+xml;base64,"));
    }

    #[test]
    fn test_encode_empty_input() {
        assert_eq!(encode(b"", Some("image/png")), Err(EncodingError::Empty));
    }

    #[test]
    fn test_encode_unknown_media_type() {
        assert_eq!(
            encode(b"just some text", None),
            Err(EncodingError::UnknownMediaType)
        );
    }

    #[test]
    fn test_encode_is_deterministic() {
        let a = encode(PNG_HEADER, None).unwrap();
        let b = encode(PNG_HEADER, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_decode_recovers_bytes_and_type() {
        let encoded = encode(PNG_HEADER, None).unwrap();
        let (media_type, bytes) = decode(&encoded).unwrap();
        assert_eq!(media_type, "image/png");
        assert_eq!(bytes, PNG_HEADER);
    }

    #[test]
    fn test_decode_rejects_malformed_values() {
        assert!(matches!(
            decode("https://x/img.png"),
            Err(EncodingError::Malformed(_))
        ));
        assert!(matches!(
            decode("data:image/png,rawtext"),
            Err(EncodingError::Malformed(_))
        ));
        assert!(matches!(
            decode("data:image/png;base64,!!!"),
            Err(EncodingError::Malformed(_))
        ));
    }
}
