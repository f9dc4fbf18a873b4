use std::io::Read;

use flate2::read::GzDecoder;

use crate::error::CoreError;

/// First two bytes of every gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// First bytes of a SQLite database image ("SQLite format 3\0").
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

pub fn has_gzip_magic(bytes: &[u8]) -> bool {
    bytes.len() >= 2 && bytes[0] == GZIP_MAGIC[0] && bytes[1] == GZIP_MAGIC[1]
}

/// Whether `bytes` starts with the SQLite file header. Diagnostic only;
/// an install is never rejected on this check.
pub fn is_sqlite_image(bytes: &[u8]) -> bool {
    bytes.len() >= SQLITE_HEADER.len() && &bytes[..SQLITE_HEADER.len()] == SQLITE_HEADER
}

/// Reverse the snapshot's compression envelope.
///
/// Input without the gzip magic is returned unchanged: the transport may
/// already have decompressed the object. Input carrying the magic is fully
/// inflated; an inflate failure is reported as `CoreError::Decode` and the
/// caller decides whether to treat the original bytes as the payload.
pub fn decode(bytes: &[u8]) -> Result<Vec<u8>, CoreError> {
    if !has_gzip_magic(bytes) {
        return Ok(bytes.to_vec());
    }

    let mut decoder = GzDecoder::new(bytes);
    let mut inflated = Vec::new();
    decoder
        .read_to_end(&mut inflated)
        .map_err(|e| CoreError::Decode(format!("gzip inflate failed: {e}")))?;
    Ok(inflated)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use flate2::Compression;
    use flate2::write::GzEncoder;

    use super::*;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn magic_detection() {
        assert!(has_gzip_magic(&[0x1f, 0x8b, 0x08]));
        assert!(!has_gzip_magic(&[0x1f]));
        assert!(!has_gzip_magic(b"SQLite format 3\0"));
        assert!(!has_gzip_magic(&[]));
    }

    #[test]
    fn decode_inflates_valid_gzip() {
        let payload = b"SQLite format 3\0 plus some page data".to_vec();
        let compressed = gzip(&payload);
        assert!(has_gzip_magic(&compressed));

        let decoded = decode(&compressed).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn decode_is_identity_without_magic() {
        let plain = b"not compressed at all".to_vec();
        let decoded = decode(&plain).unwrap();
        assert_eq!(decoded, plain);

        let empty = decode(&[]).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn decode_roundtrip_is_stable() {
        let payload = vec![0x42u8; 4096];
        let first = decode(&gzip(&payload)).unwrap();
        let second = decode(&gzip(&first)).unwrap();
        assert_eq!(first, payload);
        assert_eq!(second, payload);
    }

    #[test]
    fn decode_rejects_truncated_gzip() {
        let mut compressed = gzip(b"some payload");
        compressed.truncate(6);
        let err = decode(&compressed).unwrap_err();
        assert!(matches!(err, CoreError::Decode(_)));
    }

    #[test]
    fn decode_rejects_magic_followed_by_garbage() {
        let bogus = [0x1f, 0x8b, 0xff, 0xff, 0x00, 0x01, 0x02];
        assert!(decode(&bogus).is_err());
    }

    #[test]
    fn sqlite_header_probe() {
        let mut image = b"SQLite format 3\0".to_vec();
        image.extend_from_slice(&[0u8; 100]);
        assert!(is_sqlite_image(&image));
        assert!(!is_sqlite_image(b"SQLite forma"));
        assert!(!is_sqlite_image(&gzip(&image)));
    }
}
