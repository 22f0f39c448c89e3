//! Trailing metadata record detection for legacy art files.
//!
//! Layout at the end of a file: `content, EOF marker (0x1A), [comment block],
//! 128-byte record starting with "SAUCE"`. The comment block ("COMNT" plus up
//! to 255 lines of 64 bytes) sits between the marker and the record, so the
//! marker is searched backward a bounded distance from the record.

use tracing::trace;

pub const SIGNATURE: &[u8; 5] = b"SAUCE";
pub const RECORD_LEN: usize = 128;
pub const EOF_MARKER: u8 = 0x1a;

const COMMENT_HEADER_LEN: usize = 5;
const COMMENT_LINE_LEN: usize = 64;
const MAX_COMMENT_LINES: usize = 255;
/// Farthest the marker may sit before the record: a full comment block plus
/// the marker byte itself.
pub const MAX_MARKER_DISTANCE: usize = COMMENT_HEADER_LEN + COMMENT_LINE_LEN * MAX_COMMENT_LINES + 1;

/// True when `bytes` ends with a metadata record.
pub fn has_record(bytes: &[u8]) -> bool {
    bytes
        .len()
        .checked_sub(RECORD_LEN)
        .is_some_and(|start| bytes[start..].starts_with(SIGNATURE))
}

/// Content with the trailing marker-plus-record removed. Input without a
/// record is returned unchanged.
pub fn strip_metadata(bytes: &[u8]) -> &[u8] {
    if !has_record(bytes) {
        return bytes;
    }
    let record_start = bytes.len() - RECORD_LEN;
    let floor = record_start.saturating_sub(MAX_MARKER_DISTANCE);
    let content_end = bytes[floor..record_start]
        .iter()
        .rposition(|&b| b == EOF_MARKER)
        .map(|idx| floor + idx)
        .unwrap_or(record_start);
    trace!(
        target: "text.sauce",
        total = bytes.len(),
        content = content_end,
        "metadata_stripped"
    );
    &bytes[..content_end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Vec<u8> {
        let mut r = SIGNATURE.to_vec();
        r.resize(RECORD_LEN, b' ');
        r
    }

    #[test]
    fn content_without_record_unchanged() {
        let body = b"hello\x1a world".to_vec();
        assert_eq!(strip_metadata(&body), body.as_slice());
    }

    #[test]
    fn strips_marker_and_record() {
        let mut file = b"ART".to_vec();
        file.push(EOF_MARKER);
        file.extend(record());
        assert_eq!(strip_metadata(&file), b"ART");
    }

    #[test]
    fn tolerates_comment_block() {
        let mut file = b"ART".to_vec();
        file.push(EOF_MARKER);
        file.extend_from_slice(b"COMNT");
        file.extend(std::iter::repeat_n(b'c', COMMENT_LINE_LEN * 2));
        file.extend(record());
        assert_eq!(strip_metadata(&file), b"ART");
    }

    #[test]
    fn missing_marker_strips_record_only() {
        let mut file = b"ART".to_vec();
        file.extend(record());
        assert_eq!(strip_metadata(&file), b"ART");
    }

    #[test]
    fn stripping_is_idempotent() {
        let mut file = b"ART".to_vec();
        file.push(EOF_MARKER);
        file.extend(record());
        let once = strip_metadata(&file);
        assert_eq!(strip_metadata(once), once);
    }
}
