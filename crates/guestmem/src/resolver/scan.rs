//! Terminator scanning over a shared read buffer
//!
//! Both scans walk the buffer in windows of a caller-chosen size and never look
//! at a byte twice. The window size only changes how much is inspected per
//! step, never the result.

use memchr::memchr;

/// Index of the zero byte ending the string that starts at `offset`.
///
/// Returns `None` when the buffer ends first.
pub fn find_string_end(buffer: &[u8], offset: usize, window: usize) -> Option<usize> {
    let window = window.max(1);
    let mut scanned = offset.min(buffer.len());
    while scanned < buffer.len() {
        let limit = scanned.saturating_add(window).min(buffer.len());
        if let Some(pos) = memchr(0, &buffer[scanned..limit]) {
            return Some(scanned + pos);
        }
        scanned = limit;
    }
    None
}

/// Index of the first byte of the double zero ending the array at `offset`.
///
/// A zero pair split across two windows is still detected.
pub fn find_array_end(buffer: &[u8], offset: usize, window: usize) -> Option<usize> {
    let window = window.max(1);
    let mut scanned = offset.min(buffer.len());
    let mut last_zero: Option<usize> = None;
    while scanned < buffer.len() {
        let limit = scanned.saturating_add(window).min(buffer.len());
        for pos in memchr::memchr_iter(0, &buffer[scanned..limit]) {
            let pos = scanned + pos;
            if last_zero.is_some_and(|prev| prev + 1 == pos) {
                return Some(pos - 1);
            }
            last_zero = Some(pos);
        }
        scanned = limit;
    }
    None
}

/// Body of an array cut off by the end of the buffer.
///
/// A single trailing zero closes the last element rather than starting an
/// empty one.
pub fn truncated_array_body(bytes: &[u8]) -> &[u8] {
    match bytes.last() {
        Some(0) => &bytes[..bytes.len() - 1],
        _ => bytes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_string_end() {
        let buffer = b"foo\0barbaz\0";
        assert_eq!(find_string_end(buffer, 0, 16), Some(3));
        assert_eq!(find_string_end(buffer, 4, 16), Some(10));
        assert_eq!(find_string_end(buffer, 3, 16), Some(3));
    }

    #[test]
    fn test_find_string_end_any_window() {
        let buffer = b"a long string that spans several windows\0tail";
        for window in [0, 1, 2, 3, 7, 16, 64, 1000] {
            assert_eq!(find_string_end(buffer, 0, window), Some(40), "window {}", window);
            assert_eq!(find_string_end(buffer, 41, window), None, "window {}", window);
        }
    }

    #[test]
    fn test_find_string_end_past_buffer() {
        assert_eq!(find_string_end(b"abc", 3, 16), None);
        assert_eq!(find_string_end(b"abc", 10, 16), None);
        assert_eq!(find_string_end(b"", 0, 16), None);
    }

    #[test]
    fn test_find_array_end() {
        let buffer = b"a\0b\0\0";
        assert_eq!(find_array_end(buffer, 0, 64), Some(3));
        assert_eq!(find_array_end(b"\0\0", 0, 64), Some(0));
        assert_eq!(find_array_end(b"a\0\0", 0, 64), Some(1));
    }

    #[test]
    fn test_find_array_end_pair_across_windows() {
        // The terminating pair sits at indices 3 and 4
        let buffer = b"a\0b\0\0c";
        for window in 1..=8 {
            assert_eq!(find_array_end(buffer, 0, window), Some(3), "window {}", window);
        }
    }

    #[test]
    fn test_find_array_end_truncated() {
        assert_eq!(find_array_end(b"a\0b\0c", 0, 2), None);
        assert_eq!(find_array_end(b"a\0b\0", 0, 2), None);
    }

    #[test]
    fn test_find_array_end_ignores_bytes_before_offset() {
        // A zero right before the offset must not pair with the first zero after it
        let buffer = b"x\0\0y\0z\0\0";
        assert_eq!(find_array_end(buffer, 2, 4), Some(6));
    }

    #[test]
    fn test_truncated_array_body() {
        assert_eq!(truncated_array_body(b"a\0b\0"), b"a\0b");
        assert_eq!(truncated_array_body(b"a\0b"), b"a\0b");
        assert_eq!(truncated_array_body(b""), b"");
    }
}
