//! Helper functions for output buffering
//!
//! Pure functions shared by the command worker.

use std::time::Duration;

/// Marker prepended to output whose head was dropped
pub(super) const TRUNCATION_MARKER: &str = "[... earlier output truncated ...]\n";

/// Drop text from the front of `buffer` until it fits in `max` bytes
///
/// The cut is moved forward to the next line start so classification keeps
/// seeing whole lines. Returns the number of bytes removed.
pub(super) fn cap_front(buffer: &mut String, max: usize) -> usize {
    if buffer.len() <= max {
        return 0;
    }

    let mut cut = buffer.len() - max;
    while !buffer.is_char_boundary(cut) {
        cut += 1;
    }
    if let Some(newline) = buffer[cut..].find('\n') {
        cut += newline + 1;
    }

    buffer.drain(..cut);
    cut
}

/// Append `text` to an idle buffer, keeping its tail within `max` bytes
pub(super) fn push_capped(buffer: &mut String, text: &str, max: usize) -> usize {
    buffer.push_str(text);
    cap_front(buffer, max)
}

/// Saturating milliseconds of a duration
pub(super) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
