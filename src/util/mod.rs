//! Utility functions.
//!
//! Time unit parsing and small text helpers shared by the drivers.

pub mod time;

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

/// Longest header line inspected when sniffing text formats.
const HEADER_LIMIT: u64 = 256;

/// First line of `path`, without the line ending, reading at most a short
/// prefix of the file.
pub fn read_header_line(path: &Path) -> io::Result<Vec<u8>> {
    let mut reader = BufReader::new(File::open(path)?.take(HEADER_LIMIT));
    let mut line = Vec::new();
    reader.read_until(b'\n', &mut line)?;
    while matches!(line.last(), Some(b'\n' | b'\r')) {
        line.pop();
    }
    Ok(line)
}

/// Trimmed first line of `path`, or `None` when it cannot be read.
pub fn header_line(path: &Path) -> Option<String> {
    let line = read_header_line(path).ok()?;
    Some(decode_text(&line).trim().to_string())
}

/// Decode text file content; bytes that are not UTF-8 are replaced.
pub fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    String::from_utf8_lossy(bytes)
}

/// Strip one pair of surrounding double quotes, if present.
pub fn unquote(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}
