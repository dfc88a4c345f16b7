//! Response header parsing.
//!
//! # Design
//! The transfer layer hands over one raw header line at a time, terminator
//! included. `parse_header_line` is the pure split; `HeaderCollector` folds
//! the lines of one transfer into a case-folded `Headers` map. Lines without
//! a colon (the status line, the blank line ending the block, garbage) leave
//! the map untouched.

use std::collections::HashMap;

/// Response headers keyed by lowercase, trimmed name.
pub type Headers = HashMap<String, String>;

/// Receives raw header lines while a transfer runs.
///
/// Must return the number of bytes consumed; anything less than
/// `line.len()` aborts the transfer.
pub trait HeaderSink {
    fn header(&mut self, line: &[u8]) -> usize;
}

/// Split one raw header line at its first colon.
///
/// Returns `None` when the line has no colon. Both halves are trimmed and the
/// key is lowercased; an empty key is returned as-is.
pub fn parse_header_line(line: &[u8]) -> Option<(String, String)> {
    let line = String::from_utf8_lossy(line);
    let (key, value) = line.split_once(':')?;
    Some((key.trim().to_lowercase(), value.trim().to_string()))
}

/// Accumulates the headers of one transfer.
#[derive(Debug, Default, Clone)]
pub struct HeaderCollector {
    headers: Headers,
    status: Option<u16>,
}

impl HeaderCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw line. Always reports the whole line as consumed.
    pub fn feed(&mut self, line: &[u8]) -> usize {
        match parse_header_line(line) {
            Some((key, value)) => {
                self.headers.insert(key, value);
            }
            None => {
                if let Some(code) = parse_status_line(line) {
                    self.status = Some(code);
                }
            }
        }
        line.len()
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Status code of the last status line seen, if any.
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn into_parts(self) -> (Headers, Option<u16>) {
        (self.headers, self.status)
    }
}

impl HeaderSink for HeaderCollector {
    fn header(&mut self, line: &[u8]) -> usize {
        self.feed(line)
    }
}

/// `HTTP/1.1 200 OK` -> `200`.
fn parse_status_line(line: &[u8]) -> Option<u16> {
    let line = std::str::from_utf8(line).ok()?;
    let mut parts = line.split_whitespace();
    if !parts.next()?.starts_with("HTTP/") {
        return None;
    }
    parts.next()?.parse().ok()
}
