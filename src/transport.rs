//! Seams between the driver and the outside world: byte transport, device
//! discovery/open, and the clock. Also the line framer that turns received
//! bytes into text lines.

use crate::consts::wire::MAX_LINE_LEN;
use crate::error::Result;
use log::{trace, warn};
use std::collections::VecDeque;
use std::time::Instant;

/// A connected, byte-oriented link to the board.
///
/// Dropping the value closes the link.
pub trait Transport {
    /// Writes every byte or fails.
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()>;

    /// Reads whatever is available without blocking for long. `Ok(0)` means
    /// nothing arrived. An `Err` is a transport-level fault.
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Finds and opens the board.
pub trait Connector {
    /// Transport produced by [`Connector::open`].
    type Port: Transport;

    /// Returns the port name of the first device matching `vid`/`pid`,
    /// or [`crate::Error::DeviceNotFound`].
    fn find_device(&mut self, vid: u16, pid: u16) -> Result<String>;

    /// Opens `path` at `baud_rate`, or fails with [`crate::Error::PortOpen`].
    fn open(&mut self, path: &str, baud_rate: u32) -> Result<Self::Port>;
}

/// Time source for every timer in the driver.
pub trait Clock {
    /// Current instant.
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Splits a byte stream into `\n`-terminated lines.
///
/// Surrounding whitespace (including the `\r` the firmware puts around its
/// line breaks) is stripped. Incomplete trailing data is kept until its
/// newline arrives. A partial line longer than 256 bytes is
/// dropped up to the next line break.
#[derive(Debug, Default)]
pub struct LineFramer {
    partial: Vec<u8>,
    lines: VecDeque<String>,
    discarding: bool,
}

impl LineFramer {
    /// Creates an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends received bytes.
    pub fn push(&mut self, mut bytes: &[u8]) {
        while let Some(pos) = bytes.iter().position(|&b| b == b'\n') {
            self.extend_partial(&bytes[..pos]);
            self.finish_line();
            bytes = &bytes[pos + 1..];
        }
        self.extend_partial(bytes);
    }

    /// Pops the next complete line, if any. Empty lines are skipped.
    pub fn next_line(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    /// Drops buffered lines and any partial line.
    pub fn clear(&mut self) {
        self.partial.clear();
        self.lines.clear();
        self.discarding = false;
    }

    /// Number of buffered bytes of the incomplete trailing line.
    pub fn pending(&self) -> usize {
        self.partial.len()
    }

    fn extend_partial(&mut self, bytes: &[u8]) {
        if self.discarding || bytes.is_empty() {
            return;
        }
        if self.partial.len() + bytes.len() > MAX_LINE_LEN {
            warn!(
                "Discarding {} received bytes without a line break",
                self.partial.len() + bytes.len()
            );
            self.partial.clear();
            self.discarding = true;
            return;
        }
        self.partial.extend_from_slice(bytes);
    }

    fn finish_line(&mut self) {
        if std::mem::take(&mut self.discarding) {
            return;
        }
        let line = String::from_utf8_lossy(&self.partial).trim().to_string();
        self.partial.clear();
        if !line.is_empty() {
            trace!("RX line: {:?}", line);
            self.lines.push_back(line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framer_splits_lines() {
        let mut framer = LineFramer::new();
        framer.push(b">gpio readall\n\r0f\n\r>");
        assert_eq!(framer.next_line().as_deref(), Some(">gpio readall"));
        assert_eq!(framer.next_line().as_deref(), Some("0f"));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.pending(), 2);
    }

    #[test]
    fn test_framer_keeps_partial_line() {
        let mut framer = LineFramer::new();
        framer.push(b">gpio rea");
        assert_eq!(framer.next_line(), None);
        framer.push(b"dall\r\n");
        assert_eq!(framer.next_line().as_deref(), Some(">gpio readall"));
    }

    #[test]
    fn test_framer_skips_blank_lines() {
        let mut framer = LineFramer::new();
        framer.push(b"\r\n\n  \nab\n");
        assert_eq!(framer.next_line().as_deref(), Some("ab"));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_clear() {
        let mut framer = LineFramer::new();
        framer.push(b"partial");
        framer.clear();
        framer.push(b"\n");
        assert_eq!(framer.next_line(), None);
    }

    #[test]
    fn test_framer_bounds_line_without_break() {
        let mut framer = LineFramer::new();
        for _ in 0..10_000 {
            framer.push(&[b'x'; 100]);
            assert_eq!(framer.next_line(), None);
            assert!(framer.pending() <= MAX_LINE_LEN, "{}", framer.pending());
        }
        // The tail of the overlong line is dropped, later lines come through.
        framer.push(b"xxxx\n\r0f\n");
        assert_eq!(framer.next_line().as_deref(), Some("0f"));
        assert_eq!(framer.next_line(), None);
        assert_eq!(framer.pending(), 0);
    }

    #[test]
    fn test_framer_accepts_line_at_limit() {
        let mut framer = LineFramer::new();
        framer.push(&[b'a'; MAX_LINE_LEN]);
        framer.push(b"\n");
        assert_eq!(framer.next_line().map(|line| line.len()), Some(MAX_LINE_LEN));
    }
}
