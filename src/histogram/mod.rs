//! Letter-frequency histograms
//!
//! A [`Histogram`] holds one count per ASCII letter, folded to lowercase.
//! Every other byte is ignored. The module also owns the two encodings a
//! histogram travels in: the fixed-size binary payload a worker publishes on
//! its channel (see [`payload`]) and the `<letter> <count>` text that ends up
//! in the artifact file.

pub mod payload;


pub use payload::{PayloadError, PAYLOAD_LEN};

use serde::Serialize;
use std::io::{self, Read};

/// Number of buckets in a histogram, one per letter `a..=z`.
pub const ALPHA_LETTERS: usize = 26;

const READ_CHUNK: usize = 8 * 1024;

/// Per-letter counts for a single input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Histogram {
    counts: [u64; ALPHA_LETTERS],
}

impl Histogram {
    /// Create an empty histogram (all counts zero)
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_counts(counts: [u64; ALPHA_LETTERS]) -> Self {
        Self { counts }
    }

    /// Count every letter in `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut histogram = Self::new();
        histogram.update(bytes);
        histogram
    }

    /// Consume `reader` to the end and count its letters.
    ///
    /// An empty stream yields an all-zero histogram. Interrupted reads are
    /// retried; any other read error is returned.
    pub fn compute<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut histogram = Self::new();
        let mut buffer = [0u8; READ_CHUNK];

        loop {
            match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => histogram.update(&buffer[..n]),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }

        Ok(histogram)
    }

    /// Fold a chunk of bytes into the counts.
    pub fn update(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.record(byte);
        }
    }

    pub fn record(&mut self, byte: u8) {
        if byte.is_ascii_alphabetic() {
            let bucket = (byte.to_ascii_lowercase() - b'a') as usize;
            self.counts[bucket] += 1;
        }
    }

    pub fn counts(&self) -> &[u64; ALPHA_LETTERS] {
        &self.counts
    }

    /// Count for a single letter, case-insensitive. `None` for non-letters.
    pub fn count(&self, letter: char) -> Option<u64> {
        if !letter.is_ascii_alphabetic() {
            return None;
        }
        let bucket = (letter.to_ascii_lowercase() as u8 - b'a') as usize;
        Some(self.counts[bucket])
    }

    /// Total number of letters counted.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterate `(letter, count)` pairs in alphabetical order.
    pub fn letters(&self) -> impl Iterator<Item = (char, u64)> + '_ {
        (b'a'..=b'z').map(char::from).zip(self.counts.iter().copied())
    }

    /// Render the artifact text: 26 lines of `<letter> <count>`, each
    /// terminated by a newline.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(ALPHA_LETTERS * 4);
        for (letter, count) in self.letters() {
            out.push(letter);
            out.push(' ');
            out.push_str(&count.to_string());
            out.push('\n');
        }
        out
    }
}
