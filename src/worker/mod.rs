//! Worker Unit
//!
//! The child side of a run. A worker owns one input and one channel (its
//! stdout). It computes the histogram, writes exactly one payload, flushes,
//! and only then exits, so the parent can drain as soon as it sees the exit.
//! Nothing but the payload may ever be written to the channel; diagnostics go
//! to stderr through `tracing`.

#[cfg(test)]
mod tests;

use crate::histogram::Histogram;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, info_span};

/// Exit statuses a worker reports to its parent.
pub mod exit_code {
    /// Payload published
    pub const SUCCESS: i32 = 0;
    /// Input could not be opened or read; nothing published
    pub const INPUT_FAILURE: i32 = 1;
    /// Payload write failed or was cut short
    pub const PUBLISH_FAILURE: i32 = 2;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assignment {
    /// Count the letters in this file
    Input(PathBuf),
    /// Publish nothing and wait to be cancelled
    Hold,
}

#[derive(Debug, Clone)]
pub struct WorkerTask {
    pub index: usize,
    pub assignment: Assignment,
    /// Pause after publishing, before exit
    pub linger: Duration,
    /// Longest a held worker waits before giving up on its own
    pub hold_limit: Duration,
}

impl WorkerTask {
    pub fn new(index: usize, assignment: Assignment) -> Self {
        Self {
            index,
            assignment,
            linger: Duration::ZERO,
            hold_limit: Duration::from_secs(60),
        }
    }

    pub fn with_linger(mut self, linger: Duration) -> Self {
        self.linger = linger;
        self
    }

    pub fn with_hold_limit(mut self, hold_limit: Duration) -> Self {
        self.hold_limit = hold_limit;
        self
    }

    /// Run the unit against `channel` and return the process exit status.
    pub fn run<W: Write>(&self, channel: &mut W) -> i32 {
        let _span = info_span!("worker", index = self.index).entered();

        match &self.assignment {
            Assignment::Input(path) => self.publish_histogram(path, channel),
            Assignment::Hold => {
                info!("Holding until cancelled (at most {:?})", self.hold_limit);
                std::thread::sleep(self.hold_limit);
                info!("Hold limit reached without cancellation");
                exit_code::SUCCESS
            }
        }
    }

    fn publish_histogram<W: Write>(&self, path: &Path, channel: &mut W) -> i32 {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                error!("Cannot open file {}: {}", path.display(), e);
                return exit_code::INPUT_FAILURE;
            }
        };

        if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
            info!("File {} is empty", path.display());
        }

        let histogram = match Histogram::compute(BufReader::new(file)) {
            Ok(histogram) => histogram,
            Err(e) => {
                error!("Read error from {}: {}", path.display(), e);
                return exit_code::INPUT_FAILURE;
            }
        };
        debug!(letters = histogram.total(), "Computed histogram");

        if let Err(e) = publish(channel, &histogram) {
            error!("Write error to channel: {}", e);
            return exit_code::PUBLISH_FAILURE;
        }

        if !self.linger.is_zero() {
            debug!("Lingering for {:?}", self.linger);
            std::thread::sleep(self.linger);
        }

        exit_code::SUCCESS
    }
}

/// Write one payload and flush it.
pub fn publish<W: Write>(channel: &mut W, histogram: &Histogram) -> io::Result<()> {
    channel.write_all(&histogram.to_payload())?;
    channel.flush()
}
