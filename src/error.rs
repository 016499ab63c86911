use crate::fleet::{PhaseError, WorkerIndex};
use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a run.
///
/// Everything here is a setup or bookkeeping failure. Per-worker problems
/// (unreadable input, lost payload, killed worker) are recorded as
/// [`crate::fleet::WorkerFailure`] values and never surface as an `Error`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("No input file names entered")]
    NoInputs,

    #[error("Failed to spawn worker {index} for {input}: {source}")]
    Spawn {
        index: WorkerIndex,
        input: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Worker {index} was spawned without a result channel")]
    ChannelUnavailable { index: WorkerIndex },

    #[error("Worker {index} exited before its handle could be recorded")]
    HandleUnavailable { index: WorkerIndex },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Worker {index} was reaped twice")]
    DuplicateReap { index: WorkerIndex },

    #[error("Exit event queue closed with {reaped} of {expected} workers reaped")]
    EventQueueClosed { reaped: usize, expected: usize },

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error happened before or while workers were launched.
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self,
            Error::NoInputs
                | Error::Spawn { .. }
                | Error::ChannelUnavailable { .. }
                | Error::HandleUnavailable { .. }
                | Error::Config(_)
                | Error::ConfigRead { .. }
                | Error::Toml(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
