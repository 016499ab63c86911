use super::events::{signal_name, WorkerHandle};
use super::input::InputSlot;
use super::WorkerIndex;
use crate::histogram::Histogram;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Why a reaped worker produced no artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerFailure {
    /// The worker could not open or read its input
    InputFailure,
    /// The payload could not be read in full from the channel
    TransferFailure { reason: String },
    /// The worker was killed by a signal
    AbnormalExit { signal: i32 },
    /// The worker exited with an unexpected status code
    ExitCode { code: i32 },
    /// The payload arrived but the artifact could not be written
    PersistFailure { reason: String },
    /// Waiting on the worker failed
    WaitFailure { reason: String },
}

impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerFailure::InputFailure => f.write_str("input could not be read"),
            WorkerFailure::TransferFailure { reason } => write!(f, "payload lost: {reason}"),
            WorkerFailure::AbnormalExit { signal } => {
                write!(f, "exited abnormally ({})", signal_name(*signal))
            }
            WorkerFailure::ExitCode { code } => write!(f, "exited with status {code}"),
            WorkerFailure::PersistFailure { reason } => {
                write!(f, "artifact not written: {reason}")
            }
            WorkerFailure::WaitFailure { reason } => write!(f, "could not be waited on: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkerOutcome {
    Persisted {
        artifact: PathBuf,
        histogram: Histogram,
    },
    Failed {
        failure: WorkerFailure,
    },
}

impl WorkerOutcome {
    pub fn failed(failure: WorkerFailure) -> Self {
        WorkerOutcome::Failed { failure }
    }

    pub fn artifact(&self) -> Option<&PathBuf> {
        match self {
            WorkerOutcome::Persisted { artifact, .. } => Some(artifact),
            WorkerOutcome::Failed { .. } => None,
        }
    }

    pub fn failure(&self) -> Option<&WorkerFailure> {
        match self {
            WorkerOutcome::Persisted { .. } => None,
            WorkerOutcome::Failed { failure } => Some(failure),
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, WorkerOutcome::Persisted { .. })
    }
}

/// Everything known about one worker once it has been reaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReapRecord {
    pub index: WorkerIndex,
    pub handle: WorkerHandle,
    pub input: InputSlot,
    #[serde(flatten)]
    pub outcome: WorkerOutcome,
}
