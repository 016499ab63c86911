//! Exit events posted by worker watchers

use serde::Serialize;
use std::fmt;
use std::os::unix::process::ExitStatusExt;
use tokio::sync::mpsc;

/// OS process id of a worker, as returned at spawn time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct WorkerHandle(pub u32);

impl fmt::Display for WorkerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a worker process ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExitDisposition {
    /// Normal exit with a status code
    Exited { code: i32 },
    /// Terminated by a signal
    Signaled { signal: i32 },
    /// Waiting on the child failed, so its status is unknown
    Lost { reason: String },
}

impl ExitDisposition {
    pub fn is_success(&self) -> bool {
        matches!(self, ExitDisposition::Exited { code: 0 })
    }
}

impl From<std::process::ExitStatus> for ExitDisposition {
    fn from(status: std::process::ExitStatus) -> Self {
        if let Some(code) = status.code() {
            ExitDisposition::Exited { code }
        } else if let Some(signal) = status.signal() {
            ExitDisposition::Signaled { signal }
        } else {
            ExitDisposition::Lost {
                reason: format!("unrecognised wait status {status:?}"),
            }
        }
    }
}

impl fmt::Display for ExitDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitDisposition::Exited { code } => write!(f, "exited with status {code}"),
            ExitDisposition::Signaled { signal } => {
                write!(f, "killed by {}", signal_name(*signal))
            }
            ExitDisposition::Lost { reason } => write!(f, "lost ({reason})"),
        }
    }
}

/// `SIGINT` style name for a raw signal number.
pub fn signal_name(signal: i32) -> String {
    nix::sys::signal::Signal::try_from(signal)
        .map(|sig| sig.as_str().to_string())
        .unwrap_or_else(|_| format!("signal {signal}"))
}

/// "Worker X terminated", one per worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExitEvent {
    pub handle: WorkerHandle,
    pub disposition: ExitDisposition,
}

pub type EventSender = mpsc::UnboundedSender<ExitEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<ExitEvent>;

pub fn event_queue() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::ExitStatus;

    #[test]
    fn test_disposition_from_exit_code() {
        // Raw wait status: exit code lives in the second byte
        let status = ExitStatus::from_raw(1 << 8);
        assert_eq!(
            ExitDisposition::from(status),
            ExitDisposition::Exited { code: 1 }
        );
        assert!(ExitDisposition::from(ExitStatus::from_raw(0)).is_success());
    }

    #[test]
    fn test_disposition_from_signal() {
        // Raw wait status: low bits carry the terminating signal
        let status = ExitStatus::from_raw(raw_sigint_status());
        let disposition = ExitDisposition::from(status);
        assert_eq!(disposition, ExitDisposition::Signaled { signal: 2 });
        assert_eq!(disposition.to_string(), "killed by SIGINT");
    }

    #[test]
    fn test_unknown_signal_name() {
        assert_eq!(signal_name(999), "signal 999");
    }

    fn raw_sigint_status() -> i32 {
        nix::sys::signal::Signal::SIGINT as i32
    }
}
