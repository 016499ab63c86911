//! Worker lifecycle as seen by the parent
//!
//! ```text
//! Spawned ──Start──▶ Running ──Publish──▶ Published ──Exit──▶ Exited ──Reap──▶ Reaped
//!                       │                                                  ▲
//!                       └────────Fail──────▶ Failed ────────Reap───────────┘
//! ```
//!
//! No transition skips a state and `Reaped` is terminal, so each worker is
//! reaped exactly once.

use super::WorkerIndex;
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerPhase {
    Spawned,
    Running,
    Published,
    Failed,
    Exited,
    Reaped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    Start,
    Publish,
    Fail,
    Exit,
    Reap,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("Invalid transition for worker {index}: {from} on {event:?}")]
    InvalidTransition {
        index: WorkerIndex,
        from: WorkerPhase,
        event: PhaseEvent,
    },

    #[error("No worker with index {index}")]
    UnknownWorker { index: WorkerIndex },
}

impl fmt::Display for WorkerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerPhase::Spawned => "spawned",
            WorkerPhase::Running => "running",
            WorkerPhase::Published => "published",
            WorkerPhase::Failed => "failed",
            WorkerPhase::Exited => "exited",
            WorkerPhase::Reaped => "reaped",
        };
        f.write_str(name)
    }
}

impl WorkerPhase {
    pub fn is_terminal(self) -> bool {
        self == WorkerPhase::Reaped
    }
}

/// Pure transition function for one worker.
pub fn advance(
    index: WorkerIndex,
    from: WorkerPhase,
    event: PhaseEvent,
) -> Result<WorkerPhase, PhaseError> {
    use PhaseEvent as E;
    use WorkerPhase as P;

    match (from, event) {
        (P::Spawned, E::Start) => Ok(P::Running),
        (P::Running, E::Publish) => Ok(P::Published),
        (P::Running, E::Fail) => Ok(P::Failed),
        (P::Published, E::Exit) => Ok(P::Exited),
        (P::Exited, E::Reap) | (P::Failed, E::Reap) => Ok(P::Reaped),
        _ => Err(PhaseError::InvalidTransition { index, from, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(events: &[PhaseEvent]) -> Result<WorkerPhase, PhaseError> {
        events
            .iter()
            .try_fold(WorkerPhase::Spawned, |phase, &event| advance(0, phase, event))
    }

    #[test]
    fn test_published_path() {
        let phase = walk(&[
            PhaseEvent::Start,
            PhaseEvent::Publish,
            PhaseEvent::Exit,
            PhaseEvent::Reap,
        ]);
        assert_eq!(phase, Ok(WorkerPhase::Reaped));
    }

    #[test]
    fn test_failed_path() {
        let phase = walk(&[PhaseEvent::Start, PhaseEvent::Fail, PhaseEvent::Reap]);
        assert_eq!(phase, Ok(WorkerPhase::Reaped));
    }

    #[test]
    fn test_cannot_skip_states() {
        assert_eq!(
            walk(&[PhaseEvent::Reap]),
            Err(PhaseError::InvalidTransition {
                index: 0,
                from: WorkerPhase::Spawned,
                event: PhaseEvent::Reap,
            })
        );

        let err = walk(&[PhaseEvent::Start, PhaseEvent::Exit]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid transition for worker 0: running on Exit"
        );
    }

    #[test]
    fn test_reaped_is_terminal() {
        let reaped = walk(&[PhaseEvent::Start, PhaseEvent::Fail, PhaseEvent::Reap]).unwrap();
        assert!(reaped.is_terminal());

        for event in [
            PhaseEvent::Start,
            PhaseEvent::Publish,
            PhaseEvent::Fail,
            PhaseEvent::Exit,
            PhaseEvent::Reap,
        ] {
            assert!(advance(3, reaped, event).is_err());
        }
    }
}
