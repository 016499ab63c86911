//! Completion handler
//!
//! Runs once per exit event, always on the dispatcher, never concurrently
//! with itself. A worker that exited with status 0 has already written and
//! flushed its payload, so the drain only waits on bytes that are in flight;
//! the timeout guards against a channel held open by something else.

use super::completion::CompletionSet;
use super::events::{ExitDisposition, ExitEvent, WorkerHandle};
use super::outcome::{ReapRecord, WorkerFailure, WorkerOutcome};
use super::phase::PhaseEvent;
use super::registry::ChannelRegistry;
use super::sink::{artifact_name, ArtifactSink};
use super::WorkerIndex;
use crate::error::Result;
use crate::histogram::{Histogram, PAYLOAD_LEN};
use crate::worker::exit_code;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, info, warn};

pub struct CompletionHandler {
    sink: Arc<dyn ArtifactSink>,
    drain_timeout: Duration,
}

impl CompletionHandler {
    pub fn new(sink: Arc<dyn ArtifactSink>, drain_timeout: Duration) -> Self {
        Self {
            sink,
            drain_timeout,
        }
    }

    /// Reap the worker behind `event`.
    ///
    /// Returns the reaped index, or `None` when the handle belongs to no
    /// registered worker. Per-worker failures are recorded in `completions`;
    /// only bookkeeping violations are returned as errors.
    pub async fn handle<C>(
        &self,
        registry: &mut ChannelRegistry<C>,
        completions: &mut CompletionSet,
        event: ExitEvent,
    ) -> Result<Option<WorkerIndex>>
    where
        C: AsyncRead + Unpin,
    {
        let ExitEvent {
            handle,
            disposition,
        } = event;

        let resolved = registry
            .resolve(handle)
            .and_then(|index| registry.slot(index).map(|slot| (index, slot.input.clone())));
        let Some((index, input)) = resolved else {
            warn!(pid = %handle, "Exit event for unknown worker ignored");
            return Ok(None);
        };
        info!(index, pid = %handle, "Caught worker exit: {}", disposition);

        let outcome = match disposition {
            ExitDisposition::Exited {
                code: exit_code::SUCCESS,
            } => {
                let channel = registry.take_channel(index);
                self.drain_and_persist(handle, channel).await
            }
            other => {
                // Nothing to read from a worker that did not succeed
                registry.close_channel(index);
                WorkerOutcome::failed(failure_for(other))
            }
        };

        if outcome.is_persisted() {
            registry.advance(index, PhaseEvent::Publish)?;
            registry.advance(index, PhaseEvent::Exit)?;
        } else {
            registry.advance(index, PhaseEvent::Fail)?;
        }
        registry.advance(index, PhaseEvent::Reap)?;

        match &outcome {
            WorkerOutcome::Persisted { artifact, .. } => {
                info!(index, pid = %handle, "Wrote {}", artifact.display());
            }
            WorkerOutcome::Failed { failure } => {
                warn!(index, pid = %handle, "Worker failed: {}", failure);
            }
        }

        completions.insert(ReapRecord {
            index,
            handle,
            input,
            outcome,
        })?;
        debug!(
            "Reaped {} of {} workers",
            completions.len(),
            completions.expected()
        );

        Ok(Some(index))
    }

    async fn drain_and_persist<C>(&self, handle: WorkerHandle, channel: Option<C>) -> WorkerOutcome
    where
        C: AsyncRead + Unpin,
    {
        let histogram = match self.drain(channel).await {
            Ok(histogram) => histogram,
            Err(reason) => return WorkerOutcome::failed(WorkerFailure::TransferFailure { reason }),
        };

        let name = artifact_name(handle);
        match self.sink.persist(&name, &histogram.render()).await {
            Ok(artifact) => WorkerOutcome::Persisted {
                artifact,
                histogram,
            },
            Err(e) => WorkerOutcome::failed(WorkerFailure::PersistFailure {
                reason: format!("{name}: {e}"),
            }),
        }
    }

    /// Read exactly one payload, then close the channel.
    async fn drain<C>(&self, channel: Option<C>) -> std::result::Result<Histogram, String>
    where
        C: AsyncRead + Unpin,
    {
        let Some(mut channel) = channel else {
            return Err("channel already closed".to_string());
        };

        let mut payload = [0u8; PAYLOAD_LEN];
        let read = tokio::time::timeout(self.drain_timeout, read_payload(&mut channel, &mut payload))
            .await
            .map_err(|_| format!("no payload within {:?}", self.drain_timeout))?
            .map_err(|e| format!("read error: {e}"))?;

        if read < PAYLOAD_LEN {
            return Err(format!("short read: {read} of {PAYLOAD_LEN} bytes"));
        }
        Ok(Histogram::from_payload(&payload))
    }
}

/// Fill `payload` until it is full or the writer has closed its end.
async fn read_payload<C>(channel: &mut C, payload: &mut [u8]) -> std::io::Result<usize>
where
    C: AsyncRead + Unpin,
{
    let mut filled = 0;
    while filled < payload.len() {
        match channel.read(&mut payload[filled..]).await {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

fn failure_for(disposition: ExitDisposition) -> WorkerFailure {
    match disposition {
        ExitDisposition::Exited {
            code: exit_code::INPUT_FAILURE,
        } => WorkerFailure::InputFailure,
        ExitDisposition::Exited {
            code: exit_code::PUBLISH_FAILURE,
        } => {
            WorkerFailure::TransferFailure {
                reason: "worker could not write its payload".to_string(),
            }
        }
        ExitDisposition::Exited { code } => WorkerFailure::ExitCode { code },
        ExitDisposition::Signaled { signal } => WorkerFailure::AbnormalExit { signal },
        ExitDisposition::Lost { reason } => WorkerFailure::WaitFailure { reason },
    }
}
