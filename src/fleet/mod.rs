//! Parent side of a run
//!
//! The [`Fleet`] launches one worker per input, then runs a single dispatcher
//! loop over the exit-event queue. Each event goes through the
//! [`CompletionHandler`] in arrival order; the loop ends once every launched
//! worker is in the [`CompletionSet`], however it ended.

pub mod completion;
pub mod events;
pub mod handler;
pub mod input;
pub mod launcher;
pub mod outcome;
pub mod phase;
pub mod registry;
pub mod report;
pub mod sink;


pub use completion::CompletionSet;
pub use events::{ExitDisposition, ExitEvent, WorkerHandle};
pub use handler::CompletionHandler;
pub use input::{parse_inputs, InputSlot};
pub use launcher::{LaunchedFleet, Launcher, WorkerProgram};
pub use outcome::{ReapRecord, WorkerFailure, WorkerOutcome};
pub use phase::{PhaseError, PhaseEvent, WorkerPhase};
pub use registry::ChannelRegistry;
pub use report::RunReport;
pub use sink::{artifact_name, ArtifactSink, FileSink, MemorySink};

use crate::config::RunConfig;
use crate::error::{Error, Result};
use chrono::Utc;
use events::EventReceiver;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tracing::{debug, info, warn};

/// Position of a worker's input on the command line, starting at 0.
pub type WorkerIndex = usize;

pub struct Fleet {
    config: RunConfig,
    program: WorkerProgram,
    sink: Arc<dyn ArtifactSink>,
}

impl Fleet {
    /// A fleet that writes artifacts into `config.output_dir`.
    pub fn new(config: RunConfig, program: WorkerProgram) -> Self {
        let sink = Arc::new(FileSink::new(config.output_dir.clone()));
        Self {
            config,
            program,
            sink,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArtifactSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Launch every input, reap every worker, return the report.
    pub async fn run(&self, inputs: &[InputSlot]) -> Result<RunReport> {
        let started_at = Utc::now();

        let LaunchedFleet {
            mut registry,
            mut events,
            watchers,
        } = Launcher::new(&self.program, &self.config).launch(inputs)?;

        let mut completions = CompletionSet::new(registry.len());
        let handler = CompletionHandler::new(Arc::clone(&self.sink), self.config.drain_timeout);

        dispatch(&handler, &mut registry, &mut completions, &mut events).await?;

        // Every watcher has posted its event by now, so these return at once
        for watcher in watchers {
            if let Err(e) = watcher.await {
                warn!("Exit watcher ended abnormally: {}", e);
            }
        }

        let report = RunReport::new(started_at, completions.into_records());
        info!(
            "Run complete: {} artifacts, {} failures",
            report.artifact_count(),
            report.failure_count()
        );
        Ok(report)
    }
}

/// Feed exit events to `handler` until every registered worker is reaped.
///
/// One wake may find several events queued; all of them are handled before
/// waiting again. Returns an error if the queue closes while workers are
/// still outstanding.
pub async fn dispatch<C>(
    handler: &CompletionHandler,
    registry: &mut ChannelRegistry<C>,
    completions: &mut CompletionSet,
    events: &mut EventReceiver,
) -> Result<()>
where
    C: AsyncRead + Unpin,
{
    let mut batch = Vec::new();

    while !completions.is_quiescent() {
        let Some(first) = events.recv().await else {
            return Err(Error::EventQueueClosed {
                reaped: completions.len(),
                expected: completions.expected(),
            });
        };
        batch.push(first);
        while let Ok(event) = events.try_recv() {
            batch.push(event);
        }
        debug!("Handling {} exit events", batch.len());

        for event in batch.drain(..) {
            handler.handle(registry, completions, event).await?;
        }
    }

    Ok(())
}
