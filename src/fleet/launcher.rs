//! Launcher: one channel and one worker process per input
//!
//! Each worker is started with its stdout piped; that pipe is its private
//! result channel. The parent keeps only the read end, and std creates pipes
//! close-on-exec, so no worker ever inherits a sibling's channel. After a
//! worker is registered an exit watcher task takes ownership of the child,
//! waits for it and posts one [`ExitEvent`] to the dispatcher's queue.

use super::events::{event_queue, EventReceiver, EventSender, ExitDisposition, ExitEvent, WorkerHandle};
use super::input::InputSlot;
use super::phase::PhaseEvent;
use super::registry::ChannelRegistry;
use super::WorkerIndex;
use crate::config::RunConfig;
use crate::error::{Error, Result};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// The executable (plus leading arguments) that runs a Worker Unit.
///
/// The launcher appends `--index <i>`, then `--input <path>` or `--hold`,
/// then `--linger-ms <ms> --hold-limit-ms <ms>`.
#[derive(Debug, Clone)]
pub struct WorkerProgram {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerProgram {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Re-run the current executable in worker mode.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).arg("worker"))
    }

    fn command_for(&self, index: WorkerIndex, input: &InputSlot, config: &RunConfig) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.arg("--index").arg(index.to_string());

        match input {
            InputSlot::File(path) => {
                cmd.arg("--input").arg(path);
            }
            InputSlot::Cancel => {
                cmd.arg("--hold");
            }
        }

        cmd.arg("--linger-ms")
            .arg(config.linger_for(index).as_millis().to_string())
            .arg("--hold-limit-ms")
            .arg(config.hold_limit.as_millis().to_string());

        cmd.stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            // Dropping an unreaped child (setup abort, runtime shutdown)
            // must not leave it running
            .kill_on_drop(true);
        cmd
    }
}

/// Everything the dispatcher needs once all workers are running.
#[derive(Debug)]
pub struct LaunchedFleet {
    pub registry: ChannelRegistry,
    pub events: EventReceiver,
    pub watchers: Vec<JoinHandle<()>>,
}

pub struct Launcher<'a> {
    program: &'a WorkerProgram,
    config: &'a RunConfig,
}

impl<'a> Launcher<'a> {
    pub fn new(program: &'a WorkerProgram, config: &'a RunConfig) -> Self {
        Self { program, config }
    }

    /// Spawn one worker per input, in input order.
    ///
    /// Any spawn failure aborts the launch: watchers already started are
    /// aborted, which drops and kills their children.
    pub fn launch(&self, inputs: &[InputSlot]) -> Result<LaunchedFleet> {
        if inputs.is_empty() {
            return Err(Error::NoInputs);
        }

        let (sender, events) = event_queue();
        let mut registry = ChannelRegistry::with_capacity(inputs.len());
        let mut watchers = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.iter().enumerate() {
            match self.spawn_one(index, input, &mut registry, &sender) {
                Ok(watcher) => watchers.push(watcher),
                Err(e) => {
                    warn!(
                        "Aborting launch after {} of {} workers",
                        watchers.len(),
                        inputs.len()
                    );
                    for watcher in &watchers {
                        watcher.abort();
                    }
                    return Err(e);
                }
            }
        }

        info!("Launched {} workers", registry.len());
        Ok(LaunchedFleet {
            registry,
            events,
            watchers,
        })
    }

    fn spawn_one(
        &self,
        index: WorkerIndex,
        input: &InputSlot,
        registry: &mut ChannelRegistry,
        sender: &EventSender,
    ) -> Result<JoinHandle<()>> {
        let mut child = self
            .program
            .command_for(index, input, self.config)
            .spawn()
            .map_err(|source| Error::Spawn {
                index,
                input: input.to_string(),
                source,
            })?;

        let channel = child
            .stdout
            .take()
            .ok_or(Error::ChannelUnavailable { index })?;
        let handle = child
            .id()
            .map(WorkerHandle)
            .ok_or(Error::HandleUnavailable { index })?;

        let registered = registry.register(handle, input.clone(), channel);
        debug_assert_eq!(registered, index);
        registry.advance(index, PhaseEvent::Start)?;

        info!(index, pid = %handle, input = %input, "Spawned worker");

        let cancel_after = input.is_cancel().then_some(self.config.kill_grace);
        Ok(tokio::spawn(watch_worker(
            child,
            handle,
            cancel_after,
            sender.clone(),
        )))
    }
}

/// Wait for one child and report how it ended.
///
/// With `cancel_after`, the child is sent SIGINT if it is still running once
/// the grace period elapses. The signal always targets a child this task has
/// not reaped yet, so the pid cannot have been reused.
async fn watch_worker(
    mut child: Child,
    handle: WorkerHandle,
    cancel_after: Option<Duration>,
    events: EventSender,
) {
    let status = match cancel_after {
        Some(grace) => match tokio::time::timeout(grace, child.wait()).await {
            Ok(status) => status,
            Err(_) => {
                cancel_worker(handle);
                child.wait().await
            }
        },
        None => child.wait().await,
    };

    let disposition = match status {
        Ok(status) => ExitDisposition::from(status),
        Err(e) => ExitDisposition::Lost {
            reason: e.to_string(),
        },
    };
    debug!(pid = %handle, %disposition, "Worker exited");

    if events
        .send(ExitEvent {
            handle,
            disposition,
        })
        .is_err()
    {
        debug!(pid = %handle, "Dispatcher is gone; exit event dropped");
    }
}

fn cancel_worker(handle: WorkerHandle) {
    let pid = Pid::from_raw(handle.0 as i32);
    match signal::kill(pid, Signal::SIGINT) {
        Ok(()) => info!(pid = %handle, "Sent SIGINT to cancelled worker"),
        Err(e) => warn!(pid = %handle, "Failed to signal cancelled worker: {}", e),
    }
}
