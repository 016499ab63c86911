//! Channel registry
//!
//! Parent-side table built once at launch. Slot `i` holds worker `i`'s
//! handle, input, lifecycle phase and the read end of its channel. A handle
//! index resolves completions in whatever order they arrive.

use super::events::WorkerHandle;
use super::input::InputSlot;
use super::phase::{self, PhaseError, PhaseEvent, WorkerPhase};
use super::WorkerIndex;
use std::collections::HashMap;
use tokio::process::ChildStdout;

#[derive(Debug)]
pub struct WorkerSlot<C> {
    pub index: WorkerIndex,
    pub handle: WorkerHandle,
    pub input: InputSlot,
    phase: WorkerPhase,
    channel: Option<C>,
}

impl<C> WorkerSlot<C> {
    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    /// Whether the read end is still held by the registry.
    pub fn has_channel(&self) -> bool {
        self.channel.is_some()
    }
}

#[derive(Debug)]
pub struct ChannelRegistry<C = ChildStdout> {
    slots: Vec<WorkerSlot<C>>,
    by_handle: HashMap<WorkerHandle, WorkerIndex>,
}

impl<C> Default for ChannelRegistry<C> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            by_handle: HashMap::new(),
        }
    }
}

impl<C> ChannelRegistry<C> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            by_handle: HashMap::with_capacity(capacity),
        }
    }

    /// Record a freshly spawned worker and return its index.
    ///
    /// Indices are handed out in registration order, so registering in input
    /// order keeps `WorkerIndex` equal to the input position.
    pub fn register(&mut self, handle: WorkerHandle, input: InputSlot, channel: C) -> WorkerIndex {
        let index = self.slots.len();
        self.slots.push(WorkerSlot {
            index,
            handle,
            input,
            phase: WorkerPhase::Spawned,
            channel: Some(channel),
        });
        self.by_handle.insert(handle, index);
        index
    }

    pub fn resolve(&self, handle: WorkerHandle) -> Option<WorkerIndex> {
        self.by_handle.get(&handle).copied()
    }

    pub fn slot(&self, index: WorkerIndex) -> Option<&WorkerSlot<C>> {
        self.slots.get(index)
    }

    /// Hand the read end to the caller. Returns `None` once taken.
    pub fn take_channel(&mut self, index: WorkerIndex) -> Option<C> {
        self.slots.get_mut(index).and_then(|slot| slot.channel.take())
    }

    /// Drop the read end without reading from it.
    pub fn close_channel(&mut self, index: WorkerIndex) {
        drop(self.take_channel(index));
    }

    pub fn advance(
        &mut self,
        index: WorkerIndex,
        event: PhaseEvent,
    ) -> Result<WorkerPhase, PhaseError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(PhaseError::UnknownWorker { index })?;
        slot.phase = phase::advance(index, slot.phase, event)?;
        Ok(slot.phase)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> impl Iterator<Item = &WorkerSlot<C>> {
        self.slots.iter()
    }

    /// Workers that have not reached `Reaped` yet.
    pub fn outstanding(&self) -> impl Iterator<Item = &WorkerSlot<C>> {
        self.slots.iter().filter(|slot| !slot.phase.is_terminal())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn registry_of(pids: &[u32]) -> ChannelRegistry<&'static str> {
        let mut registry = ChannelRegistry::new();
        for (i, &pid) in pids.iter().enumerate() {
            let input = InputSlot::File(PathBuf::from(format!("in{i}.txt")));
            registry.register(WorkerHandle(pid), input, "channel");
        }
        registry
    }

    #[test]
    fn test_indices_follow_registration_order() {
        let registry = registry_of(&[400, 100, 300]);

        let indices: Vec<_> = registry.slots().map(|slot| slot.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
        assert_eq!(
            registry.slot(2).unwrap().input,
            InputSlot::File(PathBuf::from("in2.txt"))
        );
    }

    #[test]
    fn test_resolve_in_any_order() {
        let registry = registry_of(&[400, 100, 300]);

        assert_eq!(registry.resolve(WorkerHandle(300)), Some(2));
        assert_eq!(registry.resolve(WorkerHandle(400)), Some(0));
        assert_eq!(registry.resolve(WorkerHandle(100)), Some(1));
        assert_eq!(registry.resolve(WorkerHandle(999)), None);
    }

    #[test]
    fn test_channel_is_taken_once() {
        let mut registry = registry_of(&[10, 11]);

        assert_eq!(registry.take_channel(1), Some("channel"));
        assert_eq!(registry.take_channel(1), None);
        assert!(registry.slot(0).unwrap().has_channel());

        registry.close_channel(0);
        assert!(!registry.slot(0).unwrap().has_channel());
        assert_eq!(registry.take_channel(7), None);
    }

    #[test]
    fn test_outstanding_shrinks_as_workers_are_reaped() {
        let mut registry = registry_of(&[10, 11]);
        for index in 0..2 {
            registry.advance(index, PhaseEvent::Start).unwrap();
        }
        assert_eq!(registry.outstanding().count(), 2);

        registry.advance(1, PhaseEvent::Fail).unwrap();
        registry.advance(1, PhaseEvent::Reap).unwrap();

        let outstanding: Vec<_> = registry.outstanding().map(|slot| slot.index).collect();
        assert_eq!(outstanding, vec![0]);
        assert!(registry.advance(1, PhaseEvent::Reap).is_err());
    }
}
