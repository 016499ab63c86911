use super::outcome::ReapRecord;
use super::WorkerIndex;
use crate::error::{Error, Result};
use std::collections::BTreeMap;

/// Workers reaped so far in this run.
///
/// Only grows; a worker can be inserted once. The run is quiescent when
/// every launched worker has a record.
#[derive(Debug)]
pub struct CompletionSet {
    expected: usize,
    records: BTreeMap<WorkerIndex, ReapRecord>,
}

impl CompletionSet {
    pub fn new(expected: usize) -> Self {
        Self {
            expected,
            records: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, record: ReapRecord) -> Result<()> {
        let index = record.index;
        if self.records.contains_key(&index) {
            return Err(Error::DuplicateReap { index });
        }
        self.records.insert(index, record);
        Ok(())
    }

    pub fn contains(&self, index: WorkerIndex) -> bool {
        self.records.contains_key(&index)
    }

    pub fn get(&self, index: WorkerIndex) -> Option<&ReapRecord> {
        self.records.get(&index)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn is_quiescent(&self) -> bool {
        self.records.len() == self.expected
    }

    /// Records ordered by worker index.
    pub fn into_records(self) -> Vec<ReapRecord> {
        self.records.into_values().collect()
    }
}
