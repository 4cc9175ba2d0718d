//! Record store
//!
//! The store owns the canonical copy of every record. `save` copies in,
//! `find` and `search` copy out, so no caller ever holds a value that
//! aliases store state.
//!
//! ## Locking
//!
//! A single reader/writer lock guards the map. `search` holds the read lock
//! for the whole iteration, including the time its callback spends
//! delivering each match. Concurrent searches proceed together; a `save`
//! waits until every in-flight search has finished. Under sustained search
//! load writers can wait a long time.

use super::filter::is_qualified;
use super::StoreError;
use crate::context::CallContext;
use crate::grpc::{Filter, Record};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::debug;

pub trait RecordStore: Send + Sync {
    /// Store a copy of `record`; fails if its id is already taken
    fn save(&self, record: &Record) -> Result<(), StoreError>;

    /// Copy of the record with `id`, if any
    fn find(&self, id: &str) -> Option<Record>;

    /// Feed a copy of every record matching `filter` to `found`
    ///
    /// Liveness of `ctx` is checked before each record. Iteration stops at
    /// the first error from `ctx` or `found`, which is returned.
    fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        found: &mut dyn FnMut(Record) -> Result<(), StoreError>,
    ) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<String, Record>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn save(&self, record: &Record) -> Result<(), StoreError> {
        let mut records = self.records.write();
        if records.contains_key(&record.id) {
            return Err(StoreError::RecordExists(record.id.clone()));
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    fn find(&self, id: &str) -> Option<Record> {
        self.records.read().get(id).cloned()
    }

    fn search(
        &self,
        ctx: &CallContext,
        filter: &Filter,
        found: &mut dyn FnMut(Record) -> Result<(), StoreError>,
    ) -> Result<(), StoreError> {
        let records = self.records.read();

        for record in records.values() {
            ctx.check()?;

            if is_qualified(filter, record) {
                debug!(record_id = %record.id, "record matches filter");
                found(record.clone())?;
            }
        }

        Ok(())
    }
}
