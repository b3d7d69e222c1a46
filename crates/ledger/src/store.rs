// Copyright 2026 Boundless Foundation, Inc.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Versioned entity storage.
//!
//! [MemoryStore] keeps every committed version of every entity, keyed by the block that wrote
//! it, so any committed block can be read back as a [Snapshot]. Writes for the block being
//! processed are staged in a [BlockTransaction] and only become visible once its [Changeset]
//! is committed.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{
    entities::{Entity, EntityKind, Record},
    error::StoreError,
};

/// Read access to entities by kind and id.
pub trait EntityReader {
    fn get(&self, kind: EntityKind, id: &str) -> Option<Record>;

    /// All entities of a kind, ordered by id.
    fn scan(&self, kind: EntityKind) -> Vec<Record>;
}

/// Write access on top of [EntityReader].
pub trait EntityStore: EntityReader {
    fn put(&mut self, record: Record);
}

/// Typed helpers over [EntityReader].
pub trait EntityReaderExt: EntityReader {
    fn load<E: Entity>(&self, id: &str) -> Result<Option<E>, StoreError> {
        let Some(record) = self.get(E::KIND, id) else {
            return Ok(None);
        };
        let found = record.kind();
        E::from_record(record).map(Some).ok_or_else(|| StoreError::KindMismatch {
            id: id.to_string(),
            expected: E::KIND,
            found,
        })
    }

    fn load_all<E: Entity>(&self) -> Result<Vec<E>, StoreError> {
        self.scan(E::KIND)
            .into_iter()
            .map(|record| {
                let found = record.kind();
                let id = record.id().to_string();
                E::from_record(record).ok_or(StoreError::KindMismatch {
                    id,
                    expected: E::KIND,
                    found,
                })
            })
            .collect()
    }
}

impl<T: EntityReader + ?Sized> EntityReaderExt for T {}

/// Typed helpers over [EntityStore].
pub trait EntityStoreExt: EntityStore {
    fn save<E: Entity>(&mut self, entity: E) {
        self.put(entity.into_record());
    }
}

impl<T: EntityStore + ?Sized> EntityStoreExt for T {}

/// Entity versions written by a single block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Changeset {
    pub block: u64,
    pub timestamp: u64,
    pub writes: Vec<Record>,
}

type Versions = BTreeMap<u64, Record>;

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entities: HashMap<EntityKind, BTreeMap<String, Versions>>,
    /// `(block number, timestamp)` of every committed block, ascending.
    timeline: Vec<(u64, u64)>,
    head: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last committed block.
    pub fn head(&self) -> Option<u64> {
        self.head
    }

    /// Whether `block` has already been committed.
    pub fn is_committed(&self, block: u64) -> bool {
        self.head.is_some_and(|head| block <= head)
    }

    /// Stage writes for `block` on top of the current head.
    pub fn begin(&self, block: u64, timestamp: u64) -> Result<BlockTransaction<'_>, StoreError> {
        if let Some(head) = self.head.filter(|head| block <= *head) {
            return Err(StoreError::NotAfterHead { block, head });
        }
        Ok(BlockTransaction {
            base: self,
            block,
            timestamp,
            staged: BTreeMap::new(),
            journal: Vec::new(),
        })
    }

    /// Make every write of `changeset` visible at its block.
    pub fn commit(&mut self, changeset: Changeset) -> Result<(), StoreError> {
        let Changeset { block, timestamp, writes } = changeset;
        if let Some(head) = self.head.filter(|head| block <= *head) {
            return Err(StoreError::NotAfterHead { block, head });
        }
        for record in writes {
            self.entities
                .entry(record.kind())
                .or_default()
                .entry(record.id().to_string())
                .or_default()
                .insert(block, record);
        }
        self.timeline.push((block, timestamp));
        self.head = Some(block);
        Ok(())
    }

    /// Committed state as of the end of `block`.
    pub fn at(&self, block: u64) -> Snapshot<'_> {
        Snapshot { store: self, block }
    }

    /// Latest committed block whose timestamp is at or before `timestamp`.
    pub fn block_at_or_before(&self, timestamp: u64) -> Option<u64> {
        let idx = self.timeline.partition_point(|(_, ts)| *ts <= timestamp);
        idx.checked_sub(1).map(|i| self.timeline[i].0)
    }

    fn version_at(&self, kind: EntityKind, id: &str, block: u64) -> Option<&Record> {
        self.entities.get(&kind)?.get(id)?.range(..=block).next_back().map(|(_, record)| record)
    }

    fn scan_at(&self, kind: EntityKind, block: u64) -> Vec<Record> {
        let Some(by_id) = self.entities.get(&kind) else {
            return Vec::new();
        };
        by_id
            .values()
            .filter_map(|versions| versions.range(..=block).next_back())
            .map(|(_, record)| record.clone())
            .collect()
    }
}

/// Reads resolve against the head.
impl EntityReader for MemoryStore {
    fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.version_at(kind, id, u64::MAX).cloned()
    }

    fn scan(&self, kind: EntityKind) -> Vec<Record> {
        self.scan_at(kind, u64::MAX)
    }
}

/// Read-only view of committed state at a block.
#[derive(Clone, Copy)]
pub struct Snapshot<'a> {
    store: &'a MemoryStore,
    block: u64,
}

impl Snapshot<'_> {
    pub fn block(&self) -> u64 {
        self.block
    }
}

impl EntityReader for Snapshot<'_> {
    fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.store.version_at(kind, id, self.block).cloned()
    }

    fn scan(&self, kind: EntityKind) -> Vec<Record> {
        self.store.scan_at(kind, self.block)
    }
}

type StageKey = (EntityKind, String);

/// Restore point inside a [BlockTransaction]: the journal length when it was taken.
#[derive(Clone, Copy, Debug)]
pub struct Savepoint(usize);

/// Writes of the block being processed, layered over the committed head.
pub struct BlockTransaction<'a> {
    base: &'a MemoryStore,
    block: u64,
    timestamp: u64,
    staged: BTreeMap<StageKey, Record>,
    /// Staged value each write replaced, in write order.
    journal: Vec<(StageKey, Option<Record>)>,
}

impl BlockTransaction<'_> {
    pub fn block(&self) -> u64 {
        self.block
    }

    pub fn savepoint(&self) -> Savepoint {
        Savepoint(self.journal.len())
    }

    /// Discard everything staged since `savepoint`.
    pub fn rollback(&mut self, savepoint: Savepoint) {
        while self.journal.len() > savepoint.0 {
            let Some((key, previous)) = self.journal.pop() else {
                break;
            };
            match previous {
                Some(record) => self.staged.insert(key, record),
                None => self.staged.remove(&key),
            };
        }
    }

    pub fn into_changeset(self) -> Changeset {
        Changeset {
            block: self.block,
            timestamp: self.timestamp,
            writes: self.staged.into_values().collect(),
        }
    }
}

impl EntityReader for BlockTransaction<'_> {
    fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        match self.staged.get(&(kind, id.to_string())) {
            Some(record) => Some(record.clone()),
            None => self.base.get(kind, id),
        }
    }

    fn scan(&self, kind: EntityKind) -> Vec<Record> {
        let mut merged: BTreeMap<String, Record> = self
            .base
            .scan(kind)
            .into_iter()
            .map(|record| (record.id().to_string(), record))
            .collect();
        for ((staged_kind, id), record) in &self.staged {
            if *staged_kind == kind {
                merged.insert(id.clone(), record.clone());
            }
        }
        merged.into_values().collect()
    }
}

impl EntityStore for BlockTransaction<'_> {
    fn put(&mut self, record: Record) {
        let key = (record.kind(), record.id().to_string());
        let previous = self.staged.insert(key.clone(), record);
        self.journal.push((key, previous));
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;
    use crate::entities::Account;

    fn account(id: &str, claimed: u64) -> Account {
        Account { id: id.into(), total_claimed: U256::from(claimed), total_slashed: U256::ZERO }
    }

    fn commit(store: &mut MemoryStore, block: u64, accounts: &[Account]) {
        let mut tx = store.begin(block, block * 12).unwrap();
        for acc in accounts {
            tx.save(acc.clone());
        }
        let changeset = tx.into_changeset();
        store.commit(changeset).unwrap();
    }

    #[test]
    fn test_snapshot_reads_version_at_block() {
        let mut store = MemoryStore::new();
        commit(&mut store, 10, &[account("a", 1)]);
        commit(&mut store, 20, &[account("a", 2), account("b", 5)]);

        let at_10 = store.at(10);
        assert_eq!(at_10.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(1));
        assert!(at_10.load::<Account>("b").unwrap().is_none());
        assert_eq!(store.at(15).load_all::<Account>().unwrap().len(), 1);
        assert_eq!(store.at(20).load_all::<Account>().unwrap().len(), 2);
        assert_eq!(store.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(2));
        assert!(store.at(9).load::<Account>("a").unwrap().is_none());
    }

    #[test]
    fn test_staged_writes_are_invisible_until_commit() {
        let mut store = MemoryStore::new();
        commit(&mut store, 1, &[account("a", 1)]);

        let mut tx = store.begin(2, 24).unwrap();
        tx.save(account("a", 9));
        assert_eq!(tx.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(9));
        assert_eq!(store.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(1));
        drop(tx);

        assert_eq!(store.head(), Some(1));
        assert_eq!(store.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(1));
    }

    #[test]
    fn test_rollback_to_savepoint() {
        let store = MemoryStore::new();
        let mut tx = store.begin(1, 12).unwrap();
        tx.save(account("a", 1));
        let savepoint = tx.savepoint();
        tx.save(account("a", 2));
        tx.save(account("b", 3));
        tx.rollback(savepoint);

        assert_eq!(tx.scan(EntityKind::Account).len(), 1);
        assert_eq!(tx.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(1));
    }

    #[test]
    fn test_nested_savepoints_unwind_in_order() {
        let store = MemoryStore::new();
        let mut tx = store.begin(1, 12).unwrap();
        tx.save(account("a", 1));
        let outer = tx.savepoint();
        tx.save(account("a", 2));
        let inner = tx.savepoint();
        tx.save(account("a", 3));
        tx.save(account("b", 4));

        tx.rollback(inner);
        assert_eq!(tx.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(2));
        assert!(tx.load::<Account>("b").unwrap().is_none());

        tx.save(account("c", 5));
        tx.rollback(outer);
        assert_eq!(tx.load::<Account>("a").unwrap().unwrap().total_claimed, U256::from(1));
        assert!(tx.load::<Account>("c").unwrap().is_none());

        let changeset = tx.into_changeset();
        assert_eq!(changeset.writes, vec![account("a", 1).into_record()]);
    }

    #[test]
    fn test_rejects_blocks_at_or_below_head() {
        let mut store = MemoryStore::new();
        commit(&mut store, 5, &[account("a", 1)]);
        assert!(matches!(store.begin(5, 60), Err(StoreError::NotAfterHead { block: 5, head: 5 })));
        let stale = Changeset { block: 4, timestamp: 48, writes: vec![] };
        assert!(store.commit(stale).is_err());
        assert!(store.is_committed(5));
        assert!(!store.is_committed(6));
    }

    #[test]
    fn test_block_at_or_before_timestamp() {
        let mut store = MemoryStore::new();
        commit(&mut store, 10, &[]);
        commit(&mut store, 11, &[]);
        commit(&mut store, 13, &[]);

        assert_eq!(store.block_at_or_before(119), None);
        assert_eq!(store.block_at_or_before(120), Some(10));
        assert_eq!(store.block_at_or_before(140), Some(11));
        assert_eq!(store.block_at_or_before(10_000), Some(13));
    }
}
