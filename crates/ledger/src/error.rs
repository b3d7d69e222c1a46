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

use alloy_primitives::{Address, U256};
use thiserror::Error;

use crate::entities::EntityKind;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{id} is stored as {found:?}, expected {expected:?}")]
    KindMismatch { id: String, expected: EntityKind, found: EntityKind },

    #[error("block {block} does not follow committed head {head}")]
    NotAfterHead { block: u64, head: u64 },
}

/// Errors raised while applying events to the ledger.
///
/// Most variants reject a single event: the event's writes are rolled back and the rest of the
/// block still commits. [LedgerError::is_fatal] marks the ones that abort the whole block.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("unknown slot index {0}")]
    UnknownSlot(u8),

    #[error("slot {0} has never been claimed")]
    UnclaimedSlot(u8),

    #[error("zero tax denominator for slot {0}")]
    ZeroTaxDenominator(u8),

    #[error("transfer of {value} exceeds balance {balance} of {account}")]
    InsufficientBalance { account: Address, balance: U256, value: U256 },

    #[error("active reward schedule entry {0} not found")]
    ActiveEntryMissing(String),

    #[error("pending epoch {0} not found")]
    PendingEpochMissing(String),

    #[error("start block {0} of the pending epoch not found")]
    EpochStartBlockMissing(String),

    #[error("stake oracle failed for {staker}: {source:?}")]
    Oracle {
        staker: Address,
        #[source]
        source: anyhow::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    /// Whether the error leaves the block uncommittable.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LedgerError::Oracle { .. } | LedgerError::Store(_))
    }
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("no block has been indexed yet")]
    NothingIndexed,

    #[error("block {block} has not been indexed, head is {head:?}")]
    BlockNotIndexed { block: u64, head: Option<u64> },

    #[error("no indexed block at or before timestamp {0}")]
    NoBlockAtTimestamp(u64),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Error, Debug)]
pub enum ContextError {
    #[error("unknown network {0}")]
    UnknownNetwork(String),

    #[error("failed to read context file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse context file: {0}")]
    Parse(#[from] toml::de::Error),
}
