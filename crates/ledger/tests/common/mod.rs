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

#![allow(dead_code)]

use std::collections::HashMap;

use alloy_primitives::{Address, B256, U256};
use eden_ledger::{BlockBundle, BlockHeader, EventLog, LedgerEvent};

/// Timestamp of block 0 in test chains.
pub const GENESIS_TIME: u64 = 1_700_000_000;
pub const BLOCK_TIME: u64 = 12;

pub fn header(number: u64, author: Address) -> BlockHeader {
    BlockHeader {
        hash: B256::left_padding_from(&number.to_be_bytes()),
        parent_hash: B256::left_padding_from(&number.saturating_sub(1).to_be_bytes()),
        number,
        timestamp: GENESIS_TIME + number * BLOCK_TIME,
        author,
    }
}

/// Builds a block bundle with sequentially indexed logs.
pub struct BundleBuilder {
    header: BlockHeader,
    events: Vec<EventLog>,
}

impl BundleBuilder {
    pub fn new(number: u64, author: Address) -> Self {
        Self { header: header(number, author), events: Vec::new() }
    }

    pub fn event(mut self, event: LedgerEvent) -> Self {
        let log_index = self.events.len() as u64;
        let mut tx_hash = self.header.hash;
        tx_hash.0[0] = 0xee;
        self.events.push(EventLog { tx_hash, log_index, event });
        self
    }

    pub fn build(self) -> BlockBundle {
        BlockBundle { header: self.header, events: self.events }
    }
}

pub fn balances(entries: &[(Address, U256)]) -> HashMap<Address, U256> {
    entries.iter().copied().collect()
}
