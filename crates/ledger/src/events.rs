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

//! Decoded contract events and block headers, as delivered by ingestion.

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub hash: B256,
    pub parent_hash: B256,
    pub number: u64,
    pub timestamp: u64,
    pub author: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardScheduleEntryParams {
    pub start_time: u64,
    pub epoch_duration: u64,
    pub rewards_per_epoch: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LedgerEvent {
    /// Stake deposited. The new balance comes from the stake oracle.
    Stake { staker: Address },
    /// Stake withdrawn. The new balance comes from the stake oracle.
    Unstake { staker: Address },
    BlockProducerAdded { producer: Address },
    BlockProducerRemoved { producer: Address },
    BlockProducerRewardCollectorChanged { producer: Address, collector: Address },
    RewardScheduleChanged { entries: Vec<RewardScheduleEntryParams> },
    SlotClaimed {
        slot: u8,
        owner: Address,
        delegate: Address,
        new_bid: U256,
        old_bid: U256,
        tax_numerator: u32,
        tax_denominator: u32,
        expiration_time: u64,
    },
    SlotDelegateUpdated { slot: u8, new_delegate: Address },
    Transfer { from: Address, to: Address, value: U256 },
    MerkleRootUpdated {
        distribution_number: U256,
        merkle_root: B256,
        metadata_uri: String,
        token_total: U256,
    },
    Claimed { index: U256, account: Address, total_earned: U256, claimed: U256 },
    Slashed { account: Address, slashed: U256 },
    AccountUpdated { account: Address, total_claimed: U256, total_slashed: U256 },
    DebtChanged { new_debt: U256 },
}

impl LedgerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            LedgerEvent::Stake { .. } => "Stake",
            LedgerEvent::Unstake { .. } => "Unstake",
            LedgerEvent::BlockProducerAdded { .. } => "BlockProducerAdded",
            LedgerEvent::BlockProducerRemoved { .. } => "BlockProducerRemoved",
            LedgerEvent::BlockProducerRewardCollectorChanged { .. } => {
                "BlockProducerRewardCollectorChanged"
            }
            LedgerEvent::RewardScheduleChanged { .. } => "RewardScheduleChanged",
            LedgerEvent::SlotClaimed { .. } => "SlotClaimed",
            LedgerEvent::SlotDelegateUpdated { .. } => "SlotDelegateUpdated",
            LedgerEvent::Transfer { .. } => "Transfer",
            LedgerEvent::MerkleRootUpdated { .. } => "MerkleRootUpdated",
            LedgerEvent::Claimed { .. } => "Claimed",
            LedgerEvent::Slashed { .. } => "Slashed",
            LedgerEvent::AccountUpdated { .. } => "AccountUpdated",
            LedgerEvent::DebtChanged { .. } => "DebtChanged",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventLog {
    pub tx_hash: B256,
    pub log_index: u64,
    pub event: LedgerEvent,
}

impl EventLog {
    /// Id of append-only records produced by this log.
    pub fn record_id(&self) -> String {
        format!("{:#x}-{}", self.tx_hash, self.log_index)
    }
}

/// A block header with its events in log order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockBundle {
    pub header: BlockHeader,
    pub events: Vec<EventLog>,
}

impl BlockBundle {
    /// Accounts whose stake balance must be resolved before the block is applied.
    pub fn stake_accounts(&self) -> Vec<Address> {
        let mut accounts: Vec<Address> = self
            .events
            .iter()
            .filter_map(|log| match log.event {
                LedgerEvent::Stake { staker } | LedgerEvent::Unstake { staker } => Some(staker),
                _ => None,
            })
            .collect();
        accounts.sort();
        accounts.dedup();
        accounts
    }
}
