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

//! Derived entities materialized by the ledger.
//!
//! Every entity carries a string id. Singletons use the lowercase hex address of the contract
//! that owns them, per-account entities use the account address, and append-only records use
//! the `<tx hash>-<log index>` of the event that produced them.

use std::fmt;

use alloy_primitives::{Address, B256, U256};
use serde::{Deserialize, Serialize};

use crate::fixed::Decimal4;

/// Number of entries in the staked percentile ladder.
pub const PERCENTILE_COUNT: usize = 100;

/// Number of auction slots on the network contract.
pub const SLOT_COUNT: usize = 3;

/// Lowercase `0x` hex id for an address.
pub fn address_id(address: Address) -> String {
    format!("{address:#x}")
}

/// Implemented by every entity the store can hold.
pub trait Entity: Clone {
    const KIND: EntityKind;

    fn id(&self) -> &str;

    fn into_record(self) -> Record;

    fn from_record(record: Record) -> Option<Self>;
}

macro_rules! entity_kinds {
    ($($kind:ident),+ $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub enum EntityKind {
            $($kind),+
        }

        impl EntityKind {
            pub const ALL: &'static [EntityKind] = &[$(EntityKind::$kind),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(EntityKind::$kind => stringify!($kind)),+
                }
            }
        }

        /// A single stored version of any entity.
        #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
        #[serde(tag = "kind", content = "data")]
        pub enum Record {
            $($kind($kind)),+
        }

        impl Record {
            pub fn kind(&self) -> EntityKind {
                match self {
                    $(Record::$kind(_) => EntityKind::$kind),+
                }
            }

            pub fn id(&self) -> &str {
                match self {
                    $(Record::$kind(entity) => &entity.id),+
                }
            }
        }

        $(
            impl Entity for $kind {
                const KIND: EntityKind = EntityKind::$kind;

                fn id(&self) -> &str {
                    &self.id
                }

                fn into_record(self) -> Record {
                    Record::$kind(self)
                }

                #[allow(unreachable_patterns)]
                fn from_record(record: Record) -> Option<Self> {
                    match record {
                        Record::$kind(entity) => Some(entity),
                        _ => None,
                    }
                }
            }
        )+
    };
}

entity_kinds!(
    Staker,
    Network,
    Slot,
    SlotClaim,
    Producer,
    ProducerSet,
    ProducerSetChange,
    ProducerRewardCollectorChange,
    RewardSchedule,
    RewardScheduleEntry,
    Epoch,
    ProducerEpoch,
    Block,
    Distributor,
    Distribution,
    Claim,
    Slash,
    Account,
    Token,
    Balance,
);

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stake held by a single account on the network contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Staker {
    pub id: String,
    /// Raw staked amount in wei.
    pub staked: U256,
    /// `staked` passed through the dampening curve.
    pub normalized_staked: U256,
    /// Block-weighted sum of `normalized_staked` up to `cumulative_normalized_staked_last_block`.
    pub cumulative_normalized_staked: U256,
    pub cumulative_normalized_staked_last_block: u64,
    /// Insertion order, assigned once.
    pub index: u64,
    /// Position in the stake ranking, absent while nothing is staked.
    pub rank: Option<u64>,
}

impl Staker {
    pub fn new(id: String, index: u64) -> Self {
        Self {
            id,
            staked: U256::ZERO,
            normalized_staked: U256::ZERO,
            cumulative_normalized_staked: U256::ZERO,
            cumulative_normalized_staked_last_block: 0,
            index,
            rank: None,
        }
    }
}

/// Global aggregate of the network contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Network {
    pub id: String,
    pub total_staked: U256,
    pub total_normalized_staked: U256,
    pub total_cumulative_normalized_staked: U256,
    pub total_cumulative_normalized_staked_last_block: u64,
    /// Stakers with a nonzero stake.
    pub num_stakers: u64,
    /// Every staker ever materialized, including those now at zero.
    pub staker_count: u64,
    /// Staker ids in index order.
    pub stakers: Vec<String>,
    pub staked_percentiles: Vec<U256>,
    pub slots: [Option<String>; SLOT_COUNT],
}

impl Network {
    pub fn new(id: String) -> Self {
        Self {
            id,
            total_staked: U256::ZERO,
            total_normalized_staked: U256::ZERO,
            total_cumulative_normalized_staked: U256::ZERO,
            total_cumulative_normalized_staked_last_block: 0,
            num_stakers: 0,
            staker_count: 0,
            stakers: Vec::new(),
            staked_percentiles: vec![U256::ZERO; PERCENTILE_COUNT],
            slots: Default::default(),
        }
    }
}

/// Current holder of an auctioned slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub index: u8,
    pub owner: Address,
    pub delegate: Address,
    pub winning_bid: U256,
    pub old_bid: U256,
    pub start_time: u64,
    pub expiration_time: u64,
    pub tax_rate_per_day: Decimal4,
    pub num_claims: u64,
}

/// One claim in a slot's history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotClaim {
    pub id: String,
    pub slot: String,
    /// Position in the slot's claim history.
    pub index: u64,
    pub owner: Address,
    pub winning_bid: U256,
    pub old_bid: U256,
    pub start_time: u64,
    pub expiration_time: u64,
    pub tax_rate_per_day: Decimal4,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Producer {
    pub id: String,
    pub active: bool,
    pub reward_collector: Option<Address>,
    /// Cumulative rewards settled at epoch close.
    pub rewards: U256,
    pub confirmed_blocks: u64,
    pub pending_epoch_blocks: u64,
}

impl Producer {
    pub fn new(id: String) -> Self {
        Self {
            id,
            active: false,
            reward_collector: None,
            rewards: U256::ZERO,
            confirmed_blocks: 0,
            pending_epoch_blocks: 0,
        }
    }
}

/// Every producer ever seen. Only grows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerSet {
    pub id: String,
    pub producers: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProducerSetChangeType {
    Added,
    Removed,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerSetChange {
    pub id: String,
    pub block_number: u64,
    pub producer: String,
    pub change_type: ProducerSetChangeType,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerRewardCollectorChange {
    pub id: String,
    pub block_number: u64,
    pub producer: String,
    pub reward_collector: Address,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSchedule {
    pub id: String,
    /// Entry ids, ascending by start time.
    pub entries: Vec<String>,
    pub active_entry: Option<String>,
    pub pending_epoch: Option<String>,
    pub last_epoch: Option<String>,
}

impl RewardSchedule {
    pub fn new(id: String) -> Self {
        Self { id, entries: Vec::new(), active_entry: None, pending_epoch: None, last_epoch: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardScheduleEntry {
    pub id: String,
    pub start_time: u64,
    pub epoch_duration: u64,
    pub rewards_per_epoch: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Epoch {
    pub id: String,
    pub epoch_number: u64,
    pub start_block: Option<String>,
    pub end_block: Option<String>,
    pub producer_blocks: u64,
    pub all_blocks: u64,
    pub producer_blocks_ratio: Decimal4,
    pub finalized: bool,
    /// Producer epoch ids, filled in when the epoch closes.
    pub producer_rewards: Vec<String>,
}

impl Epoch {
    pub fn new(id: String, epoch_number: u64) -> Self {
        Self {
            id,
            epoch_number,
            start_block: None,
            end_block: None,
            producer_blocks: 0,
            all_blocks: 0,
            producer_blocks_ratio: Decimal4::ZERO,
            finalized: false,
            producer_rewards: Vec::new(),
        }
    }
}

/// A producer's share of a finalized epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProducerEpoch {
    pub id: String,
    pub address: String,
    pub epoch: String,
    pub blocks_produced: u64,
    pub blocks_produced_ratio: Decimal4,
    /// The producer's cumulative rewards after this epoch.
    pub total_rewards: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub id: String,
    pub hash: B256,
    pub parent_hash: B256,
    pub number: u64,
    pub timestamp: u64,
    pub author: Address,
    pub from_active_producer: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distributor {
    pub id: String,
    pub debt_total: U256,
    pub current_distribution: Option<String>,
}

impl Distributor {
    pub fn new(id: String) -> Self {
        Self { id, debt_total: U256::ZERO, current_distribution: None }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub id: String,
    pub distributor: String,
    pub distribution_number: U256,
    pub merkle_root: B256,
    pub metadata_uri: String,
    pub timestamp: u64,
    pub token_total: U256,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claim {
    pub id: String,
    pub index: U256,
    pub account: String,
    pub total_earned: U256,
    pub claimed: U256,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slash {
    pub id: String,
    pub account: String,
    pub slashed: U256,
    pub timestamp: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: String,
    pub total_claimed: U256,
    pub total_slashed: U256,
}

impl Account {
    pub fn new(id: String) -> Self {
        Self { id, total_claimed: U256::ZERO, total_slashed: U256::ZERO }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    pub id: String,
    pub total_supply: U256,
    pub circulating_supply: U256,
    pub num_holders: u64,
    pub num_transfers: u64,
    pub num_balances: u64,
}

impl Token {
    pub fn new(id: String) -> Self {
        Self {
            id,
            total_supply: U256::ZERO,
            circulating_supply: U256::ZERO,
            num_holders: 0,
            num_transfers: 0,
            num_balances: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Balance {
    pub id: String,
    pub account: Address,
    pub balance: U256,
    /// Insertion order, used for chunked listings.
    pub index: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::ProducerRewardCollectorChange.to_string(), "ProducerRewardCollectorChange");
        assert_eq!(EntityKind::Staker.to_string(), "Staker");
    }

    #[test]
    fn test_record_is_tagged_with_kind() {
        let record = Account::new("0xabc".into()).into_record();
        assert_eq!(record.kind(), EntityKind::Account);
        assert_eq!(record.id(), "0xabc");
        assert!(Staker::from_record(record.clone()).is_none());
        assert_eq!(Account::from_record(record).unwrap().id, "0xabc");
    }

    #[test]
    fn test_new_network_has_full_ladder() {
        let network = Network::new("0x1".into());
        assert_eq!(network.staked_percentiles.len(), PERCENTILE_COUNT);
        assert!(network.slots.iter().all(Option::is_none));
    }
}
