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
use async_trait::async_trait;
use eden_ledger::BlockBundle;

/// Chain data the indexer follows.
#[async_trait]
pub trait BlockSource: Send + Sync {
    /// Number of the newest block available.
    async fn latest_block(&self) -> anyhow::Result<u64>;

    /// Header and decoded ledger events of a block, in log order.
    async fn block_bundle(&self, number: u64) -> anyhow::Result<BlockBundle>;
}

/// Authoritative staked balances, read from the network contract.
#[async_trait]
pub trait StakeBalanceSource: Send + Sync {
    async fn staked_balance(&self, staker: Address, block_number: u64) -> anyhow::Result<U256>;
}
