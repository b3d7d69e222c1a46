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

//! Point-in-time reads over committed ledger state.
//!
//! Every read is evaluated against a [Snapshot] of the store at a block chosen with a
//! [BlockSelector]. Missing entities come back as `None`; errors are reserved for selectors that
//! cannot be resolved against the committed history.

use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::{
    context::LedgerContext,
    entities::{
        address_id, Account, Balance, Block, Claim, Distribution, Distributor, Entity, Epoch,
        Network, Producer, ProducerEpoch, ProducerRewardCollectorChange, ProducerSet,
        ProducerSetChange, RewardSchedule, RewardScheduleEntry, Slash, Slot, SlotClaim, Staker,
        Token, SLOT_COUNT,
    },
    error::QueryError,
    governance::epoch_id,
    network::slot_id,
    staking::{cumulative_normalized_stake, total_cumulative_normalized_stake},
    store::{EntityReaderExt, MemoryStore, Snapshot},
};

/// Largest unix timestamp still read as seconds; anything longer is milliseconds.
const MAX_SECONDS_TIMESTAMP: u64 = 9_999_999_999;

/// Which committed block a query reads.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockSelector {
    /// The committed head.
    Latest,
    Number(u64),
    /// The latest block with a timestamp at or before this one, in seconds.
    Timestamp(u64),
}

impl BlockSelector {
    /// Timestamp selector from a unix timestamp in seconds or milliseconds.
    pub fn from_unix_timestamp(timestamp: u64) -> Self {
        if timestamp > MAX_SECONDS_TIMESTAMP {
            BlockSelector::Timestamp(timestamp / 1000)
        } else {
            BlockSelector::Timestamp(timestamp)
        }
    }
}

/// Inclusive index ranges covering `total` items in pages of `page_size`.
pub fn chunk_boundaries(total: u64, page_size: u64) -> Vec<(u64, u64)> {
    if total == 0 || page_size == 0 {
        return Vec::new();
    }
    let chunks = total.div_ceil(page_size);
    let last_amount = total % page_size;
    (0..chunks)
        .map(|chunk| {
            let start = chunk * page_size;
            let len = if chunk == chunks - 1 && last_amount != 0 { last_amount } else { page_size };
            (start, start + len - 1)
        })
        .collect()
}

/// The slice of index-sorted `items` whose index falls in `start..=end`.
fn index_range<E>(items: &[E], start: u64, end: u64, index_of: impl Fn(&E) -> u64) -> &[E] {
    let lo = items.partition_point(|item| index_of(item) < start);
    let hi = items.partition_point(|item| index_of(item) <= end);
    &items[lo..hi.max(lo)]
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeStats {
    pub num_stakers: u64,
    pub total_staked: U256,
    pub total_normalized_staked: U256,
    pub staked_percentiles: Option<Vec<U256>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardScheduleView {
    pub entries: Vec<RewardScheduleEntry>,
    pub active_entry: Option<RewardScheduleEntry>,
    pub pending_epoch: Option<Epoch>,
    pub last_epoch: Option<Epoch>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochView {
    pub epoch: Epoch,
    pub producer_rewards: Vec<ProducerEpoch>,
}

/// Read-only queries over a committed store.
pub struct HistoricalQuery<'a> {
    store: &'a MemoryStore,
    context: &'a LedgerContext,
}

impl<'a> HistoricalQuery<'a> {
    pub fn new(store: &'a MemoryStore, context: &'a LedgerContext) -> Self {
        Self { store, context }
    }

    /// Block number a selector reads from.
    pub fn resolve(&self, selector: BlockSelector) -> Result<u64, QueryError> {
        let head = self.store.head();
        match selector {
            BlockSelector::Latest => head.ok_or(QueryError::NothingIndexed),
            BlockSelector::Number(block) => match head {
                Some(head) if block <= head => Ok(block),
                _ => Err(QueryError::BlockNotIndexed { block, head }),
            },
            BlockSelector::Timestamp(timestamp) => self
                .store
                .block_at_or_before(timestamp)
                .ok_or(QueryError::NoBlockAtTimestamp(timestamp)),
        }
    }

    fn snapshot(&self, selector: BlockSelector) -> Result<Snapshot<'a>, QueryError> {
        Ok(self.store.at(self.resolve(selector)?))
    }

    fn load<E: Entity>(&self, id: &str, selector: BlockSelector) -> Result<Option<E>, QueryError> {
        Ok(self.snapshot(selector)?.load::<E>(id)?)
    }

    fn load_all<E: Entity>(&self, selector: BlockSelector) -> Result<Vec<E>, QueryError> {
        Ok(self.snapshot(selector)?.load_all::<E>()?)
    }

    /// Items with an insertion index below `total`, fetched page by page.
    fn chunked<E: Entity>(
        &self,
        mut items: Vec<E>,
        total: u64,
        index_of: impl Fn(&E) -> u64 + Copy,
    ) -> Vec<E> {
        items.sort_by_key(|item| index_of(item));
        let mut out = Vec::with_capacity(items.len());
        for (start, end) in chunk_boundaries(total, self.context.page_size) {
            out.extend_from_slice(index_range(&items, start, end, index_of));
        }
        out
    }

    pub fn network(&self, selector: BlockSelector) -> Result<Option<Network>, QueryError> {
        self.load(&self.context.network_id(), selector)
    }

    pub fn stake_stats(
        &self,
        selector: BlockSelector,
        include_percentiles: bool,
    ) -> Result<Option<StakeStats>, QueryError> {
        Ok(self.network(selector)?.map(|network| StakeStats {
            num_stakers: network.num_stakers,
            total_staked: network.total_staked,
            total_normalized_staked: network.total_normalized_staked,
            staked_percentiles: include_percentiles.then_some(network.staked_percentiles),
        }))
    }

    pub fn staker(&self, staker: Address, selector: BlockSelector) -> Result<Option<Staker>, QueryError> {
        self.load(&address_id(staker), selector)
    }

    /// Every staker in index order.
    pub fn stakers(&self, selector: BlockSelector) -> Result<Vec<Staker>, QueryError> {
        let snapshot = self.snapshot(selector)?;
        let total = snapshot
            .load::<Network>(&self.context.network_id())?
            .map_or(0, |network| network.staker_count);
        Ok(self.chunked(snapshot.load_all::<Staker>()?, total, |staker| staker.index))
    }

    /// Stakers whose insertion index falls in `start..=end`.
    pub fn stakers_page(
        &self,
        start: u64,
        end: u64,
        selector: BlockSelector,
    ) -> Result<Vec<Staker>, QueryError> {
        let mut stakers = self.load_all::<Staker>(selector)?;
        stakers.sort_by_key(|staker| staker.index);
        Ok(index_range(&stakers, start, end, |staker| staker.index).to_vec())
    }

    /// Up to `num` ranked stakers starting at rank `start`.
    pub fn staker_leaderboard(
        &self,
        start: u64,
        num: usize,
        selector: BlockSelector,
    ) -> Result<Vec<Staker>, QueryError> {
        let mut ranked: Vec<Staker> = self
            .load_all::<Staker>(selector)?
            .into_iter()
            .filter(|staker| staker.rank.is_some_and(|rank| rank >= start))
            .collect();
        ranked.sort_by_key(|staker| staker.rank);
        ranked.truncate(num);
        Ok(ranked)
    }

    pub fn slots(&self, selector: BlockSelector) -> Result<[Option<Slot>; SLOT_COUNT], QueryError> {
        let snapshot = self.snapshot(selector)?;
        let mut slots: [Option<Slot>; SLOT_COUNT] = Default::default();
        if let Some(network) = snapshot.load::<Network>(&self.context.network_id())? {
            for (slot, id) in slots.iter_mut().zip(network.slots.iter()) {
                if let Some(id) = id {
                    *slot = snapshot.load::<Slot>(id)?;
                }
            }
        }
        Ok(slots)
    }

    /// Claim history of a slot, oldest first.
    pub fn slot_claims(&self, slot: u8, selector: BlockSelector) -> Result<Vec<SlotClaim>, QueryError> {
        let id = slot_id(&self.context.network_id(), slot);
        let mut claims: Vec<SlotClaim> = self
            .load_all::<SlotClaim>(selector)?
            .into_iter()
            .filter(|claim| claim.slot == id)
            .collect();
        claims.sort_by_key(|claim| claim.index);
        Ok(claims)
    }

    pub fn producer(&self, producer: Address, selector: BlockSelector) -> Result<Option<Producer>, QueryError> {
        self.load(&address_id(producer), selector)
    }

    /// Producers in registration order.
    pub fn producers(&self, selector: BlockSelector) -> Result<Vec<Producer>, QueryError> {
        let snapshot = self.snapshot(selector)?;
        let Some(set) = snapshot.load::<ProducerSet>(&self.context.governance_id())? else {
            return Ok(Vec::new());
        };
        let mut producers = Vec::with_capacity(set.producers.len());
        for id in &set.producers {
            if let Some(producer) = snapshot.load::<Producer>(id)? {
                producers.push(producer);
            }
        }
        Ok(producers)
    }

    pub fn producer_set_changes(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> Result<Vec<ProducerSetChange>, QueryError> {
        let mut changes: Vec<ProducerSetChange> = self
            .load_all::<ProducerSetChange>(BlockSelector::Latest)?
            .into_iter()
            .filter(|change| (start_block..=end_block).contains(&change.block_number))
            .collect();
        changes.sort_by(|a, b| a.block_number.cmp(&b.block_number).then_with(|| a.id.cmp(&b.id)));
        Ok(changes)
    }

    pub fn producer_reward_collector_changes(
        &self,
        start_block: u64,
        end_block: u64,
    ) -> Result<Vec<ProducerRewardCollectorChange>, QueryError> {
        let mut changes: Vec<ProducerRewardCollectorChange> = self
            .load_all::<ProducerRewardCollectorChange>(BlockSelector::Latest)?
            .into_iter()
            .filter(|change| (start_block..=end_block).contains(&change.block_number))
            .collect();
        changes.sort_by(|a, b| a.block_number.cmp(&b.block_number).then_with(|| a.id.cmp(&b.id)));
        Ok(changes)
    }

    fn all_blocks(&self, from_active_producer_only: bool) -> Result<Vec<Block>, QueryError> {
        let mut blocks: Vec<Block> = self
            .load_all::<Block>(BlockSelector::Latest)?
            .into_iter()
            .filter(|block| !from_active_producer_only || block.from_active_producer)
            .collect();
        blocks.sort_by_key(|block| block.number);
        Ok(blocks)
    }

    /// Blocks numbered `start_block..=end_block`, ascending.
    pub fn blocks(
        &self,
        start_block: u64,
        end_block: u64,
        from_active_producer_only: bool,
    ) -> Result<Vec<Block>, QueryError> {
        Ok(self
            .all_blocks(from_active_producer_only)?
            .into_iter()
            .filter(|block| (start_block..=end_block).contains(&block.number))
            .collect())
    }

    /// Newest blocks first, skipping `start` and returning at most `num`.
    pub fn blocks_paged(
        &self,
        start: usize,
        num: usize,
        from_active_producer_only: bool,
    ) -> Result<Vec<Block>, QueryError> {
        Ok(self
            .all_blocks(from_active_producer_only)?
            .into_iter()
            .rev()
            .skip(start)
            .take(num)
            .collect())
    }

    pub fn reward_schedule(
        &self,
        selector: BlockSelector,
    ) -> Result<Option<RewardScheduleView>, QueryError> {
        let snapshot = self.snapshot(selector)?;
        let Some(schedule) = snapshot.load::<RewardSchedule>(&self.context.governance_id())?
        else {
            return Ok(None);
        };

        let mut entries = Vec::with_capacity(schedule.entries.len());
        for id in &schedule.entries {
            if let Some(entry) = snapshot.load::<RewardScheduleEntry>(id)? {
                entries.push(entry);
            }
        }
        let active_entry = schedule
            .active_entry
            .as_ref()
            .and_then(|id| entries.iter().find(|entry| &entry.id == id).cloned());
        let pending_epoch = match &schedule.pending_epoch {
            Some(id) => snapshot.load::<Epoch>(id)?,
            None => None,
        };
        let last_epoch = match &schedule.last_epoch {
            Some(id) => snapshot.load::<Epoch>(id)?,
            None => None,
        };
        Ok(Some(RewardScheduleView { entries, active_entry, pending_epoch, last_epoch }))
    }

    /// Epochs numbered `start_epoch..=end_epoch` at the head, ascending.
    pub fn epochs(
        &self,
        start_epoch: u64,
        end_epoch: u64,
        include_rewards: bool,
    ) -> Result<Vec<EpochView>, QueryError> {
        let snapshot = self.snapshot(BlockSelector::Latest)?;
        let schedule_id = self.context.governance_id();
        let mut views = Vec::new();
        for number in start_epoch..=end_epoch {
            let Some(epoch) = snapshot.load::<Epoch>(&epoch_id(&schedule_id, number))? else {
                continue;
            };
            let mut producer_rewards = Vec::new();
            if include_rewards {
                for id in &epoch.producer_rewards {
                    if let Some(reward) = snapshot.load::<ProducerEpoch>(id)? {
                        producer_rewards.push(reward);
                    }
                }
            }
            views.push(EpochView { epoch, producer_rewards });
        }
        Ok(views)
    }

    pub fn current_distribution(
        &self,
        selector: BlockSelector,
    ) -> Result<Option<Distribution>, QueryError> {
        let snapshot = self.snapshot(selector)?;
        let current = snapshot
            .load::<Distributor>(&self.context.distributor_id())?
            .and_then(|distributor| distributor.current_distribution);
        match current {
            Some(id) => Ok(snapshot.load::<Distribution>(&id)?),
            None => Ok(None),
        }
    }

    pub fn distribution(
        &self,
        distribution_number: U256,
        selector: BlockSelector,
    ) -> Result<Option<Distribution>, QueryError> {
        Ok(self
            .load_all::<Distribution>(selector)?
            .into_iter()
            .find(|distribution| distribution.distribution_number == distribution_number))
    }

    /// Every distribution by ascending number.
    pub fn distributions(&self, selector: BlockSelector) -> Result<Vec<Distribution>, QueryError> {
        let mut distributions = self.load_all::<Distribution>(selector)?;
        distributions.sort_by_key(|distribution| distribution.distribution_number);
        Ok(distributions)
    }

    pub fn distributor(&self, selector: BlockSelector) -> Result<Option<Distributor>, QueryError> {
        self.load(&self.context.distributor_id(), selector)
    }

    pub fn account(&self, account: Address, selector: BlockSelector) -> Result<Option<Account>, QueryError> {
        self.load(&address_id(account), selector)
    }

    pub fn accounts(&self, selector: BlockSelector) -> Result<Vec<Account>, QueryError> {
        self.load_all(selector)
    }

    /// Claims, optionally for one account, oldest first.
    pub fn claims(
        &self,
        account: Option<Address>,
        selector: BlockSelector,
    ) -> Result<Vec<Claim>, QueryError> {
        let account = account.map(address_id);
        let mut claims: Vec<Claim> = self
            .load_all::<Claim>(selector)?
            .into_iter()
            .filter(|claim| account.as_ref().is_none_or(|id| &claim.account == id))
            .collect();
        claims.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(claims)
    }

    /// Slashes, optionally for one account, oldest first.
    pub fn slashes(
        &self,
        account: Option<Address>,
        selector: BlockSelector,
    ) -> Result<Vec<Slash>, QueryError> {
        let account = account.map(address_id);
        let mut slashes: Vec<Slash> = self
            .load_all::<Slash>(selector)?
            .into_iter()
            .filter(|slash| account.as_ref().is_none_or(|id| &slash.account == id))
            .collect();
        slashes.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
        Ok(slashes)
    }

    pub fn token_stats(&self, selector: BlockSelector) -> Result<Option<Token>, QueryError> {
        self.load(&self.context.token_id(), selector)
    }

    /// Token balance of `account`, zero when it never held any.
    pub fn balance(&self, account: Address, selector: BlockSelector) -> Result<U256, QueryError> {
        Ok(self
            .load::<Balance>(&address_id(account), selector)?
            .map_or(U256::ZERO, |balance| balance.balance))
    }

    /// Every balance in index order.
    pub fn balances(&self, selector: BlockSelector) -> Result<Vec<Balance>, QueryError> {
        let snapshot = self.snapshot(selector)?;
        let total =
            snapshot.load::<Token>(&self.context.token_id())?.map_or(0, |token| token.num_balances);
        Ok(self.chunked(snapshot.load_all::<Balance>()?, total, |balance| balance.index))
    }

    /// Balances whose insertion index falls in `start..=end`.
    pub fn balances_page(
        &self,
        start: u64,
        end: u64,
        selector: BlockSelector,
    ) -> Result<Vec<Balance>, QueryError> {
        let mut balances = self.load_all::<Balance>(selector)?;
        balances.sort_by_key(|balance| balance.index);
        Ok(index_range(&balances, start, end, |balance| balance.index).to_vec())
    }

    /// Cumulative normalized stake of `staker` accrued from `from` through `to`.
    pub fn staker_cumulative_stake(
        &self,
        staker: Address,
        from: BlockSelector,
        to: BlockSelector,
    ) -> Result<U256, QueryError> {
        let (first_block, last_block) = (self.resolve(from)?, self.resolve(to)?);
        let id = address_id(staker);
        let first = self.store.at(first_block).load::<Staker>(&id)?;
        let last = self.store.at(last_block).load::<Staker>(&id)?;
        Ok(cumulative_normalized_stake(first.as_ref(), first_block, last.as_ref(), last_block))
    }

    /// Network-wide cumulative normalized stake accrued from `from` through `to`.
    pub fn network_cumulative_stake(
        &self,
        from: BlockSelector,
        to: BlockSelector,
    ) -> Result<U256, QueryError> {
        let (first_block, last_block) = (self.resolve(from)?, self.resolve(to)?);
        let id = self.context.network_id();
        let first = self.store.at(first_block).load::<Network>(&id)?;
        let last = self.store.at(last_block).load::<Network>(&id)?;
        Ok(total_cumulative_normalized_stake(first.as_ref(), first_block, last.as_ref(), last_block))
    }

    /// Evaluate `query` at each selector, paired with the block it resolved to.
    pub fn timeseries<T>(
        &self,
        selectors: &[BlockSelector],
        query: impl Fn(&Self, BlockSelector) -> Result<T, QueryError>,
    ) -> Result<Vec<(u64, T)>, QueryError> {
        selectors
            .iter()
            .map(|selector| {
                let block = self.resolve(*selector)?;
                Ok((block, query(self, BlockSelector::Number(block))?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_boundaries() {
        assert!(chunk_boundaries(0, 100).is_empty());
        assert_eq!(chunk_boundaries(7, 100), vec![(0, 6)]);
        assert_eq!(chunk_boundaries(100, 100), vec![(0, 99)]);
        assert_eq!(chunk_boundaries(250, 100), vec![(0, 99), (100, 199), (200, 249)]);
    }

    #[test]
    fn test_index_range() {
        let items = [1u64, 2, 4, 7];
        assert_eq!(index_range(&items, 2, 5, |item| *item), &[2, 4]);
        assert_eq!(index_range(&items, 0, 100, |item| *item), &items);
        assert!(index_range(&items, 5, 6, |item| *item).is_empty());
        assert!(index_range(&items, 4, 2, |item| *item).is_empty());
    }

    #[test]
    fn test_millisecond_timestamps() {
        assert_eq!(
            BlockSelector::from_unix_timestamp(1_628_003_987),
            BlockSelector::Timestamp(1_628_003_987)
        );
        assert_eq!(
            BlockSelector::from_unix_timestamp(1_628_003_987_123),
            BlockSelector::Timestamp(1_628_003_987)
        );
    }

    #[test]
    fn test_selectors_on_empty_store() {
        let store = MemoryStore::new();
        let ctx = LedgerContext::mainnet();
        let query = HistoricalQuery::new(&store, &ctx);
        assert!(matches!(query.resolve(BlockSelector::Latest), Err(QueryError::NothingIndexed)));
        assert!(matches!(
            query.resolve(BlockSelector::Number(3)),
            Err(QueryError::BlockNotIndexed { block: 3, head: None })
        ));
        assert!(matches!(
            query.resolve(BlockSelector::Timestamp(3)),
            Err(QueryError::NoBlockAtTimestamp(3))
        ));
    }
}
