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

//! Block producer registry and epoch-based block reward settlement.
//!
//! Every block is recorded and attributed to its author. While a reward schedule is active,
//! blocks are counted into the pending epoch; once the epoch has lasted `epochDuration` seconds
//! it is closed and `rewardsPerEpoch` is split between producers in proportion to the blocks
//! they produced during it.

use alloy_primitives::{Address, B256, U256};

use crate::{
    context::LedgerContext,
    entities::{
        address_id, Block, Epoch, Producer, ProducerEpoch, ProducerRewardCollectorChange,
        ProducerSet, ProducerSetChange, ProducerSetChangeType, RewardSchedule,
        RewardScheduleEntry,
    },
    error::LedgerError,
    events::{BlockHeader, RewardScheduleEntryParams},
    fixed::{Decimal4, RATIO_SCALE},
    store::{EntityReaderExt, EntityStore, EntityStoreExt},
};

pub fn block_id(hash: B256) -> String {
    format!("{hash:#x}")
}

pub fn epoch_id(schedule_id: &str, epoch_number: u64) -> String {
    format!("{schedule_id}+epoch{epoch_number}")
}

pub fn producer_epoch_id(producer_id: &str, epoch_number: u64) -> String {
    format!("{producer_id}+epoch{epoch_number}")
}

/// Load a producer, registering it in the producer set if it is new.
fn create_or_get_producer<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    producer: Address,
) -> Result<Producer, LedgerError> {
    let id = address_id(producer);
    if let Some(existing) = store.load::<Producer>(&id)? {
        return Ok(existing);
    }
    let set_id = context.governance_id();
    let mut set = store
        .load::<ProducerSet>(&set_id)?
        .unwrap_or_else(|| ProducerSet { id: set_id, producers: Vec::new() });
    set.producers.push(id.clone());
    store.save(set);
    Ok(Producer::new(id))
}

/// Handle `BlockProducerAdded` (`active = true`) and `BlockProducerRemoved` (`active = false`).
pub fn set_producer_active<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    record_id: String,
    block_number: u64,
    producer: Address,
    active: bool,
) -> Result<(), LedgerError> {
    let mut entity = create_or_get_producer(store, context, producer)?;
    entity.active = active;
    let change_type =
        if active { ProducerSetChangeType::Added } else { ProducerSetChangeType::Removed };
    tracing::info!("Block producer {} {:?} at block {}", entity.id, change_type, block_number);

    store.save(ProducerSetChange {
        id: record_id,
        block_number,
        producer: entity.id.clone(),
        change_type,
    });
    store.save(entity);
    Ok(())
}

pub fn change_reward_collector<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    record_id: String,
    block_number: u64,
    producer: Address,
    collector: Address,
) -> Result<(), LedgerError> {
    let mut entity = create_or_get_producer(store, context, producer)?;
    entity.reward_collector = Some(collector);
    store.save(ProducerRewardCollectorChange {
        id: record_id,
        block_number,
        producer: entity.id.clone(),
        reward_collector: collector,
    });
    store.save(entity);
    Ok(())
}

/// Latest entry that has started by `timestamp`. `entries` must be sorted by start time.
fn entry_for_timestamp(
    entries: &[RewardScheduleEntry],
    timestamp: u64,
) -> Option<&RewardScheduleEntry> {
    entries.iter().rev().find(|entry| entry.start_time <= timestamp)
}

/// Replace the reward schedule entries and resolve the active entry for `block_timestamp`.
pub fn replace_reward_schedule<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    record_id: &str,
    block_timestamp: u64,
    params: &[RewardScheduleEntryParams],
) -> Result<(), LedgerError> {
    let schedule_id = context.governance_id();
    let mut schedule = store
        .load::<RewardSchedule>(&schedule_id)?
        .unwrap_or_else(|| RewardSchedule::new(schedule_id));

    let mut sorted = params.to_vec();
    sorted.sort_by_key(|entry| entry.start_time);
    let entries: Vec<RewardScheduleEntry> = sorted
        .into_iter()
        .enumerate()
        .map(|(i, entry)| RewardScheduleEntry {
            id: format!("{record_id}+index{i}"),
            start_time: entry.start_time,
            epoch_duration: entry.epoch_duration,
            rewards_per_epoch: entry.rewards_per_epoch,
        })
        .collect();

    schedule.entries = entries.iter().map(|entry| entry.id.clone()).collect();
    schedule.active_entry =
        entry_for_timestamp(&entries, block_timestamp).map(|entry| entry.id.clone());
    tracing::info!(
        "Reward schedule replaced with {} entries, active entry {:?}",
        entries.len(),
        schedule.active_entry
    );

    for entry in entries {
        store.save(entry);
    }
    store.save(schedule);
    Ok(())
}

/// Record the block header, attributing it to its author.
pub fn record_block<S: EntityStore + ?Sized>(
    store: &mut S,
    header: &BlockHeader,
) -> Result<Block, LedgerError> {
    let from_active_producer =
        store.load::<Producer>(&address_id(header.author))?.is_some_and(|producer| producer.active);
    let block = Block {
        id: block_id(header.hash),
        hash: header.hash,
        parent_hash: header.parent_hash,
        number: header.number,
        timestamp: header.timestamp,
        author: header.author,
        from_active_producer,
    };
    store.save(block.clone());
    Ok(block)
}

/// Count `block` into the pending epoch, closing the epoch once its duration has elapsed.
pub fn accrue_block_rewards<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    block: &Block,
) -> Result<(), LedgerError> {
    let Some(mut schedule) = store.load::<RewardSchedule>(&context.governance_id())? else {
        tracing::debug!("No reward schedule at block {}", block.number);
        return Ok(());
    };

    let mut entries = Vec::with_capacity(schedule.entries.len());
    for id in &schedule.entries {
        if let Some(entry) = store.load::<RewardScheduleEntry>(id)? {
            entries.push(entry);
        }
    }
    let Some(first_entry) = entries.first() else {
        tracing::debug!("Reward schedule has no entries at block {}", block.number);
        return Ok(());
    };

    let mut epoch = match schedule.pending_epoch.clone() {
        Some(id) => store.load::<Epoch>(&id)?.ok_or(LedgerError::PendingEpochMissing(id))?,
        None => {
            if block.timestamp < first_entry.start_time {
                tracing::debug!(
                    "Block {} precedes the first reward schedule entry at {}",
                    block.number,
                    first_entry.start_time
                );
                return Ok(());
            }
            tracing::info!("Starting epoch 1 at block {}", block.number);
            let epoch = Epoch::new(epoch_id(&schedule.id, 1), 1);
            schedule.pending_epoch = Some(epoch.id.clone());
            schedule.active_entry = Some(first_entry.id.clone());
            epoch
        }
    };

    let Some(active_id) = schedule.active_entry.clone() else {
        tracing::debug!("No active reward schedule entry at block {}", block.number);
        return Ok(());
    };
    let entry = entries
        .iter()
        .find(|entry| entry.id == active_id)
        .ok_or(LedgerError::ActiveEntryMissing(active_id))?;

    let start_block_id = epoch.start_block.get_or_insert_with(|| block.id.clone()).clone();
    let start_block = store
        .load::<Block>(&start_block_id)?
        .ok_or(LedgerError::EpochStartBlockMissing(start_block_id))?;

    epoch.all_blocks += 1;
    if block.from_active_producer {
        epoch.producer_blocks += 1;
        if let Some(mut producer) = store.load::<Producer>(&address_id(block.author))? {
            producer.pending_epoch_blocks += 1;
            store.save(producer);
        }
    }
    epoch.producer_blocks_ratio =
        Decimal4::ratio(epoch.producer_blocks, epoch.all_blocks).unwrap_or_default();

    // An epoch whose end overflows u64 never closes.
    let epoch_end = start_block.timestamp.checked_add(entry.epoch_duration);
    if epoch_end.is_some_and(|end| block.timestamp >= end) {
        close_epoch(store, context, &mut epoch, entry, block)?;

        schedule.last_epoch = Some(epoch.id.clone());
        let next_number = epoch.epoch_number + 1;
        let next = Epoch::new(epoch_id(&schedule.id, next_number), next_number);
        schedule.pending_epoch = Some(next.id.clone());
        store.save(next);

        if let Some(resolved) = entry_for_timestamp(&entries, block.timestamp) {
            if schedule.active_entry.as_deref() != Some(resolved.id.as_str()) {
                tracing::info!(
                    "Active reward schedule entry changed to {} at block {}",
                    resolved.id,
                    block.number
                );
                schedule.active_entry = Some(resolved.id.clone());
            }
        }
    }

    store.save(epoch);
    store.save(schedule);
    Ok(())
}

/// Finalize `epoch` and settle each producer's share of the epoch rewards.
fn close_epoch<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    epoch: &mut Epoch,
    entry: &RewardScheduleEntry,
    block: &Block,
) -> Result<(), LedgerError> {
    epoch.finalized = true;
    epoch.end_block = Some(block.id.clone());

    let producers = store
        .load::<ProducerSet>(&context.governance_id())?
        .map(|set| set.producers)
        .unwrap_or_default();

    let mut distributed = U256::ZERO;
    for producer_id in producers {
        let Some(mut producer) = store.load::<Producer>(&producer_id)? else {
            tracing::warn!("Producer {} missing at close of epoch {}", producer_id, epoch.epoch_number);
            continue;
        };

        let pending = producer.pending_epoch_blocks;
        let ratio = if pending == 0 || epoch.producer_blocks == 0 {
            0
        } else {
            let scaled = u128::from(pending) * u128::from(RATIO_SCALE) / u128::from(epoch.producer_blocks);
            u64::try_from(scaled).unwrap_or(RATIO_SCALE)
        };
        let new_rewards = U256::from(ratio) * entry.rewards_per_epoch / U256::from(RATIO_SCALE);

        producer.rewards += new_rewards;
        producer.confirmed_blocks += pending;
        producer.pending_epoch_blocks = 0;
        distributed += new_rewards;

        let producer_epoch = ProducerEpoch {
            id: producer_epoch_id(&producer.id, epoch.epoch_number),
            address: producer.id.clone(),
            epoch: epoch.id.clone(),
            blocks_produced: pending,
            blocks_produced_ratio: Decimal4::from_scaled(ratio),
            total_rewards: producer.rewards,
        };
        epoch.producer_rewards.push(producer_epoch.id.clone());
        store.save(producer_epoch);
        store.save(producer);
    }

    tracing::info!(
        "Closed epoch {} at block {}: {} of {} blocks from producers, {} rewards distributed",
        epoch.epoch_number,
        block.number,
        epoch.producer_blocks,
        epoch.all_blocks,
        distributed
    );
    Ok(())
}
