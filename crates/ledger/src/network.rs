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

//! Network aggregate: stake totals, staker ranking, the percentile ladder and slot auctions.

use alloy_primitives::{Address, U256};

use crate::{
    context::LedgerContext,
    entities::{address_id, Network, Slot, SlotClaim, Staker, PERCENTILE_COUNT, SLOT_COUNT},
    error::LedgerError,
    fixed::{Decimal4, WEI},
    staking::apply_stake_change,
    store::{EntityReaderExt, EntityStore, EntityStoreExt},
};

/// Parameters of a winning slot bid.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotBid {
    pub slot: u8,
    pub owner: Address,
    pub delegate: Address,
    pub new_bid: U256,
    pub old_bid: U256,
    pub tax_numerator: u32,
    pub tax_denominator: u32,
    pub expiration_time: u64,
}

pub fn slot_id(network_id: &str, slot: u8) -> String {
    format!("{network_id}-{slot}")
}

fn load_network<S: EntityStore + ?Sized>(
    store: &S,
    context: &LedgerContext,
) -> Result<Network, LedgerError> {
    let id = context.network_id();
    Ok(store.load::<Network>(&id)?.unwrap_or_else(|| Network::new(id)))
}

/// Set a staker's stake to the authoritative balance, then re-rank every staker.
pub fn update_stake<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    staker: Address,
    new_stake: U256,
    block_number: u64,
) -> Result<(), LedgerError> {
    let mut network = load_network(store, context)?;
    let staker_id = address_id(staker);
    let mut entity = match store.load::<Staker>(&staker_id)? {
        Some(entity) => entity,
        None => {
            let entity = Staker::new(staker_id.clone(), network.staker_count);
            network.staker_count += 1;
            network.stakers.push(staker_id);
            entity
        }
    };

    apply_stake_change(
        &mut entity,
        &mut network,
        new_stake,
        block_number,
        context.dampening_point(block_number),
    );
    store.save(entity);

    rerank(store, &mut network)?;
    store.save(network);
    Ok(())
}

/// Recompute ranks, the percentile ladder and the nonzero staker count.
///
/// Nonzero stakers are ordered by whole staked tokens, descending, ties broken by id.
/// Only stakers whose rank changes are written back.
pub fn rerank<S: EntityStore + ?Sized>(store: &mut S, network: &mut Network) -> Result<(), LedgerError> {
    let mut ranked = Vec::new();
    let mut unranked = Vec::new();
    for id in &network.stakers {
        let Some(staker) = store.load::<Staker>(id)? else {
            tracing::warn!("Staker {} listed on the network but not stored", id);
            continue;
        };
        if staker.staked.is_zero() {
            unranked.push(staker);
        } else {
            ranked.push(staker);
        }
    }

    ranked.sort_by(|a, b| (b.staked / WEI).cmp(&(a.staked / WEI)).then_with(|| a.id.cmp(&b.id)));
    network.staked_percentiles = percentile_ladder(&ranked);
    network.num_stakers = ranked.len() as u64;

    for (rank, mut staker) in ranked.into_iter().enumerate() {
        let rank = Some(rank as u64);
        if staker.rank != rank {
            staker.rank = rank;
            store.save(staker);
        }
    }
    for mut staker in unranked {
        if staker.rank.is_some() {
            staker.rank = None;
            store.save(staker);
        }
    }
    Ok(())
}

/// `ladder[i]` is the stake of the staker at position `floor(i * n / 100)` of the ranking.
/// All zero when nobody stakes.
pub fn percentile_ladder(ranked: &[Staker]) -> Vec<U256> {
    let n = ranked.len();
    if n == 0 {
        return vec![U256::ZERO; PERCENTILE_COUNT];
    }
    // Exact integer index. A float `i / 100.0 * n` rounds below this for some pairs (i = 29, n = 100).
    (0..PERCENTILE_COUNT).map(|i| ranked[i * n / PERCENTILE_COUNT].staked).collect()
}

/// Record a winning bid: overwrite the slot, append to its claim history and point the
/// network at it.
pub fn record_slot_claim<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    record_id: String,
    block_timestamp: u64,
    bid: SlotBid,
) -> Result<(), LedgerError> {
    if usize::from(bid.slot) >= SLOT_COUNT {
        return Err(LedgerError::UnknownSlot(bid.slot));
    }
    let tax_rate_per_day = Decimal4::ratio(bid.tax_numerator.into(), bid.tax_denominator.into())
        .ok_or(LedgerError::ZeroTaxDenominator(bid.slot))?;

    let mut network = load_network(store, context)?;
    let id = slot_id(&network.id, bid.slot);
    let previous_claims = store.load::<Slot>(&id)?.map_or(0, |slot| slot.num_claims);

    store.save(SlotClaim {
        id: record_id,
        slot: id.clone(),
        index: previous_claims,
        owner: bid.owner,
        winning_bid: bid.new_bid,
        old_bid: bid.old_bid,
        start_time: block_timestamp,
        expiration_time: bid.expiration_time,
        tax_rate_per_day,
    });
    store.save(Slot {
        id: id.clone(),
        index: bid.slot,
        owner: bid.owner,
        delegate: bid.delegate,
        winning_bid: bid.new_bid,
        old_bid: bid.old_bid,
        start_time: block_timestamp,
        expiration_time: bid.expiration_time,
        tax_rate_per_day,
        num_claims: previous_claims + 1,
    });

    network.slots[usize::from(bid.slot)] = Some(id);
    store.save(network);
    Ok(())
}

pub fn update_slot_delegate<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    slot: u8,
    new_delegate: Address,
) -> Result<(), LedgerError> {
    if usize::from(slot) >= SLOT_COUNT {
        return Err(LedgerError::UnknownSlot(slot));
    }
    let id = slot_id(&context.network_id(), slot);
    let mut entity = store.load::<Slot>(&id)?.ok_or(LedgerError::UnclaimedSlot(slot))?;
    entity.delegate = new_delegate;
    store.save(entity);
    Ok(())
}
