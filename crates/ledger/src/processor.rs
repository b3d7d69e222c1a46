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

//! Routing of block events to the accounting components.
//!
//! A block is applied as a unit. Its events run in log order, each behind a savepoint so a
//! rejected event only discards its own writes, and the header runs last to record the block and
//! accrue epoch rewards. Fatal errors discard the whole block.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use anyhow::anyhow;

use crate::{
    context::LedgerContext,
    distribution, governance,
    error::LedgerError,
    events::{BlockBundle, BlockHeader, EventLog, LedgerEvent},
    network::{self, SlotBid},
    store::{BlockTransaction, Changeset, MemoryStore},
    token,
};

/// Authoritative staked balance lookup, as of the end of a block.
pub trait StakeOracle {
    fn staked_balance(&self, staker: Address, block_number: u64) -> anyhow::Result<U256>;
}

/// Balances resolved ahead of time for the block being applied.
impl StakeOracle for HashMap<Address, U256> {
    fn staked_balance(&self, staker: Address, block_number: u64) -> anyhow::Result<U256> {
        self.get(&staker)
            .copied()
            .ok_or_else(|| anyhow!("no balance for {staker} at block {block_number}"))
    }
}

/// Applies blocks against a committed store.
#[derive(Clone, Debug)]
pub struct Processor {
    context: LedgerContext,
}

impl Processor {
    pub fn new(context: LedgerContext) -> Self {
        Self { context }
    }

    pub fn context(&self) -> &LedgerContext {
        &self.context
    }

    /// Compute the changeset of `bundle` on top of `store`.
    ///
    /// Returns `Ok(None)` for a block that is already committed.
    pub fn process_block(
        &self,
        store: &MemoryStore,
        bundle: &BlockBundle,
        oracle: &dyn StakeOracle,
    ) -> Result<Option<Changeset>, LedgerError> {
        let header = &bundle.header;
        if store.is_committed(header.number) {
            tracing::debug!("Block {} already committed, skipping", header.number);
            return Ok(None);
        }

        let mut tx = store.begin(header.number, header.timestamp)?;
        for log in &bundle.events {
            let savepoint = tx.savepoint();
            if let Err(err) = self.apply_event(&mut tx, header, log, oracle) {
                if err.is_fatal() {
                    tracing::error!(
                        "Aborting block {}: {} in log {} failed: {}",
                        header.number,
                        log.event.name(),
                        log.record_id(),
                        err
                    );
                    return Err(err);
                }
                tracing::warn!(
                    "Rejected {} in log {} at block {}: {}",
                    log.event.name(),
                    log.record_id(),
                    header.number,
                    err
                );
                tx.rollback(savepoint);
            }
        }

        let block = governance::record_block(&mut tx, header)?;
        let savepoint = tx.savepoint();
        if let Err(err) = governance::accrue_block_rewards(&mut tx, &self.context, &block) {
            if err.is_fatal() {
                return Err(err);
            }
            tracing::error!("Reward accrual aborted for block {}: {}", header.number, err);
            tx.rollback(savepoint);
        }

        Ok(Some(tx.into_changeset()))
    }

    fn apply_event(
        &self,
        tx: &mut BlockTransaction<'_>,
        header: &BlockHeader,
        log: &EventLog,
        oracle: &dyn StakeOracle,
    ) -> Result<(), LedgerError> {
        let ctx = &self.context;
        match &log.event {
            LedgerEvent::Stake { staker } | LedgerEvent::Unstake { staker } => {
                let staked = oracle
                    .staked_balance(*staker, header.number)
                    .map_err(|source| LedgerError::Oracle { staker: *staker, source })?;
                network::update_stake(tx, ctx, *staker, staked, header.number)
            }
            LedgerEvent::BlockProducerAdded { producer } => {
                governance::set_producer_active(tx, ctx, log.record_id(), header.number, *producer, true)
            }
            LedgerEvent::BlockProducerRemoved { producer } => {
                governance::set_producer_active(tx, ctx, log.record_id(), header.number, *producer, false)
            }
            LedgerEvent::BlockProducerRewardCollectorChanged { producer, collector } => {
                governance::change_reward_collector(
                    tx,
                    ctx,
                    log.record_id(),
                    header.number,
                    *producer,
                    *collector,
                )
            }
            LedgerEvent::RewardScheduleChanged { entries } => governance::replace_reward_schedule(
                tx,
                ctx,
                &log.record_id(),
                header.timestamp,
                entries,
            ),
            LedgerEvent::SlotClaimed {
                slot,
                owner,
                delegate,
                new_bid,
                old_bid,
                tax_numerator,
                tax_denominator,
                expiration_time,
            } => network::record_slot_claim(
                tx,
                ctx,
                log.record_id(),
                header.timestamp,
                SlotBid {
                    slot: *slot,
                    owner: *owner,
                    delegate: *delegate,
                    new_bid: *new_bid,
                    old_bid: *old_bid,
                    tax_numerator: *tax_numerator,
                    tax_denominator: *tax_denominator,
                    expiration_time: *expiration_time,
                },
            ),
            LedgerEvent::SlotDelegateUpdated { slot, new_delegate } => {
                network::update_slot_delegate(tx, ctx, *slot, *new_delegate)
            }
            LedgerEvent::Transfer { from, to, value } => {
                token::apply_transfer(tx, ctx, *from, *to, *value)
            }
            LedgerEvent::MerkleRootUpdated {
                distribution_number,
                merkle_root,
                metadata_uri,
                token_total,
            } => distribution::record_distribution(
                tx,
                ctx,
                log.record_id(),
                header.timestamp,
                *distribution_number,
                *merkle_root,
                metadata_uri.clone(),
                *token_total,
            ),
            LedgerEvent::Claimed { index, account, total_earned, claimed } => {
                distribution::record_claim(
                    tx,
                    log.record_id(),
                    header.timestamp,
                    *index,
                    *account,
                    *total_earned,
                    *claimed,
                )
            }
            LedgerEvent::Slashed { account, slashed } => {
                distribution::record_slash(tx, log.record_id(), header.timestamp, *account, *slashed)
            }
            LedgerEvent::AccountUpdated { account, total_claimed, total_slashed } => {
                distribution::set_account_totals(tx, *account, *total_claimed, *total_slashed)
            }
            LedgerEvent::DebtChanged { new_debt } => distribution::set_debt_total(tx, ctx, *new_debt),
        }
    }
}

/// What happened to a block handed to [Ledger::apply_block].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockOutcome {
    Committed { writes: usize },
    AlreadyCommitted,
}

/// A [Processor] bundled with the store it commits into.
#[derive(Clone, Debug)]
pub struct Ledger {
    processor: Processor,
    store: MemoryStore,
}

impl Ledger {
    pub fn new(context: LedgerContext) -> Self {
        Self::with_store(context, MemoryStore::new())
    }

    pub fn with_store(context: LedgerContext, store: MemoryStore) -> Self {
        Self { processor: Processor::new(context), store }
    }

    pub fn context(&self) -> &LedgerContext {
        self.processor.context()
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn into_store(self) -> MemoryStore {
        self.store
    }

    pub fn apply_block(
        &mut self,
        bundle: &BlockBundle,
        oracle: &dyn StakeOracle,
    ) -> Result<BlockOutcome, LedgerError> {
        let Some(changeset) = self.processor.process_block(&self.store, bundle, oracle)? else {
            return Ok(BlockOutcome::AlreadyCommitted);
        };
        let writes = changeset.writes.len();
        self.store.commit(changeset)?;
        Ok(BlockOutcome::Committed { writes })
    }
}
