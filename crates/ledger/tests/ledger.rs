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

mod common;

use alloy_primitives::{Address, B256, U256};
use common::{balances, BundleBuilder, GENESIS_TIME};
use eden_ledger::{
    context::MAINNET_DAMPENING_FORK_BLOCK,
    entities::{address_id, ProducerSetChangeType},
    store::EntityReader,
    BlockBundle, BlockOutcome, BlockSelector, EntityKind, HistoricalQuery, Ledger, LedgerContext,
    LedgerEvent, QueryError, RewardScheduleEntryParams, WEI,
};

const P1: Address = Address::repeat_byte(0xa1);
const P2: Address = Address::repeat_byte(0xa2);
const OTHER: Address = Address::repeat_byte(0xaa);

const ALICE: Address = Address::repeat_byte(0x11);
const BOB: Address = Address::repeat_byte(0x22);
const CAROL: Address = Address::repeat_byte(0x33);

fn wei(whole: u64) -> U256 {
    U256::from(whole) * WEI
}

fn governance_chain() -> Vec<BlockBundle> {
    vec![
        BundleBuilder::new(1, P1)
            .event(LedgerEvent::BlockProducerAdded { producer: P1 })
            .event(LedgerEvent::BlockProducerAdded { producer: P2 })
            .event(LedgerEvent::RewardScheduleChanged {
                entries: vec![RewardScheduleEntryParams {
                    start_time: GENESIS_TIME,
                    epoch_duration: 36,
                    rewards_per_epoch: wei(1000),
                }],
            })
            .build(),
        BundleBuilder::new(2, P2).build(),
        BundleBuilder::new(3, OTHER).build(),
        BundleBuilder::new(4, P1).build(),
    ]
}

fn apply_all(ledger: &mut Ledger, bundles: &[BlockBundle]) {
    let oracle = balances(&[]);
    for bundle in bundles {
        ledger.apply_block(bundle, &oracle).unwrap();
    }
}

#[test]
fn epoch_rewards_are_split_by_produced_blocks() {
    let mut ledger = Ledger::new(LedgerContext::ropsten());
    apply_all(&mut ledger, &governance_chain());
    let query = HistoricalQuery::new(ledger.store(), ledger.context());

    let epochs = query.epochs(1, 2, true).unwrap();
    assert_eq!(epochs.len(), 2);
    let closed = &epochs[0];
    assert!(closed.epoch.finalized);
    assert_eq!((closed.epoch.producer_blocks, closed.epoch.all_blocks), (3, 4));
    assert_eq!(closed.epoch.producer_blocks_ratio.scaled(), 7500);
    assert_eq!(closed.producer_rewards.len(), 2);

    let distributed = closed
        .producer_rewards
        .iter()
        .fold(U256::ZERO, |total, reward| total + reward.total_rewards);
    assert!(distributed <= wei(1000));

    let p1 = query.producer(P1, BlockSelector::Latest).unwrap().unwrap();
    assert_eq!(p1.rewards, U256::from(6666) * wei(1000) / U256::from(10_000));
    assert_eq!((p1.confirmed_blocks, p1.pending_epoch_blocks), (2, 0));

    let pending = &epochs[1];
    assert!(!pending.epoch.finalized);
    assert_eq!(pending.epoch.all_blocks, 0);

    let schedule = query.reward_schedule(BlockSelector::Latest).unwrap().unwrap();
    assert_eq!(schedule.last_epoch.unwrap().epoch_number, 1);
    assert_eq!(schedule.pending_epoch.unwrap().epoch_number, 2);
    assert_eq!(schedule.active_entry.unwrap().start_time, GENESIS_TIME);
}

#[test]
fn block_and_producer_history_queries() {
    let mut ledger = Ledger::new(LedgerContext::ropsten());
    apply_all(&mut ledger, &governance_chain());
    let query = HistoricalQuery::new(ledger.store(), ledger.context());

    let numbers = |blocks: Vec<eden_ledger::entities::Block>| -> Vec<u64> {
        blocks.into_iter().map(|block| block.number).collect()
    };
    assert_eq!(numbers(query.blocks(1, 4, true).unwrap()), vec![1, 2, 4]);
    assert_eq!(numbers(query.blocks(2, 3, false).unwrap()), vec![2, 3]);
    assert_eq!(numbers(query.blocks_paged(0, 2, false).unwrap()), vec![4, 3]);
    assert_eq!(numbers(query.blocks_paged(1, 10, true).unwrap()), vec![2, 1]);

    let changes = query.producer_set_changes(1, 1).unwrap();
    assert_eq!(changes.len(), 2);
    assert!(changes.iter().all(|change| change.change_type == ProducerSetChangeType::Added));
    assert!(query.producer_set_changes(2, 4).unwrap().is_empty());

    let producers: Vec<String> = query
        .producers(BlockSelector::Latest)
        .unwrap()
        .into_iter()
        .map(|producer| producer.id)
        .collect();
    assert_eq!(producers, vec![address_id(P1), address_id(P2)]);
}

#[test]
fn timestamp_selectors_resolve_to_latest_block_at_or_before() {
    let mut ledger = Ledger::new(LedgerContext::ropsten());
    apply_all(&mut ledger, &governance_chain());
    let query = HistoricalQuery::new(ledger.store(), ledger.context());

    assert_eq!(query.resolve(BlockSelector::Timestamp(GENESIS_TIME + 30)).unwrap(), 2);
    assert_eq!(query.resolve(BlockSelector::Timestamp(GENESIS_TIME + 36)).unwrap(), 3);
    assert_eq!(
        query.resolve(BlockSelector::from_unix_timestamp((GENESIS_TIME + 30) * 1000)).unwrap(),
        2
    );
    assert!(matches!(
        query.resolve(BlockSelector::Timestamp(GENESIS_TIME)),
        Err(QueryError::NoBlockAtTimestamp(_))
    ));
    assert!(matches!(
        query.resolve(BlockSelector::Number(9)),
        Err(QueryError::BlockNotIndexed { block: 9, head: Some(4) })
    ));
}

fn staking_chain() -> (Vec<BlockBundle>, Vec<Vec<(Address, U256)>>) {
    let bundles = vec![
        BundleBuilder::new(1, OTHER)
            .event(LedgerEvent::Stake { staker: ALICE })
            .event(LedgerEvent::Stake { staker: BOB })
            .build(),
        BundleBuilder::new(2, OTHER).event(LedgerEvent::Stake { staker: CAROL }).build(),
        BundleBuilder::new(5, OTHER).event(LedgerEvent::Unstake { staker: BOB }).build(),
    ];
    let oracles = vec![
        vec![(ALICE, wei(5000)), (BOB, wei(10))],
        vec![(CAROL, wei(10))],
        vec![(BOB, U256::ZERO)],
    ];
    (bundles, oracles)
}

fn staking_ledger(context: LedgerContext) -> Ledger {
    let mut ledger = Ledger::new(context);
    let (bundles, oracles) = staking_chain();
    for (bundle, oracle) in bundles.iter().zip(oracles) {
        ledger.apply_block(bundle, &balances(&oracle)).unwrap();
    }
    ledger
}

#[test]
fn stake_rankings_over_time() {
    let ctx = LedgerContext { page_size: 2, ..LedgerContext::ropsten() };
    let ledger = staking_ledger(ctx);
    let query = HistoricalQuery::new(ledger.store(), ledger.context());

    let ids = |stakers: Vec<eden_ledger::entities::Staker>| -> Vec<String> {
        stakers.into_iter().map(|staker| staker.id).collect()
    };
    assert_eq!(
        ids(query.staker_leaderboard(1, 10, BlockSelector::Number(2)).unwrap()),
        vec![address_id(BOB), address_id(CAROL)]
    );
    assert_eq!(
        ids(query.staker_leaderboard(1, 10, BlockSelector::Latest).unwrap()),
        vec![address_id(CAROL)]
    );
    assert_eq!(
        ids(query.stakers(BlockSelector::Latest).unwrap()),
        vec![address_id(ALICE), address_id(BOB), address_id(CAROL)]
    );
    assert_eq!(
        ids(query.stakers_page(1, 2, BlockSelector::Latest).unwrap()),
        vec![address_id(BOB), address_id(CAROL)]
    );

    let stats = query.stake_stats(BlockSelector::Number(2), true).unwrap().unwrap();
    assert_eq!(stats.num_stakers, 3);
    assert_eq!(stats.total_staked, wei(5020));
    let ladder = stats.staked_percentiles.unwrap();
    assert_eq!(ladder[0], wei(5000));
    assert_eq!(ladder[99], wei(10));

    let latest = query.stake_stats(BlockSelector::Latest, false).unwrap().unwrap();
    assert_eq!(latest.num_stakers, 2);
    assert!(latest.staked_percentiles.is_none());

    let bob = query.staker(BOB, BlockSelector::Latest).unwrap().unwrap();
    assert_eq!(bob.rank, None);
    assert!(query.staker(BOB, BlockSelector::Number(1)).unwrap().unwrap().rank.is_some());
}

#[test]
fn cumulative_stake_over_block_ranges() {
    let ledger = staking_ledger(LedgerContext::ropsten());
    let query = HistoricalQuery::new(ledger.store(), ledger.context());
    let (first, last) = (BlockSelector::Number(1), BlockSelector::Number(5));

    // 5000 tokens dampen to 1000 + 4 * sqrt(4000).
    assert_eq!(
        query.staker_cumulative_stake(ALICE, first, BlockSelector::Number(4)).unwrap(),
        wei(1252 * 4)
    );
    assert_eq!(query.staker_cumulative_stake(BOB, first, last).unwrap(), wei(40));
    assert_eq!(query.staker_cumulative_stake(CAROL, first, last).unwrap(), wei(40));
    assert_eq!(query.network_cumulative_stake(first, last).unwrap(), wei(1252 * 5 + 80));

    let series = query
        .timeseries(
            &[BlockSelector::Number(1), BlockSelector::Number(3), BlockSelector::Latest],
            |q, selector| Ok(q.stake_stats(selector, false)?.map(|stats| stats.num_stakers)),
        )
        .unwrap();
    assert_eq!(series, vec![(1, Some(2)), (3, Some(3)), (5, Some(2))]);
}

#[test]
fn mainnet_dampening_point_follows_the_stake_block() {
    let mut ledger = Ledger::new(LedgerContext::mainnet());
    let oracle = balances(&[(ALICE, wei(1100))]);
    for number in [MAINNET_DAMPENING_FORK_BLOCK - 1, MAINNET_DAMPENING_FORK_BLOCK] {
        let bundle = BundleBuilder::new(number, OTHER)
            .event(LedgerEvent::Stake { staker: ALICE })
            .build();
        ledger.apply_block(&bundle, &oracle).unwrap();
    }
    let query = HistoricalQuery::new(ledger.store(), ledger.context());

    // 1000 + 4 * sqrt(100) before the fork, linear under the raised point from it.
    let before = query
        .staker(ALICE, BlockSelector::Number(MAINNET_DAMPENING_FORK_BLOCK - 1))
        .unwrap()
        .unwrap();
    assert_eq!(before.normalized_staked, wei(1040));

    let after = query.staker(ALICE, BlockSelector::Latest).unwrap().unwrap();
    assert_eq!(after.staked, wei(1100));
    assert_eq!(after.normalized_staked, wei(1100));
    assert_eq!(after.cumulative_normalized_staked, wei(1040));
}

fn mixed_chain() -> Vec<BlockBundle> {
    let dave = Address::repeat_byte(0xd1);
    let erin = Address::repeat_byte(0xe2);
    vec![
        BundleBuilder::new(1, OTHER)
            .event(LedgerEvent::Transfer { from: Address::ZERO, to: dave, value: wei(100) })
            .event(LedgerEvent::Transfer { from: dave, to: erin, value: wei(40) })
            .event(LedgerEvent::SlotClaimed {
                slot: 1,
                owner: dave,
                delegate: erin,
                new_bid: wei(3),
                old_bid: U256::ZERO,
                tax_numerator: 1,
                tax_denominator: 100,
                expiration_time: GENESIS_TIME + 1000,
            })
            .event(LedgerEvent::MerkleRootUpdated {
                distribution_number: U256::from(1),
                merkle_root: B256::repeat_byte(1),
                metadata_uri: "ipfs://one".into(),
                token_total: wei(10),
            })
            .build(),
        BundleBuilder::new(2, OTHER)
            .event(LedgerEvent::SlotClaimed {
                slot: 1,
                owner: erin,
                delegate: erin,
                new_bid: wei(4),
                old_bid: wei(3),
                tax_numerator: 1,
                tax_denominator: 100,
                expiration_time: GENESIS_TIME + 2000,
            })
            .event(LedgerEvent::MerkleRootUpdated {
                distribution_number: U256::from(2),
                merkle_root: B256::repeat_byte(2),
                metadata_uri: "ipfs://two".into(),
                token_total: wei(20),
            })
            .event(LedgerEvent::Claimed {
                index: U256::ZERO,
                account: dave,
                total_earned: wei(10),
                claimed: wei(10),
            })
            .event(LedgerEvent::Slashed { account: erin, slashed: wei(1) })
            .event(LedgerEvent::DebtChanged { new_debt: wei(7) })
            .build(),
        BundleBuilder::new(3, OTHER)
            .event(LedgerEvent::Claimed {
                index: U256::from(1),
                account: erin,
                total_earned: wei(5),
                claimed: wei(5),
            })
            .event(LedgerEvent::SlotDelegateUpdated { slot: 1, new_delegate: dave })
            .build(),
    ]
}

#[test]
fn distribution_token_and_slot_queries() {
    let dave = Address::repeat_byte(0xd1);
    let erin = Address::repeat_byte(0xe2);
    let ctx = LedgerContext { page_size: 1, ..LedgerContext::ropsten() };
    let mut ledger = Ledger::new(ctx);
    apply_all(&mut ledger, &mixed_chain());
    let query = HistoricalQuery::new(ledger.store(), ledger.context());

    let first = query.current_distribution(BlockSelector::Number(1)).unwrap().unwrap();
    assert_eq!(first.distribution_number, U256::from(1));
    let current = query.current_distribution(BlockSelector::Latest).unwrap().unwrap();
    assert_eq!(current.metadata_uri, "ipfs://two");
    let numbers: Vec<U256> = query
        .distributions(BlockSelector::Latest)
        .unwrap()
        .into_iter()
        .map(|distribution| distribution.distribution_number)
        .collect();
    assert_eq!(numbers, vec![U256::from(1), U256::from(2)]);
    assert!(query.distribution(U256::from(2), BlockSelector::Number(1)).unwrap().is_none());
    assert_eq!(query.distributor(BlockSelector::Latest).unwrap().unwrap().debt_total, wei(7));

    assert_eq!(query.claims(None, BlockSelector::Latest).unwrap().len(), 2);
    assert_eq!(query.claims(Some(erin), BlockSelector::Latest).unwrap().len(), 1);
    assert_eq!(query.slashes(Some(dave), BlockSelector::Latest).unwrap().len(), 0);
    assert_eq!(query.accounts(BlockSelector::Latest).unwrap().len(), 2);

    assert_eq!(query.balance(dave, BlockSelector::Latest).unwrap(), wei(60));
    assert_eq!(query.balance(Address::repeat_byte(0x99), BlockSelector::Latest).unwrap(), U256::ZERO);
    let holders: Vec<Address> = query
        .balances(BlockSelector::Latest)
        .unwrap()
        .into_iter()
        .map(|balance| balance.account)
        .collect();
    assert_eq!(holders, vec![dave, erin]);
    let token = query.token_stats(BlockSelector::Latest).unwrap().unwrap();
    assert_eq!((token.total_supply, token.circulating_supply), (wei(100), wei(100)));

    let slots = query.slots(BlockSelector::Latest).unwrap();
    assert!(slots[0].is_none() && slots[2].is_none());
    let slot = slots[1].as_ref().unwrap();
    assert_eq!((slot.owner, slot.delegate, slot.num_claims), (erin, dave, 2));
    let claims = query.slot_claims(1, BlockSelector::Latest).unwrap();
    assert_eq!(claims.iter().map(|claim| claim.index).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(claims[0].owner, dave);
    assert_eq!(query.slot_claims(1, BlockSelector::Number(1)).unwrap().len(), 1);
}

#[test]
fn replaying_the_same_blocks_yields_the_same_state() {
    let bundles = mixed_chain();
    let mut once = Ledger::new(LedgerContext::ropsten());
    let mut twice = Ledger::new(LedgerContext::ropsten());
    let oracle = balances(&[]);

    for bundle in &bundles {
        once.apply_block(bundle, &oracle).unwrap();
        twice.apply_block(bundle, &oracle).unwrap();
        assert_eq!(twice.apply_block(bundle, &oracle).unwrap(), BlockOutcome::AlreadyCommitted);
    }
    for bundle in &bundles {
        assert_eq!(twice.apply_block(bundle, &oracle).unwrap(), BlockOutcome::AlreadyCommitted);
    }

    for kind in EntityKind::ALL {
        assert_eq!(once.store().scan(*kind), twice.store().scan(*kind), "{kind} diverged");
    }
    assert_eq!(once.store().head(), twice.store().head());
}
