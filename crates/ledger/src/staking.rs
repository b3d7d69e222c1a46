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

//! Time-weighted stake accounting.
//!
//! Raw stake is dampened into a normalized stake, and the normalized stake is integrated over
//! blocks into a cumulative value. The write side closes out the running integral every time a
//! stake changes; [cumulative_normalized_stake] reconstructs the integral over any interval from
//! two committed snapshots, and agrees with the write side.

use alloy_primitives::U256;

use crate::{
    entities::{Network, Staker},
    fixed::{RATIO_SCALE, WEI},
};

/// Dampen a raw stake (in wei): linear up to `dampening_point` whole tokens, then growing with
/// four times the square root of the excess.
pub fn normalize_stake(raw_stake: U256, dampening_point: u64) -> U256 {
    let whole = raw_stake / WEI;
    let point = U256::from(dampening_point);
    let base = whole.min(point);
    let extra = whole.saturating_sub(point);
    (base + U256::from(4) * extra.root(2)) * WEI
}

/// Close out a running integral at `block_number`.
fn accrue(normalized: U256, cumulative: &mut U256, last_block: &mut u64, block_number: u64) {
    let block_diff = if *last_block == 0 || *last_block > block_number {
        0
    } else {
        block_number - *last_block
    };
    *cumulative += normalized * U256::from(block_diff);
    *last_block = block_number;
}

/// Apply a staker's new raw stake at `block_number`.
///
/// Both integrals are closed out with the normalized stake held before the change, then the new
/// stake is substituted and the network totals move by the difference.
pub fn apply_stake_change(
    staker: &mut Staker,
    network: &mut Network,
    new_stake: U256,
    block_number: u64,
    dampening_point: u64,
) {
    accrue(
        staker.normalized_staked,
        &mut staker.cumulative_normalized_staked,
        &mut staker.cumulative_normalized_staked_last_block,
        block_number,
    );
    accrue(
        network.total_normalized_staked,
        &mut network.total_cumulative_normalized_staked,
        &mut network.total_cumulative_normalized_staked_last_block,
        block_number,
    );

    let old_stake = staker.staked;
    let old_normalized = staker.normalized_staked;
    let new_normalized = normalize_stake(new_stake, dampening_point);

    staker.staked = new_stake;
    staker.normalized_staked = new_normalized;
    network.total_staked = network.total_staked + new_stake - old_stake;
    network.total_normalized_staked = network.total_normalized_staked + new_normalized - old_normalized;
}

/// An entity carrying a block-weighted normalized stake integral.
pub trait TimeWeighted {
    fn normalized(&self) -> U256;
    fn cumulative(&self) -> U256;
    fn cumulative_last_block(&self) -> u64;
}

impl TimeWeighted for Staker {
    fn normalized(&self) -> U256 {
        self.normalized_staked
    }

    fn cumulative(&self) -> U256 {
        self.cumulative_normalized_staked
    }

    fn cumulative_last_block(&self) -> u64 {
        self.cumulative_normalized_staked_last_block
    }
}

impl TimeWeighted for Network {
    fn normalized(&self) -> U256 {
        self.total_normalized_staked
    }

    fn cumulative(&self) -> U256 {
        self.total_cumulative_normalized_staked
    }

    fn cumulative_last_block(&self) -> u64 {
        self.total_cumulative_normalized_staked_last_block
    }
}

/// Cumulative normalized stake accrued from `first_block` through `last_block`, given the
/// snapshots of the same entity at those blocks. A missing snapshot counts as zero stake.
pub fn cumulative_normalized_stake<T: TimeWeighted>(
    first: Option<&T>,
    first_block: u64,
    last: Option<&T>,
    last_block: u64,
) -> U256 {
    let start = first.map_or(U256::ZERO, |first| {
        let mut start = first.cumulative();
        if first.cumulative_last_block() < first_block {
            start += first.normalized() * U256::from(first_block - first.cumulative_last_block());
        }
        start
    });
    let Some(last) = last else {
        return U256::ZERO;
    };
    let extra_blocks = (last_block + 1).saturating_sub(last.cumulative_last_block());
    (last.cumulative() + last.normalized() * U256::from(extra_blocks)).saturating_sub(start)
}

/// Network-wide variant of [cumulative_normalized_stake].
pub fn total_cumulative_normalized_stake(
    first: Option<&Network>,
    first_block: u64,
    last: Option<&Network>,
    last_block: u64,
) -> U256 {
    cumulative_normalized_stake(first, first_block, last, last_block)
}

fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from * (1.0 - t) + to * t
}

/// Voting multiplier for a stake percentile: 1x at 0, 2x at 50, 4x at 100, linear in between.
///
/// # Panics
///
/// If `percentile` is outside `[0, 100]`.
pub fn multiplier_for_percentile(percentile: f64) -> f64 {
    assert!(
        (0.0..=100.0).contains(&percentile),
        "percentile must be within [0, 100], got {percentile}"
    );
    if percentile < 50.0 {
        lerp(1.0, 2.0, 1.0 - (50.0 - percentile) / 50.0)
    } else {
        lerp(2.0, 4.0, 1.0 - (50.0 - (percentile - 50.0)) / 50.0)
    }
}

/// Scale `wei` by `multiplier`, truncated to four decimals of the multiplier.
pub fn apply_multiplier(wei: U256, multiplier: f64) -> U256 {
    let scaled = (multiplier * RATIO_SCALE as f64).floor() as u64;
    U256::from(scaled) * wei / U256::from(RATIO_SCALE)
}
