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

//! Merkle distribution bookkeeping.

use alloy_primitives::{Address, B256, U256};

use crate::{
    context::LedgerContext,
    entities::{address_id, Account, Claim, Distribution, Distributor, Slash},
    error::LedgerError,
    store::{EntityReaderExt, EntityStore, EntityStoreExt},
};

fn load_distributor<S: EntityStore + ?Sized>(
    store: &S,
    context: &LedgerContext,
) -> Result<Distributor, LedgerError> {
    let id = context.distributor_id();
    Ok(store.load::<Distributor>(&id)?.unwrap_or_else(|| Distributor::new(id)))
}

fn create_or_get_account<S: EntityStore + ?Sized>(
    store: &mut S,
    account: Address,
) -> Result<Account, LedgerError> {
    let id = address_id(account);
    match store.load::<Account>(&id)? {
        Some(existing) => Ok(existing),
        None => {
            let created = Account::new(id);
            store.save(created.clone());
            Ok(created)
        }
    }
}

/// Append a distribution and make it current. Distribution number 0 is reserved and ignored.
#[allow(clippy::too_many_arguments)]
pub fn record_distribution<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    record_id: String,
    timestamp: u64,
    distribution_number: U256,
    merkle_root: B256,
    metadata_uri: String,
    token_total: U256,
) -> Result<(), LedgerError> {
    if distribution_number.is_zero() {
        tracing::debug!("Ignoring distribution number 0 in {}", record_id);
        return Ok(());
    }
    let mut distributor = load_distributor(store, context)?;
    tracing::info!("Distribution {} published with root {}", distribution_number, merkle_root);

    distributor.current_distribution = Some(record_id.clone());
    store.save(Distribution {
        id: record_id,
        distributor: distributor.id.clone(),
        distribution_number,
        merkle_root,
        metadata_uri,
        timestamp,
        token_total,
    });
    store.save(distributor);
    Ok(())
}

pub fn record_claim<S: EntityStore + ?Sized>(
    store: &mut S,
    record_id: String,
    timestamp: u64,
    index: U256,
    account: Address,
    total_earned: U256,
    claimed: U256,
) -> Result<(), LedgerError> {
    let account = create_or_get_account(store, account)?;
    store.save(Claim { id: record_id, index, account: account.id, total_earned, claimed, timestamp });
    Ok(())
}

pub fn record_slash<S: EntityStore + ?Sized>(
    store: &mut S,
    record_id: String,
    timestamp: u64,
    account: Address,
    slashed: U256,
) -> Result<(), LedgerError> {
    let account = create_or_get_account(store, account)?;
    store.save(Slash { id: record_id, account: account.id, slashed, timestamp });
    Ok(())
}

/// Overwrite an account's totals with the values reported by the distributor.
pub fn set_account_totals<S: EntityStore + ?Sized>(
    store: &mut S,
    account: Address,
    total_claimed: U256,
    total_slashed: U256,
) -> Result<(), LedgerError> {
    let mut account = create_or_get_account(store, account)?;
    account.total_claimed = total_claimed;
    account.total_slashed = total_slashed;
    store.save(account);
    Ok(())
}

pub fn set_debt_total<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    new_debt: U256,
) -> Result<(), LedgerError> {
    let mut distributor = load_distributor(store, context)?;
    distributor.debt_total = new_debt;
    store.save(distributor);
    Ok(())
}
