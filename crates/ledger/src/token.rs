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

//! Token balances, supply and holder accounting.
//!
//! Transfers from the zero address mint and transfers to it burn. Circulating supply only
//! moves when value crosses between a circulating account and one of the excluded accounts.

use alloy_primitives::{Address, U256};

use crate::{
    context::LedgerContext,
    entities::{address_id, Balance, Token},
    error::LedgerError,
    store::{EntityReaderExt, EntityStore, EntityStoreExt},
};

fn load_balance<S: EntityStore + ?Sized>(
    store: &S,
    token: &mut Token,
    account: Address,
) -> Result<Balance, LedgerError> {
    let id = address_id(account);
    if let Some(existing) = store.load::<Balance>(&id)? {
        return Ok(existing);
    }
    let balance = Balance { id, account, balance: U256::ZERO, index: token.num_balances };
    token.num_balances += 1;
    Ok(balance)
}

pub fn apply_transfer<S: EntityStore + ?Sized>(
    store: &mut S,
    context: &LedgerContext,
    from: Address,
    to: Address,
    value: U256,
) -> Result<(), LedgerError> {
    let token_id = context.token_id();
    let mut token = store.load::<Token>(&token_id)?.unwrap_or_else(|| Token::new(token_id));
    token.num_transfers += 1;

    if from.is_zero() {
        token.total_supply += value;
    } else {
        let mut sender = load_balance(store, &mut token, from)?;
        let was_holder = !sender.balance.is_zero();
        sender.balance =
            sender.balance.checked_sub(value).ok_or(LedgerError::InsufficientBalance {
                account: from,
                balance: sender.balance,
                value,
            })?;
        if was_holder && sender.balance.is_zero() {
            token.num_holders -= 1;
        }
        store.save(sender);
    }

    if to.is_zero() {
        token.total_supply = token.total_supply.saturating_sub(value);
    } else {
        let mut receiver = load_balance(store, &mut token, to)?;
        let was_holder = !receiver.balance.is_zero();
        receiver.balance += value;
        if !was_holder && !receiver.balance.is_zero() {
            token.num_holders += 1;
        }
        store.save(receiver);
    }

    match (context.is_non_circulating(from), context.is_non_circulating(to)) {
        (true, false) => token.circulating_supply += value,
        (false, true) => token.circulating_supply = token.circulating_supply.saturating_sub(value),
        _ => {}
    }

    store.save(token);
    Ok(())
}
