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

//! Event-driven accounting for the Eden network: time-weighted stake, rankings and slot
//! auctions, epoch block rewards, merkle distributions and token supply.
//!
//! Events are applied block by block through a [Processor], which stages every write of a
//! block in a [BlockTransaction] and hands back a [Changeset] to commit into the versioned
//! [MemoryStore]. Point-in-time reads over committed state go through [HistoricalQuery].

pub mod context;
pub mod distribution;
pub mod entities;
pub mod error;
pub mod events;
pub mod fixed;
pub mod governance;
pub mod network;
pub mod processor;
pub mod query;
pub mod staking;
pub mod store;
pub mod token;

pub use context::{ContractAddresses, DampeningFork, DampeningSchedule, LedgerContext};
pub use entities::{Entity, EntityKind, Record};
pub use error::{ContextError, LedgerError, QueryError, StoreError};
pub use events::{BlockBundle, BlockHeader, EventLog, LedgerEvent, RewardScheduleEntryParams};
pub use fixed::{Decimal4, WEI};
pub use processor::{BlockOutcome, Ledger, Processor, StakeOracle};
pub use query::{BlockSelector, EpochView, HistoricalQuery, RewardScheduleView, StakeStats};
pub use store::{BlockTransaction, Changeset, MemoryStore};
