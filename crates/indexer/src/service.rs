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

use std::{collections::HashMap, sync::Arc};

use eden_ledger::{HistoricalQuery, LedgerContext, MemoryStore, Processor};
use tokio::{sync::RwLock, time::Duration};

use crate::{db::DbObj, BlockSource, ServiceError, StakeBalanceSource};

#[derive(Clone)]
pub struct IndexerServiceConfig {
    pub interval: Duration,
    pub retries: u32,
    /// First block to index when nothing has been persisted yet.
    pub start_block: u64,
}

pub struct IndexerService {
    processor: Processor,
    store: Arc<RwLock<MemoryStore>>,
    db: DbObj,
    blocks: Arc<dyn BlockSource>,
    balances: Arc<dyn StakeBalanceSource>,
    config: IndexerServiceConfig,
}

impl IndexerService {
    /// Build the service, replaying every persisted changeset into memory.
    pub async fn new(
        context: LedgerContext,
        db: DbObj,
        blocks: Arc<dyn BlockSource>,
        balances: Arc<dyn StakeBalanceSource>,
        config: IndexerServiceConfig,
    ) -> Result<Self, ServiceError> {
        let mut store = MemoryStore::new();
        let changesets = db.load_changesets().await?;
        let replayed = changesets.len();
        for changeset in changesets {
            store.commit(changeset)?;
        }
        if replayed > 0 {
            tracing::info!("Restored {} blocks up to block {:?}", replayed, store.head());
        }

        Ok(Self {
            processor: Processor::new(context),
            store: Arc::new(RwLock::new(store)),
            db,
            blocks,
            balances,
            config,
        })
    }

    pub fn context(&self) -> &LedgerContext {
        self.processor.context()
    }

    /// Shared handle on the committed ledger state.
    pub fn store(&self) -> Arc<RwLock<MemoryStore>> {
        self.store.clone()
    }

    /// Run `f` against the committed state. Indexing waits until it returns.
    pub async fn query<T>(&self, f: impl FnOnce(HistoricalQuery<'_>) -> T) -> T {
        let store = self.store.read().await;
        f(HistoricalQuery::new(&store, self.context()))
    }

    pub async fn run(&self) -> Result<(), ServiceError> {
        let mut interval = tokio::time::interval(self.config.interval);

        let mut attempt = 0;
        loop {
            interval.tick().await;

            match self.sync().await {
                Ok(_) => attempt = 0,
                Err(e) if e.is_recoverable() => {
                    attempt += 1;
                    tracing::warn!("Failed to sync blocks: {:?}, attempt number {}", e, attempt);
                }
                Err(e) => {
                    tracing::error!("Failed to sync blocks: {:?}", e);
                    return Err(e);
                }
            }
            if attempt > self.config.retries {
                tracing::error!("Aborting after {} consecutive attempts", attempt);
                return Err(ServiceError::MaxRetries);
            }
        }
    }

    /// Index every block from the next unprocessed one up to the source's latest block.
    ///
    /// Returns the last block indexed, or `None` when already caught up.
    pub async fn sync(&self) -> Result<Option<u64>, ServiceError> {
        let from_block = self.next_block().await?;
        let to_block = self.blocks.latest_block().await.map_err(ServiceError::SourceError)?;
        if to_block < from_block {
            return Ok(None);
        }

        tracing::info!("Processing blocks from {} to {}", from_block, to_block);
        for number in from_block..=to_block {
            self.process_block(number).await?;
        }
        Ok(Some(to_block))
    }

    async fn next_block(&self) -> Result<u64, ServiceError> {
        let persisted = self.db.get_last_block().await?;
        let head = self.store.read().await.head();
        if persisted != head {
            tracing::warn!(
                "Persisted last block {:?} differs from ledger head {:?}",
                persisted,
                head
            );
        }
        Ok(head.map_or(self.config.start_block, |head| head + 1))
    }

    async fn process_block(&self, number: u64) -> Result<(), ServiceError> {
        let bundle = self.blocks.block_bundle(number).await.map_err(ServiceError::SourceError)?;

        let mut balances = HashMap::new();
        for staker in bundle.stake_accounts() {
            let balance = self
                .balances
                .staked_balance(staker, number)
                .await
                .map_err(ServiceError::SourceError)?;
            balances.insert(staker, balance);
        }

        let changeset = {
            let store = self.store.read().await;
            self.processor.process_block(&store, &bundle, &balances)?
        };
        let Some(changeset) = changeset else {
            return Ok(());
        };

        tracing::debug!("Block {} wrote {} entities", number, changeset.writes.len());
        self.db.save_changeset(&changeset).await?;
        self.store.write().await.commit(changeset)?;
        Ok(())
    }
}
