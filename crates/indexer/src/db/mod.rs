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

use std::{str::FromStr, sync::Arc};

use async_trait::async_trait;
use eden_ledger::{Changeset, Record};
use sqlx::{
    any::{install_default_drivers, AnyConnectOptions, AnyPoolOptions},
    AnyConnection, AnyPool, Row,
};
use thiserror::Error;

const SQL_BLOCK_KEY: i64 = 0;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQL error {0:?}")]
    SqlErr(#[from] sqlx::Error),

    #[error("SQL Migration error {0:?}")]
    MigrateErr(#[from] sqlx::migrate::MigrateError),

    #[error("Invalid block number: {0}")]
    BadBlockNumb(String),

    #[error("Failed to set last block")]
    SetBlockFail,

    #[error("Invalid changeset for block {block}: {source}")]
    BadChangeset {
        block: u64,
        #[source]
        source: serde_json::Error,
    },

    #[error("Error: {0}")]
    Error(#[from] anyhow::Error),
}

/// Durable record of committed ledger blocks.
#[async_trait]
pub trait IndexerDb {
    async fn get_last_block(&self) -> Result<Option<u64>, DbError>;

    /// Persist a block's changeset and advance the last block in one transaction.
    async fn save_changeset(&self, changeset: &Changeset) -> Result<(), DbError>;

    /// Every persisted changeset, ascending by block.
    async fn load_changesets(&self) -> Result<Vec<Changeset>, DbError>;
}

pub type DbObj = Arc<dyn IndexerDb + Send + Sync>;

#[derive(Debug, Clone)]
pub struct LedgerDb {
    pub pool: AnyPool,
}

impl LedgerDb {
    /// For SQLite use a `sqlite:file_path` URL; for Postgres `postgres://`.
    pub async fn new(conn_str: &str) -> Result<Self, DbError> {
        install_default_drivers();
        let opts = AnyConnectOptions::from_str(conn_str)?;

        let pool = AnyPoolOptions::new().max_connections(7).connect_with(opts).await?;

        // apply any migrations
        sqlx::migrate!().run(&pool).await?;

        Ok(Self { pool })
    }
}

async fn upsert_last_block(conn: &mut AnyConnection, block_numb: u64) -> Result<(), DbError> {
    let res = sqlx::query(
        "INSERT INTO last_block (id, block) VALUES ($1, $2)
         ON CONFLICT (id) DO UPDATE SET block = EXCLUDED.block",
    )
    .bind(SQL_BLOCK_KEY)
    .bind(block_numb.to_string())
    .execute(conn)
    .await?;

    if res.rows_affected() == 0 {
        return Err(DbError::SetBlockFail);
    }

    Ok(())
}

#[async_trait]
impl IndexerDb for LedgerDb {
    async fn get_last_block(&self) -> Result<Option<u64>, DbError> {
        let res = sqlx::query("SELECT block FROM last_block WHERE id = $1")
            .bind(SQL_BLOCK_KEY)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = res else {
            return Ok(None);
        };

        let block_str: String = row.try_get("block")?;

        Ok(Some(block_str.parse().map_err(|_err| DbError::BadBlockNumb(block_str))?))
    }

    async fn save_changeset(&self, changeset: &Changeset) -> Result<(), DbError> {
        let writes = serde_json::to_string(&changeset.writes)
            .map_err(|source| DbError::BadChangeset { block: changeset.block, source })?;

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO ledger_changesets (block_number, block_timestamp, writes) VALUES ($1, $2, $3)
         ON CONFLICT (block_number) DO NOTHING",
        )
        .bind(changeset.block as i64)
        .bind(changeset.timestamp as i64)
        .bind(writes)
        .execute(&mut *tx)
        .await?;
        if inserted.rows_affected() == 0 {
            tracing::debug!("Changeset for block {} already saved", changeset.block);
            return Ok(());
        }

        upsert_last_block(&mut tx, changeset.block).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn load_changesets(&self) -> Result<Vec<Changeset>, DbError> {
        let rows = sqlx::query(
            "SELECT block_number, block_timestamp, writes FROM ledger_changesets
         ORDER BY block_number ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<Changeset, DbError> {
                let block = row.try_get::<i64, _>("block_number")? as u64;
                let timestamp = row.try_get::<i64, _>("block_timestamp")? as u64;
                let writes: String = row.try_get("writes")?;
                let writes = serde_json::from_str::<Vec<Record>>(&writes)
                    .map_err(|source| DbError::BadChangeset { block, source })?;
                Ok(Changeset { block, timestamp, writes })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;
    use eden_ledger::{entities::Account, Entity};

    use super::*;
    use crate::test_utils::TestDb;

    #[tokio::test]
    async fn last_block_follows_saved_changesets() {
        let test_db = TestDb::new().await.unwrap();
        let db: DbObj = test_db.get_db();

        assert!(db.get_last_block().await.unwrap().is_none());

        db.save_changeset(&Changeset { block: 20, timestamp: 240, writes: vec![] }).await.unwrap();
        assert_eq!(db.get_last_block().await.unwrap(), Some(20));

        db.save_changeset(&Changeset { block: 21, timestamp: 252, writes: vec![] }).await.unwrap();
        assert_eq!(db.get_last_block().await.unwrap(), Some(21));
    }

    #[tokio::test]
    async fn changesets_are_saved_in_block_order() {
        let test_db = TestDb::new().await.unwrap();
        let db: DbObj = test_db.get_db();

        let account = Account {
            id: "0xabc".into(),
            total_claimed: U256::from(5),
            total_slashed: U256::ZERO,
        };
        let later = Changeset { block: 9, timestamp: 108, writes: vec![account.clone().into_record()] };
        let earlier = Changeset { block: 4, timestamp: 48, writes: vec![] };

        db.save_changeset(&earlier).await.unwrap();
        db.save_changeset(&later).await.unwrap();
        assert_eq!(db.get_last_block().await.unwrap(), Some(9));

        // Saving a block twice keeps the first copy.
        db.save_changeset(&Changeset { block: 4, timestamp: 0, writes: vec![] }).await.unwrap();
        assert_eq!(db.get_last_block().await.unwrap(), Some(9));

        let loaded = db.load_changesets().await.unwrap();
        assert_eq!(loaded, vec![earlier, later]);
        assert_eq!(Account::from_record(loaded[1].writes[0].clone()).unwrap(), account);
    }
}
