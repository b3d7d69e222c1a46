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


//! Indexing service that drives an [eden_ledger] ledger from a block source and persists every
//! committed block.

use eden_ledger::{LedgerError, StoreError};
use thiserror::Error;

pub mod db;
mod service;
mod source;

pub mod test_utils;

pub use db::{DbError, DbObj, IndexerDb, LedgerDb};
pub use service::{IndexerService, IndexerServiceConfig};
pub use source::{BlockSource, StakeBalanceSource};

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] DbError),

    #[error("Ledger error: {0}")]
    LedgerError(#[from] LedgerError),

    #[error("Store error: {0}")]
    StoreError(#[from] StoreError),

    #[error("Block source error: {0:?}")]
    SourceError(#[source] anyhow::Error),

    #[error("Error: {0}")]
    Error(#[from] anyhow::Error),

    #[error("Maximum retries reached")]
    MaxRetries,
}

impl ServiceError {
    /// Whether retrying the same blocks later can succeed.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ServiceError::SourceError(_))
    }
}
