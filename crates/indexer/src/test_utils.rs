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


use std::sync::Arc;

use tempfile::NamedTempFile;

use crate::db::{DbError, DbObj, LedgerDb};

/// SQLite database in a temp file, removed on drop.
pub struct TestDb {
    pub db: Arc<LedgerDb>,
    _temp_file: NamedTempFile,
}

impl TestDb {
    pub async fn new() -> Result<Self, DbError> {
        let temp_file = NamedTempFile::new().map_err(|err| DbError::Error(err.into()))?;
        let db_url = format!("sqlite:{}", temp_file.path().display());
        let db = Arc::new(LedgerDb::new(&db_url).await?);

        Ok(Self { db, _temp_file: temp_file })
    }

    pub fn get_db(&self) -> DbObj {
        self.db.clone()
    }
}
