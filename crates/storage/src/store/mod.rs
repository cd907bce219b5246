#![forbid(unsafe_code)]

mod changelog;
mod edit;
mod entities;
mod error;
mod query;
mod requests;
mod spec;
mod support;

pub use error::StoreError;
pub use query::{Page, PageRequest, Queryable, SortDirection, SortKey};
pub use requests::*;
pub use spec::{Join, Specification};

use crate::StoreConfig;
use rusqlite::{Connection, Transaction};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use support::{Failpoints, install_schema, now_ms};

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
    config: StoreConfig,
    failpoints: Failpoints,
}

impl SqliteStore {
    /// Opens (creating if needed) the store in `storage_dir`, reading
    /// `tracklog.json` from the same directory.
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref();
        let config = StoreConfig::load_or_init(storage_dir)?;
        Self::open_with_config(storage_dir, config)
    }

    pub fn open_with_config(
        storage_dir: impl AsRef<Path>,
        config: StoreConfig,
    ) -> Result<Self, StoreError> {
        config.validate()?;
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let failpoints = Failpoints::parse(config.failpoints.as_deref().unwrap_or_default())?;
        if !failpoints.is_empty() {
            tracing::warn!(failpoints = ?config.failpoints, "store opened with armed failpoints");
        }

        let db_path = storage_dir.join(config.database_file.trim());
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        install_schema(&conn)?;
        tracing::debug!(path = %db_path.display(), "store opened");

        Ok(Self {
            conn,
            storage_dir,
            config,
            failpoints,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Runs `f` inside one transaction. `Ok` commits; an error drops the
    /// transaction, which rolls every write in it back.
    fn write<T>(
        &mut self,
        f: impl FnOnce(&TxContext<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let tx = self.conn.transaction()?;
        let ctx = TxContext {
            tx: &tx,
            failpoints: &self.failpoints,
            now_ms: now_ms(),
            change_inserts: Cell::new(0),
        };
        let out = f(&ctx)?;
        tx.commit()?;
        Ok(out)
    }
}

/// Per-call write state: the open transaction, one commit timestamp shared by
/// every row the call writes, and failpoint hit counters.
pub(crate) struct TxContext<'a> {
    tx: &'a Transaction<'a>,
    failpoints: &'a Failpoints,
    now_ms: i64,
    change_inserts: Cell<usize>,
}

impl TxContext<'_> {
    pub(in crate::store) fn tx(&self) -> &Transaction<'_> {
        self.tx
    }

    pub(in crate::store) fn now_ms(&self) -> i64 {
        self.now_ms
    }

    pub(in crate::store) fn failpoint(&self, name: &str) -> Result<(), StoreError> {
        self.failpoints.check(name, 1)
    }

    /// Counts one change-row insert and fires `after_change_insert` when its
    /// armed count is reached.
    pub(in crate::store) fn change_inserted(&self) -> Result<(), StoreError> {
        let hit = self.change_inserts.get() + 1;
        self.change_inserts.set(hit);
        self.failpoints.check("after_change_insert", hit)
    }
}
