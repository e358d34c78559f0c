pub mod config;
pub mod error;
pub mod migrations;
pub mod models;
pub mod queries;

#[cfg(test)]
mod test_support;

use anyhow::Result;
use rusqlite::{Connection, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

pub use config::{DbConfig, DbLocation};
pub use error::DbError;

pub struct Database {
    conn: Mutex<Connection>,
    posts_per_page: u32,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode for concurrent reads
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// Fresh private database that lives as long as this handle.
    pub fn open_in_memory() -> Result<Self> {
        let db = Self::init(Connection::open_in_memory()?)?;
        info!("In-memory database opened");
        Ok(db)
    }

    pub fn from_config(config: &DbConfig) -> Result<Self> {
        let mut db = match &config.location {
            DbLocation::Memory => Self::open_in_memory()?,
            DbLocation::File(path) => Self::open(path)?,
        };
        db.posts_per_page = config.posts_per_page;
        Ok(db)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            posts_per_page: config::DEFAULT_POSTS_PER_PAGE,
        })
    }

    pub fn posts_per_page(&self) -> u32 {
        self.posts_per_page
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock()?;
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock()?;
        f(&mut conn)
    }

    /// Run `f` inside one transaction. Commits if `f` succeeds; any error
    /// rolls back everything `f` wrote.
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T>,
    {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }

    /// Drop every table. The handle is unusable for queries until
    /// `migrate` runs again.
    pub fn drop_all(&self) -> Result<()> {
        self.with_conn(migrations::drop_all)
    }

    pub fn migrate(&self) -> Result<()> {
        self.with_conn(migrations::run)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned.into())
    }
}
