//! Executor re-exports.
//!
//! `dbmap::Session` runs every row, batch, table, procedure and raw query
//! operation over one driver connection. The implementation lives in the
//! `dbmap-session` crate; this module lets applications depend on the facade
//! alone.
//!
//! With the `sqlite` feature, [`open_sqlite`] opens an embedded database and
//! returns a session over it in one step.

pub use dbmap_session::{
    DEFAULT_BATCH_SIZE, Database, ProfileStats, QueryKind, QueryLog, QueryProfile, Session,
    SessionConfig, Transaction,
};

#[cfg(feature = "sqlite")]
use dbmap_core::{Error, Result};
#[cfg(feature = "sqlite")]
use dbmap_sqlite::{SqliteConfig, SqliteDriver};

/// Open the SQLite database described by `sqlite` and start a session on it.
#[cfg(feature = "sqlite")]
pub fn open_sqlite(
    db: &Database,
    sqlite: &SqliteConfig,
    config: SessionConfig,
) -> Result<Session<SqliteDriver>> {
    let driver = SqliteDriver::open(sqlite)
        .map_err(|e| Error::driver(format!("<open {}>", sqlite.path), Vec::new(), e))?;
    Ok(Session::with_config(db.clone(), driver, config))
}
