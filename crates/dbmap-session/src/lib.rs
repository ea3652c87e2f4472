//! Row, batch and transaction executor for dbmap.
//!
//! A [`Database`] is the immutable part of a deployment: the validated
//! [`Mapper`] and the [`Dialect`] it generates SQL for, both shared through
//! `Arc`. A [`Session`] pairs a database with one open [`Driver`] connection
//! and runs every operation on it, in issue order.
//!
//! # Outcomes
//!
//! Hard failures are [`Error`]s. Routine refusals are not: inserting a row
//! whose generated key is already set, or updating a row whose key was never
//! assigned, returns `Ok(false)` without touching the database.
//!
//! # Example
//!
//! ```ignore
//! let db = Database::new(Sqlite, registration)?;
//! let mut session = db.session(SqliteDriver::open(&SqliteConfig::memory())?);
//!
//! session.create_table::<Parent>()?;
//! let mut parent = Parent { pk: None, col: "a".into() };
//! assert!(session.insert(&mut parent)?);
//! assert!(parent.pk.is_some());
//!
//! session.transaction(|tx| {
//!     let sp = tx.mark()?;
//!     tx.delete(&mut parent)?;
//!     tx.rollback_to(&sp)
//! })?;
//! ```

use std::fmt;
use std::sync::Arc;

use dbmap_core::{Driver, Error, IsolationLevel, Mapper, Registration, Result};
use dbmap_dialect::Dialect;
use serde::{Deserialize, Serialize};

mod batch;
mod execute;
mod procedure;
pub mod profiler;
mod query;
mod row;
mod table;
pub mod transaction;

pub use profiler::{ProfileStats, QueryKind, QueryLog, QueryProfile};
pub use transaction::Transaction;

// ============================================================================
// Configuration
// ============================================================================

/// Default number of rows sent per batch execution.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Per-session behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Rows per driver batch in `*_batch` operations. Zero is treated as one.
    pub batch_size: usize,
    /// Record every statement in a [`QueryLog`].
    pub profile: bool,
    /// Isolation used by [`Session::transaction`]. `None` keeps the driver default.
    pub isolation: Option<IsolationLevel>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            profile: false,
            isolation: None,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn profile(mut self, profile: bool) -> Self {
        self.profile = profile;
        self
    }

    #[must_use]
    pub fn isolation(mut self, isolation: IsolationLevel) -> Self {
        self.isolation = Some(isolation);
        self
    }
}

// ============================================================================
// Database
// ============================================================================

/// Validated metadata plus the dialect it is rendered in.
#[derive(Clone)]
pub struct Database {
    mapper: Arc<Mapper>,
    dialect: Arc<dyn Dialect>,
}

impl Database {
    /// Register `registration` against `dialect`.
    ///
    /// The dialect contributes its default serializers (after the
    /// application's global ones) and decides whether generated UUID keys are
    /// allowed.
    #[tracing::instrument(level = "debug", skip_all, fields(dialect = dialect.name()))]
    pub fn new(dialect: impl Dialect + 'static, registration: Registration) -> Result<Self> {
        let registration = registration
            .dialect_serializers(dialect.serializers())
            .allow_auto_uuid(dialect.allows_auto_uuid());
        let mapper = Mapper::register(registration)?;
        Ok(Self {
            mapper: Arc::new(mapper),
            dialect: Arc::new(dialect),
        })
    }

    /// Share an already registered mapper.
    pub fn from_parts(mapper: Arc<Mapper>, dialect: Arc<dyn Dialect>) -> Self {
        Self { mapper, dialect }
    }

    pub fn mapper(&self) -> &Mapper {
        &self.mapper
    }

    pub fn dialect(&self) -> &dyn Dialect {
        self.dialect.as_ref()
    }

    /// Open a session over `driver` with the default configuration.
    pub fn session<D: Driver>(&self, driver: D) -> Session<D> {
        Session::new(self.clone(), driver)
    }
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.dialect.name())
            .field("tables", &self.mapper.tables().len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Session
// ============================================================================

/// One connection and everything run on it.
pub struct Session<D: Driver> {
    db: Database,
    driver: D,
    config: SessionConfig,
    log: Option<QueryLog>,
    in_transaction: bool,
}

impl<D: Driver> Session<D> {
    pub fn new(db: Database, driver: D) -> Self {
        Self::with_config(db, driver, SessionConfig::default())
    }

    pub fn with_config(db: Database, driver: D, config: SessionConfig) -> Self {
        tracing::debug!(
            dialect = db.dialect().name(),
            driver = driver.name(),
            batch_size = config.batch_size,
            profile = config.profile,
            "Opening session"
        );
        let log = config.profile.then(QueryLog::new);
        Self {
            db,
            driver,
            config,
            log,
            in_transaction: false,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }

    /// Statements recorded so far, when profiling is on.
    pub fn query_log(&self) -> Option<&QueryLog> {
        self.log.as_ref()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Close the underlying connection.
    pub fn close(mut self) -> Result<()> {
        tracing::debug!(driver = self.driver.name(), "Closing session");
        self.driver
            .close()
            .map_err(|e| Error::driver("<close connection>", Vec::new(), e))
    }
}

impl<D: Driver> fmt::Debug for Session<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("db", &self.db)
            .field("driver", &self.driver.name())
            .field("config", &self.config)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
pub(crate) mod mock;
