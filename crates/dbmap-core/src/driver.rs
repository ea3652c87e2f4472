//! The driver contract.
//!
//! The mapper never talks to a database itself. A [`Driver`] owns one
//! connection, prepares [`Statement`]s, binds values by position with their
//! wire tag and hands results back as [`Row`]s. All methods are blocking.
//! Failures are plain [`DriverError`]s; the executor attaches the statement
//! text and bound values.

use serde::{Deserialize, Serialize};

use crate::error::DriverError;
use crate::row::Row;
use crate::value::Value;
use crate::wire::WireType;

/// Result alias for driver methods.
pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Which generated keys a prepared statement should make retrievable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GeneratedKeys {
    #[default]
    None,
    /// Whatever key the database generates.
    Any,
    /// The generated value of one named column.
    Column(String),
}

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
    Snapshot,
}

impl IsolationLevel {
    pub const fn as_sql(self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::Snapshot => "SNAPSHOT",
        }
    }
}

/// A named point inside a transaction that work can be rolled back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Savepoint {
    name: String,
}

impl Savepoint {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Forward-only cursor over a query result.
pub trait RowCursor {
    fn next_row(&mut self) -> DriverResult<Option<Row>>;

    fn close(&mut self) -> DriverResult<()>;
}

/// A prepared statement.
pub trait Statement {
    /// Bind `value` to the 1-based placeholder `index`. NULL is bound with `wire`.
    fn bind(&mut self, index: usize, wire: WireType, value: &Value) -> DriverResult<()>;

    /// Queue the currently bound values as one batch entry.
    fn add_batch(&mut self) -> DriverResult<()>;

    /// Run every queued entry; one affected-row count per entry.
    fn execute_batch(&mut self) -> DriverResult<Vec<u64>>;

    fn execute_update(&mut self) -> DriverResult<u64>;

    fn execute_query(&mut self) -> DriverResult<Box<dyn RowCursor + '_>>;

    /// Key generated by the last `execute_update`, if the driver exposes one.
    fn generated_key(&mut self) -> DriverResult<Option<Value>>;

    fn close(&mut self) -> DriverResult<()>;
}

/// One database connection.
pub trait Driver {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn prepare(&mut self, sql: &str, keys: &GeneratedKeys) -> DriverResult<Box<dyn Statement + '_>>;

    /// Turn autocommit off and start a transaction.
    fn begin(&mut self, isolation: Option<IsolationLevel>) -> DriverResult<()>;

    fn commit(&mut self) -> DriverResult<()>;

    fn rollback(&mut self) -> DriverResult<()>;

    fn savepoint(&mut self, savepoint: &Savepoint) -> DriverResult<()>;

    fn rollback_to(&mut self, savepoint: &Savepoint) -> DriverResult<()>;

    fn close(&mut self) -> DriverResult<()>;
}
