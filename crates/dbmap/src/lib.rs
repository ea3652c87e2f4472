//! dbmap: map statically declared Rust types to rows in many SQL dialects.
//!
//! Types are registered explicitly: every table names its primary key,
//! foreign keys and columns through [`property!`] descriptors, and every
//! column resolves to a [`TypeSerializer`]. [`Mapper::register`] validates the
//! whole registration once, up front. A [`Database`] pairs the mapper with a
//! [`Dialect`]; a [`Session`] runs operations on one driver connection.
//!
//! # Crates
//!
//! | Crate           | Role |
//! |-----------------|------|
//! | `dbmap-core`    | registration, mapper, serializers, values, driver contract |
//! | `dbmap-query`   | `Query`, pages, cursors and the escaping builders |
//! | `dbmap-dialect` | SQL text for SQLite, PostgreSQL, MySQL, MariaDB, SQL Server, Oracle, DB2, H2, Derby |
//! | `dbmap-session` | row, batch and transaction executor |
//! | `dbmap-sqlite`  | embedded SQLite driver (feature `sqlite`, on by default) |
//!
//! # Example
//!
//! ```ignore
//! use dbmap::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Parent {
//!     pk: Option<i32>,
//!     col: String,
//! }
//!
//! let registration = Registration::new().schema(
//!     Schema::new("main").table(
//!         Table::new("Parent", property!(Parent, pk?))
//!             .column(property!(Parent, col))
//!             .constraint("pk", Constraint::AutoIncrement),
//!     ),
//! );
//! let db = Database::new(Sqlite, registration)?;
//! let mut session = open_sqlite(&db, &SqliteConfig::memory(), SessionConfig::default())?;
//!
//! session.create_table::<Parent>()?;
//! let mut parent = Parent { pk: None, col: "a".into() };
//! session.insert(&mut parent)?;
//! let page: Vec<Parent> = session.select_page(&Page::new(0, "pk").limit(10))?;
//! ```

pub mod session;

pub use dbmap_core::{
    ColumnInfo, ColumnMeta, Constraint, DiagramOptions, Driver, DriverError, DriverResult, Error,
    ForeignColumn, GeneratedKeys, IsolationLevel, Mapper, PrimaryColumn, Procedure, ProcedureInfo,
    Property, Record, Registration, Result, Row, RowCursor, Savepoint, Schema, Statement, Table,
    TableInfo, TypeSerializer, Value, WireType, basic, property,
};
pub use dbmap_dialect::{
    Db2, Derby, Dialect, H2, KeyRetrieval, Maria, Mssql, Mysql, Oracle, Postgres, Sqlite,
};
pub use dbmap_query::{BatchQuery, Cursor, Order, Page, Query, QueryBuilder, QueryValue, SqlBuilder};
pub use session::{
    DEFAULT_BATCH_SIZE, Database, ProfileStats, QueryKind, QueryLog, QueryProfile, Session,
    SessionConfig, Transaction,
};

#[cfg(feature = "sqlite")]
pub use dbmap_sqlite::{SqliteConfig, SqliteDriver};
#[cfg(feature = "sqlite")]
pub use session::open_sqlite;

/// Everything an application needs to register types and run sessions.
pub mod prelude {
    pub use crate::{
        Constraint, Cursor, Database, Dialect, Error, IsolationLevel, Order, Page, Procedure,
        Record, Registration, Result, Schema, Session, SessionConfig, Table, TypeSerializer,
        Value, basic, property,
    };
    pub use crate::{Db2, Derby, H2, Maria, Mssql, Mysql, Oracle, Postgres, Sqlite};

    #[cfg(feature = "sqlite")]
    pub use crate::{SqliteConfig, SqliteDriver, open_sqlite};
}
