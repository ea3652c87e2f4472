//! Queries and query builders for dbmap.
//!
//! Everything that reaches a driver is a [`Query`] (or a [`BatchQuery`]): a SQL
//! template with `?` placeholders plus the values for them, each tagged with the
//! wire type it is bound with. Dialects produce queries from table metadata; the
//! builders here produce them from hand-written SQL.

pub mod builder;
pub mod page;
pub mod query;

pub use builder::{Escape, QueryBuilder, SqlBuilder};
pub use page::{Cursor, DEFAULT_LIMIT, Order, Page};
pub use query::{BatchQuery, Query, QueryValue};
