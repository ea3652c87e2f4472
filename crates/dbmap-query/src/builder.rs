//! Builders for hand-written SQL.
//!
//! [`SqlBuilder`] hands out escaped table paths and column names so raw SQL
//! never splices an unescaped identifier. [`QueryBuilder`] additionally binds
//! values from a registered input record: every value becomes a `?`
//! placeholder and a [`QueryValue`], never SQL text.
//!
//! ```ignore
//! let query = session.query_with::<Filter, Parent>(&filter, |qb| {
//!     Ok(format!(
//!         "SELECT * FROM {} WHERE {} = {}",
//!         qb.table::<Parent>()?,
//!         qb.column::<Parent>("col")?,
//!         qb.input("col")?,
//!     ))
//! })?;
//! ```

use std::any::Any;
use std::ops::Deref;

use dbmap_core::{Error, Mapper, RecordInfo, Result};

use crate::query::{Query, QueryValue};

/// Identifier escaping of one SQL dialect.
pub trait Escape {
    /// Quote one identifier, doubling embedded closing quotes.
    fn escape(&self, name: &str) -> String;

    /// `schema.table`, both escaped.
    fn table_path(&self, schema: &str, table: &str) -> String {
        format!("{}.{}", self.escape(schema), self.escape(table))
    }

    /// `schema.table.column`, all escaped.
    fn column_path(&self, schema: &str, table: &str, column: &str) -> String {
        format!("{}.{}", self.table_path(schema, table), self.escape(column))
    }
}

/// Escaped names for raw SQL without values.
#[derive(Clone, Copy)]
pub struct SqlBuilder<'a> {
    mapper: &'a Mapper,
    escaper: &'a dyn Escape,
}

impl<'a> SqlBuilder<'a> {
    pub fn new(mapper: &'a Mapper, escaper: &'a dyn Escape) -> Self {
        Self { mapper, escaper }
    }

    /// Escaped path of the table registered for `T`.
    pub fn table<T: Any>(&self) -> Result<String> {
        let table = self.mapper.table::<T>()?;
        Ok(self.escaper.table_path(&table.schema, &table.name))
    }

    /// Escaped name of a column of the table registered for `T`.
    pub fn column<T: Any>(&self, name: &str) -> Result<String> {
        let table = self.mapper.table::<T>()?;
        let column = table.column(name).ok_or_else(|| {
            Error::lookup(format!("table '{}' has no column '{name}'", table.name))
        })?;
        Ok(self.escaper.escape(&column.name))
    }

    /// Escape an arbitrary identifier.
    pub fn name(&self, name: &str) -> String {
        self.escaper.escape(name)
    }

    pub fn mapper(&self) -> &'a Mapper {
        self.mapper
    }
}

/// Builds a [`Query`] whose values come from a registered input.
pub struct QueryBuilder<'a> {
    sql: SqlBuilder<'a>,
    input: &'a dyn Any,
    record: &'a RecordInfo,
    values: Vec<QueryValue>,
}

impl<'a> QueryBuilder<'a> {
    /// Fails unless `IN` is a registered query input.
    pub fn new<IN: Any>(mapper: &'a Mapper, escaper: &'a dyn Escape, input: &'a IN) -> Result<Self> {
        let record = mapper.input::<IN>()?;
        Ok(Self {
            sql: SqlBuilder::new(mapper, escaper),
            input,
            record,
            values: Vec::new(),
        })
    }

    /// Bind `property` of the input and return its placeholder.
    pub fn input(&mut self, property: &str) -> Result<&'static str> {
        let column = self.record.column(property).ok_or_else(|| {
            Error::serializer(format!(
                "{} has no property '{property}'",
                self.record.type_name
            ))
        })?;
        let value = column.read(self.input)?;
        tracing::trace!(property, value = %value, "Bound query input");
        self.values
            .push(QueryValue::new(&column.name, value, column.wire()));
        Ok("?")
    }

    /// Escaped alias of `property` on the registered output `OUT`.
    pub fn output<OUT: Any>(&self, property: &str) -> Result<String> {
        let record = self.sql.mapper.output::<OUT>()?;
        let column = record.column(property).ok_or_else(|| {
            Error::serializer(format!(
                "{} has no property '{property}'",
                record.type_name
            ))
        })?;
        Ok(self.sql.escaper.escape(&column.name))
    }

    /// Values bound so far.
    pub fn values(&self) -> &[QueryValue] {
        &self.values
    }

    pub fn build(self, sql: impl Into<String>) -> Query {
        Query::with_values(sql, self.values)
    }
}

impl<'a> Deref for QueryBuilder<'a> {
    type Target = SqlBuilder<'a>;

    fn deref(&self) -> &Self::Target {
        &self.sql
    }
}
