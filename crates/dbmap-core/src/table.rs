//! Resolved tables, procedures and records owned by the mapper.

use std::any::{Any, TypeId};
use std::fmt;

use crate::column::{ColumnInfo, ForeignColumn, PrimaryColumn};
use crate::definition::Factory;
use crate::error::{Error, Result};
use crate::row::Row;

/// Index of a table in the mapper's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub usize);

/// One registered table.
pub struct TableInfo {
    pub id: TableId,
    pub schema: String,
    pub name: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub primary: PrimaryColumn,
    pub foreign: Vec<ForeignColumn>,
    pub other: Vec<ColumnInfo>,
    pub(crate) factory: Factory,
}

impl TableInfo {
    /// True once every foreign key is bound to its target table.
    pub fn is_initialized(&self) -> bool {
        self.foreign.iter().all(|f| f.target.is_some())
    }

    /// All columns: primary key, foreign keys, then other columns.
    pub fn columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        std::iter::once(&self.primary.column)
            .chain(self.foreign.iter().map(|f| &f.column))
            .chain(self.other.iter())
    }

    /// Columns written by an INSERT: the primary key unless generated, then the rest.
    pub fn insert_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        let primary = (!self.primary.is_auto()).then_some(&self.primary.column);
        primary.into_iter().chain(self.non_key_columns())
    }

    /// Foreign keys then other columns.
    pub fn non_key_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.foreign.iter().map(|f| &f.column).chain(self.other.iter())
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns().find(|c| c.name == name)
    }

    /// Encoded primary key of `row`; `Value::Null` when unset.
    pub fn primary_key(&self, row: &dyn Any) -> Result<crate::value::Value> {
        self.primary.column.read(row)
    }

    pub fn decode(&self, row: &Row) -> Result<Box<dyn Any>> {
        decode_columns(self.type_name, self.columns(), &self.factory, row)
    }
}

impl fmt::Debug for TableInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableInfo")
            .field("id", &self.id)
            .field("schema", &self.schema)
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("primary", &self.primary)
            .field("foreign", &self.foreign)
            .field("other", &self.other)
            .finish_non_exhaustive()
    }
}

/// One registered stored procedure.
#[derive(Debug)]
pub struct ProcedureInfo {
    pub schema: Option<String>,
    pub name: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub args: Vec<ColumnInfo>,
}

/// A registered input or output shape.
pub struct RecordInfo {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub columns: Vec<ColumnInfo>,
    pub(crate) factory: Factory,
}

impl RecordInfo {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn decode(&self, row: &Row) -> Result<Box<dyn Any>> {
        decode_columns(self.type_name, self.columns.iter(), &self.factory, row)
    }
}

impl fmt::Debug for RecordInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordInfo")
            .field("type_name", &self.type_name)
            .field("columns", &self.columns)
            .finish_non_exhaustive()
    }
}

fn decode_columns<'a>(
    type_name: &str,
    columns: impl Iterator<Item = &'a ColumnInfo>,
    factory: &Factory,
    row: &Row,
) -> Result<Box<dyn Any>> {
    let mut instance = factory();
    for column in columns {
        let index = row.index_of(&column.name).ok_or_else(|| {
            Error::lookup(format!(
                "result has no column '{}' required by {type_name}",
                column.name
            ))
        })?;
        let value = &row.values()[index];
        if !value.is_null() {
            column
                .serializer
                .check_wire(&column.name, row.columns()[index].wire)?;
        }
        column.write(instance.as_mut(), value)?;
    }
    tracing::trace!(type_name, columns = row.len(), "Decoded row");
    Ok(instance)
}
