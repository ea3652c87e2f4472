//! Result rows.

use std::sync::Arc;

use crate::value::Value;
use crate::wire::WireType;

/// Name and driver-reported type of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    pub name: String,
    /// `None` when the driver cannot tell.
    pub wire: Option<WireType>,
}

impl ColumnMeta {
    pub fn new(name: impl Into<String>, wire: Option<WireType>) -> Self {
        Self {
            name: name.into(),
            wire,
        }
    }
}

/// A single row returned by a query. Rows of one result share their column list.
#[derive(Debug, Clone)]
pub struct Row {
    columns: Arc<[ColumnMeta]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[ColumnMeta]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[ColumnMeta] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Position of a column, matched exactly first and then ignoring ASCII case.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .or_else(|| self.columns.iter().position(|c| c.name.eq_ignore_ascii_case(name)))
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    pub fn get_named(&self, name: &str) -> Option<&Value> {
        self.index_of(name).and_then(|i| self.values.get(i))
    }
}
