//! SQL templates and their bound values.

use std::fmt;

use dbmap_core::{Value, WireType};

/// One value bound to a `?` placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryValue {
    /// Column or property the value came from; only used for display.
    pub name: String,
    pub value: Value,
    /// Tag the value is bound with, also for NULLs.
    pub wire: WireType,
}

impl QueryValue {
    pub fn new(name: impl Into<String>, value: Value, wire: WireType) -> Self {
        Self {
            name: name.into(),
            value,
            wire,
        }
    }
}

/// A SQL template and the values for its placeholders, in emission order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Query {
    pub sql: String,
    pub values: Vec<QueryValue>,
}

impl Query {
    /// A statement without placeholders.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(sql: impl Into<String>, values: Vec<QueryValue>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }

    #[must_use]
    pub fn value(mut self, value: QueryValue) -> Self {
        self.values.push(value);
        self
    }

    /// Bound values without their names, as reported in driver errors.
    pub fn raw_values(&self) -> Vec<Value> {
        self.values.iter().map(|v| v.value.clone()).collect()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)?;
        for (i, v) in self.values.iter().enumerate() {
            write!(f, "\n\t{}) {}: {} = {}", i + 1, v.name, v.wire, v.value)?;
        }
        Ok(())
    }
}

/// One template run once per value row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchQuery {
    pub sql: String,
    pub rows: Vec<Vec<QueryValue>>,
}

impl BatchQuery {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<QueryValue>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
