//! Pagination descriptors.
//!
//! [`Page`] is offset pagination: page `n` of size `limit` skips `n * limit`
//! rows. [`Cursor`] is keyset pagination: rows at or after an index value of
//! the ordering column.

use std::any::Any;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Default number of rows per page.
pub const DEFAULT_LIMIT: u64 = 20;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl Order {
    pub const fn as_sql(self) -> &'static str {
        match self {
            Order::Asc => "ASC",
            Order::Desc => "DESC",
        }
    }
}

/// Offset page over a table, ordered by one column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Zero-based page number.
    pub number: u64,
    pub order_by: String,
    pub limit: u64,
    pub order: Order,
}

impl Page {
    pub fn new(number: u64, order_by: impl Into<String>) -> Self {
        Self {
            number,
            order_by: order_by.into(),
            limit: DEFAULT_LIMIT,
            order: Order::Asc,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    pub fn offset(&self) -> u64 {
        self.limit.saturating_mul(self.number)
    }
}

/// Keyset page: rows whose `order_by` column is at or past `index`.
pub struct Cursor {
    pub order_by: String,
    /// Domain value of the ordering column, encoded with that column's serializer.
    pub index: Box<dyn Any + Send + Sync>,
    pub limit: u64,
    pub order: Order,
}

impl Cursor {
    pub fn new(order_by: impl Into<String>, index: impl Any + Send + Sync) -> Self {
        Self {
            order_by: order_by.into(),
            index: Box::new(index),
            limit: DEFAULT_LIMIT,
            order: Order::Asc,
        }
    }

    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn order(mut self, order: Order) -> Self {
        self.order = order;
        self
    }

    /// Comparison that keeps rows on the far side of the index.
    pub fn comparison(&self) -> &'static str {
        match self.order {
            Order::Asc => ">=",
            Order::Desc => "<=",
        }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("order_by", &self.order_by)
            .field("limit", &self.limit)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
