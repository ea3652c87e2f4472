//! Batched INSERT, UPDATE and DELETE.
//!
//! One SQL template per chunk of `SessionConfig::batch_size` rows. Generated
//! keys are not read back. Chunks are independent statements, so a failure
//! part way leaves earlier chunks applied unless the caller runs inside a
//! transaction.

use std::any::Any;

use dbmap_core::{Driver, Result, TableInfo};
use dbmap_query::{BatchQuery, Query};

use crate::Session;
use crate::row::insert_refusal;

/// Collect `queries` into batches of at most `size` rows sharing one template.
fn chunked(queries: Vec<Query>, size: usize) -> Vec<BatchQuery> {
    let mut batches: Vec<BatchQuery> = Vec::new();
    for query in queries {
        match batches.last_mut() {
            Some(batch) if batch.len() < size && batch.sql == query.sql => batch.push(query.values),
            _ => {
                let mut batch = BatchQuery::new(query.sql);
                batch.push(query.values);
                batches.push(batch);
            }
        }
    }
    batches
}

impl<D: Driver> Session<D> {
    fn batch_size(&self) -> usize {
        self.config.batch_size.max(1)
    }

    fn run_chunks(&mut self, table: &TableInfo, queries: Vec<Query>) -> Result<u64> {
        let batches = chunked(queries, self.batch_size());
        tracing::debug!(table = %table.name, chunks = batches.len(), "Running batch");
        let mut total = 0;
        for batch in &batches {
            total += self.run_batch(batch)?;
        }
        Ok(total)
    }

    /// Insert every row whose key state allows it, in batches.
    ///
    /// Rows with a generated key already set (or an assigned key unset) are
    /// skipped. Returns the total affected row count.
    #[tracing::instrument(level = "debug", skip(self, rows), fields(table = std::any::type_name::<T>(), rows = rows.len()))]
    pub fn insert_batch<T: Any>(&mut self, rows: &[T]) -> Result<u64> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let mut queries = Vec::with_capacity(rows.len());
        for row in rows {
            let pk = table.primary_key(row)?;
            if let Some(reason) = insert_refusal(table, &pk) {
                tracing::trace!(table = %table.name, reason, "Batch row skipped");
                continue;
            }
            queries.push(db.dialect().insert_row(table, row, true)?);
        }
        self.run_chunks(table, queries)
    }

    /// Update every row with a set key, in batches.
    #[tracing::instrument(level = "debug", skip(self, rows), fields(table = std::any::type_name::<T>(), rows = rows.len()))]
    pub fn update_batch<T: Any>(&mut self, rows: &[T]) -> Result<u64> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let mut queries = Vec::with_capacity(rows.len());
        for row in rows {
            if table.primary_key(row)?.is_null() {
                continue;
            }
            queries.push(db.dialect().update_row(table, row)?);
        }
        self.run_chunks(table, queries)
    }

    /// Delete every row with a set key, in batches.
    ///
    /// Drivers report counts per chunk, not per row, so optional keys are
    /// cleared only when every keyed row was deleted. Otherwise all keys are
    /// left as they were.
    #[tracing::instrument(level = "debug", skip(self, rows), fields(table = std::any::type_name::<T>(), rows = rows.len()))]
    pub fn delete_batch<T: Any>(&mut self, rows: &mut [T]) -> Result<u64> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let mut queries = Vec::with_capacity(rows.len());
        let mut keyed = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            if table.primary_key(row)?.is_null() {
                continue;
            }
            queries.push(db.dialect().delete_row(table, row)?);
            keyed.push(i);
        }
        let total = self.run_chunks(table, queries)?;
        if total != keyed.len() as u64 {
            tracing::debug!(deleted = total, keyed = keyed.len(), "Not every row was deleted, keeping keys");
            return Ok(total);
        }
        if table.primary.column.nullable {
            for i in keyed {
                table.primary.column.clear(&mut rows[i])?;
            }
        }
        Ok(total)
    }
}
