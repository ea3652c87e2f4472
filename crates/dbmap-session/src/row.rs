//! Single-row INSERT, UPDATE and DELETE.

use std::any::Any;

use dbmap_core::{Driver, DriverError, Error, Result, TableInfo, Value};
use dbmap_dialect::KeyRetrieval;
use dbmap_query::Query;

use crate::Session;

/// Why a row was refused before any SQL ran, if it was.
pub(crate) fn insert_refusal(table: &TableInfo, pk: &Value) -> Option<&'static str> {
    match (table.primary.is_auto(), pk.is_null()) {
        (true, false) => Some("generated primary key is already set"),
        (false, true) => Some("primary key is not set"),
        _ => None,
    }
}

impl<D: Driver> Session<D> {
    /// Insert `row`. A generated key is written back into it.
    ///
    /// Returns `Ok(false)` without running SQL when the row's key state does
    /// not fit the table: a generated key that is already set, or an assigned
    /// key that is not.
    #[tracing::instrument(level = "debug", skip(self, row), fields(table = std::any::type_name::<T>()))]
    pub fn insert<T: Any>(&mut self, row: &mut T) -> Result<bool> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let pk = table.primary_key(row)?;
        if let Some(reason) = insert_refusal(table, &pk) {
            tracing::debug!(table = %table.name, reason, "Insert refused");
            return Ok(false);
        }

        let query = db.dialect().insert_row(table, row, false)?;
        if !table.primary.is_auto() {
            return Ok(self.run_update(&query)? > 0);
        }

        let key = match db.dialect().key_retrieval(table) {
            KeyRetrieval::Returning => {
                let rows = self.run_query(&query)?;
                match rows.into_iter().next().and_then(|r| r.into_values().into_iter().next()) {
                    Some(key) => key,
                    None => return Ok(false),
                }
            }
            KeyRetrieval::DriverKeys(keys) => {
                let (count, key) = self.run_insert(&query, &keys)?;
                if count == 0 {
                    return Ok(false);
                }
                match key {
                    Some(key) if !key.is_null() => key,
                    _ => self.last_id(table, &query)?,
                }
            }
        };
        table.primary.column.write(row, &key)?;
        tracing::trace!(table = %table.name, key = %key, "Generated key written back");
        Ok(true)
    }

    /// Key of the row just inserted, through the dialect's fallback statement.
    fn last_id(&mut self, table: &TableInfo, insert: &Query) -> Result<Value> {
        let Some(query) = self.db.dialect().select_last_id(table) else {
            return Err(Error::driver(
                insert.sql.clone(),
                insert.raw_values(),
                DriverError::new("driver reported no generated key"),
            ));
        };
        let rows = self.run_query(&query)?;
        rows.into_iter()
            .next()
            .and_then(|r| r.into_values().into_iter().next())
            .filter(|v| !v.is_null())
            .ok_or_else(|| {
                Error::driver(
                    query.sql.clone(),
                    Vec::new(),
                    DriverError::new("last generated key query returned nothing"),
                )
            })
    }

    /// Update `row` by its primary key.
    ///
    /// `Ok(false)` without SQL when the key is unset, and when no row matched.
    #[tracing::instrument(level = "debug", skip(self, row), fields(table = std::any::type_name::<T>()))]
    pub fn update<T: Any>(&mut self, row: &T) -> Result<bool> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        if table.primary_key(row)?.is_null() {
            tracing::debug!(table = %table.name, "Update refused: primary key is not set");
            return Ok(false);
        }
        let query = db.dialect().update_row(table, row)?;
        let count = self.run_update(&query)?;
        single_row(&query, count)
    }

    /// Delete `row` by its primary key. An optional key is cleared on success.
    #[tracing::instrument(level = "debug", skip(self, row), fields(table = std::any::type_name::<T>()))]
    pub fn delete<T: Any>(&mut self, row: &mut T) -> Result<bool> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        if table.primary_key(row)?.is_null() {
            tracing::debug!(table = %table.name, "Delete refused: primary key is not set");
            return Ok(false);
        }
        let query = db.dialect().delete_row(table, row)?;
        let count = self.run_update(&query)?;
        let deleted = single_row(&query, count)?;
        if deleted && table.primary.column.nullable {
            table.primary.column.clear(row)?;
        }
        Ok(deleted)
    }

    /// [`insert`](Self::insert) every row, one statement each.
    pub fn insert_many<T: Any>(&mut self, rows: &mut [T]) -> Result<Vec<bool>> {
        rows.iter_mut().map(|row| self.insert(row)).collect()
    }

    pub fn update_many<T: Any>(&mut self, rows: &[T]) -> Result<Vec<bool>> {
        rows.iter().map(|row| self.update(row)).collect()
    }

    pub fn delete_many<T: Any>(&mut self, rows: &mut [T]) -> Result<Vec<bool>> {
        rows.iter_mut().map(|row| self.delete(row)).collect()
    }
}

/// Keyed statements touch at most one row; anything more means the key is not unique.
fn single_row(query: &Query, count: u64) -> Result<bool> {
    match count {
        0 => Ok(false),
        1 => Ok(true),
        n => Err(Error::driver(
            query.sql.clone(),
            query.raw_values(),
            DriverError::new(format!("{n} rows affected by a primary key statement")),
        )),
    }
}
