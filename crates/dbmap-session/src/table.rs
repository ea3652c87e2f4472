//! Whole-table statements, selects and schema DDL.

use std::any::Any;

use dbmap_core::{Driver, Error, Result, Row};
use dbmap_query::{Cursor, Page};

use crate::Session;

impl<D: Driver> Session<D> {
    fn decode_rows<T: Any>(&self, rows: &[Row]) -> Result<Vec<T>> {
        let mapper = self.db.mapper();
        rows.iter().map(|row| mapper.decode::<T>(row)).collect()
    }

    fn registered_schema(&self, schema: &str) -> Result<()> {
        if self.db.mapper().schemas().iter().any(|s| s == schema) {
            return Ok(());
        }
        Err(Error::lookup(format!("schema '{schema}' is not registered")))
    }

    /// Create the table of `T` unless it exists. Returns the affected row count,
    /// which is 0 for DDL on every supported driver.
    #[tracing::instrument(level = "debug", skip(self), fields(table = std::any::type_name::<T>()))]
    pub fn create_table<T: Any>(&mut self) -> Result<u64> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let query = db.dialect().create_table(db.mapper(), table)?;
        self.run_update(&query)
    }

    #[tracing::instrument(level = "debug", skip(self), fields(table = std::any::type_name::<T>()))]
    pub fn drop_table<T: Any>(&mut self, cascade: bool) -> Result<u64> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        self.run_update(&db.dialect().drop_table(table, cascade))
    }

    /// Delete every row of `T`'s table. Returns the number of deleted rows.
    #[tracing::instrument(level = "debug", skip(self), fields(table = std::any::type_name::<T>()))]
    pub fn delete_table<T: Any>(&mut self) -> Result<u64> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        self.run_update(&db.dialect().delete_table(table))
    }

    #[tracing::instrument(level = "debug", skip(self), fields(table = std::any::type_name::<T>()))]
    pub fn select_all<T: Any>(&mut self) -> Result<Vec<T>> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let rows = self.run_query(&db.dialect().select_all(table))?;
        self.decode_rows(&rows)
    }

    /// Row of `T` whose primary key equals `pk`. `pk` is the key's domain
    /// value, e.g. `i32` for an `Option<i32>` key.
    #[tracing::instrument(level = "debug", skip(self, pk), fields(table = std::any::type_name::<T>()))]
    pub fn select_by_pk<T: Any, K: Any>(&mut self, pk: &K) -> Result<Option<T>> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let query = db.dialect().select_by_pk(table, pk)?;
        let rows = self.run_query(&query)?;
        rows.first().map(|row| db.mapper().decode::<T>(row)).transpose()
    }

    /// One page of rows ordered by `page.order_by`.
    #[tracing::instrument(level = "debug", skip(self), fields(table = std::any::type_name::<T>()))]
    pub fn select_page<T: Any>(&mut self, page: &Page) -> Result<Vec<T>> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let rows = self.run_query(&db.dialect().select_page(table, page)?)?;
        self.decode_rows(&rows)
    }

    /// Rows at or past the cursor's index in its sort order.
    #[tracing::instrument(level = "debug", skip(self), fields(table = std::any::type_name::<T>()))]
    pub fn select_cursor<T: Any>(&mut self, cursor: &Cursor) -> Result<Vec<T>> {
        let db = self.db.clone();
        let table = db.mapper().table::<T>()?;
        let rows = self.run_query(&db.dialect().select_cursor(table, cursor)?)?;
        self.decode_rows(&rows)
    }

    /// Create a registered schema unless it exists.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn create_schema(&mut self, schema: &str) -> Result<u64> {
        self.registered_schema(schema)?;
        let query = self.db.dialect().create_schema(schema)?;
        self.run_update(&query)
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub fn drop_schema(&mut self, schema: &str, cascade: bool) -> Result<u64> {
        self.registered_schema(schema)?;
        let query = self.db.dialect().drop_schema(schema, cascade)?;
        self.run_update(&query)
    }
}
