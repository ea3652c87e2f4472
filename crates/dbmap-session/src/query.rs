//! Raw SQL through the escaping builders.
//!
//! The closure receives a builder that knows the mapper and the dialect's
//! quoting rules. It returns the SQL text; values only ever enter through
//! [`QueryBuilder::input`], which binds them as placeholders.

use std::any::Any;

use dbmap_core::{Driver, Result};
use dbmap_query::{Escape, Query, QueryBuilder, SqlBuilder};

use crate::Session;

impl<D: Driver> Session<D> {
    /// Run a statement without values. Returns the affected row count.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn execute<F>(&mut self, build: F) -> Result<u64>
    where
        F: FnOnce(&SqlBuilder<'_>) -> Result<String>,
    {
        let db = self.db.clone();
        let escaper: &dyn Escape = db.dialect();
        let sql = build(&SqlBuilder::new(db.mapper(), escaper))?;
        self.run_update(&Query::new(sql))
    }

    /// Run a SELECT without values and decode every row as `OUT`, a
    /// registered table or query output.
    #[tracing::instrument(level = "debug", skip_all, fields(output = std::any::type_name::<OUT>()))]
    pub fn query<OUT: Any, F>(&mut self, build: F) -> Result<Vec<OUT>>
    where
        F: FnOnce(&SqlBuilder<'_>) -> Result<String>,
    {
        let db = self.db.clone();
        check_output::<OUT>(db.mapper())?;
        let escaper: &dyn Escape = db.dialect();
        let sql = build(&SqlBuilder::new(db.mapper(), escaper))?;
        let rows = self.run_query(&Query::new(sql))?;
        rows.iter().map(|row| db.mapper().decode::<OUT>(row)).collect()
    }

    /// Run a SELECT whose values come from the registered input `IN` and
    /// decode every row as `OUT`.
    #[tracing::instrument(level = "debug", skip_all, fields(input = std::any::type_name::<IN>(), output = std::any::type_name::<OUT>()))]
    pub fn query_with<IN: Any, OUT: Any, F>(&mut self, input: &IN, build: F) -> Result<Vec<OUT>>
    where
        F: FnOnce(&mut QueryBuilder<'_>) -> Result<String>,
    {
        let db = self.db.clone();
        check_output::<OUT>(db.mapper())?;
        let escaper: &dyn Escape = db.dialect();
        let mut builder = QueryBuilder::new(db.mapper(), escaper, input)?;
        let sql = build(&mut builder)?;
        let query = builder.build(sql);
        let rows = self.run_query(&query)?;
        rows.iter().map(|row| db.mapper().decode::<OUT>(row)).collect()
    }
}

/// Tables decode as themselves; anything else must be a registered output.
fn check_output<OUT: Any>(mapper: &dbmap_core::Mapper) -> Result<()> {
    if mapper.table::<OUT>().is_ok() {
        return Ok(());
    }
    mapper.output::<OUT>().map(|_| ())
}
