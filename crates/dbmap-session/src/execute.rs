//! Statement execution against the driver.
//!
//! Every statement and row cursor opened here is closed on every exit path.
//! Close failures are logged and never replace the error that caused the exit.

use std::time::{Duration, Instant};

use dbmap_core::{
    Driver, DriverError, DriverResult, Error, GeneratedKeys, Result, Row, RowCursor, Statement,
    Value,
};
use dbmap_query::{BatchQuery, Query, QueryValue};

use crate::Session;
use crate::profiler::QueryKind;

fn bind_values(stmt: &mut (dyn Statement + '_), values: &[QueryValue]) -> DriverResult<()> {
    for (i, v) in values.iter().enumerate() {
        stmt.bind(i + 1, v.wire, &v.value)?;
    }
    Ok(())
}

fn drain(cursor: &mut (dyn RowCursor + '_)) -> DriverResult<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = cursor.next_row()? {
        rows.push(row);
    }
    Ok(rows)
}

fn close_statement(stmt: &mut (dyn Statement + '_), sql: &str) {
    if let Err(err) = stmt.close() {
        tracing::warn!(error = %err, sql, "Failed to close statement");
    }
}

fn close_cursor(cursor: &mut (dyn RowCursor + '_), sql: &str) {
    if let Err(err) = cursor.close() {
        tracing::warn!(error = %err, sql, "Failed to close result cursor");
    }
}

fn fetch(stmt: &mut (dyn Statement + '_), query: &Query) -> DriverResult<Vec<Row>> {
    bind_values(stmt, &query.values)?;
    let mut cursor = stmt.execute_query()?;
    let rows = drain(cursor.as_mut());
    close_cursor(cursor.as_mut(), &query.sql);
    rows
}

fn fail(query: &Query, source: DriverError) -> Error {
    Error::driver(query.sql.clone(), query.raw_values(), source)
}

/// Values of the row that failed to bind, if any. A failed batch execution
/// names no row, since drivers do not report which one was rejected.
fn batch_failure(batch: &BatchQuery, row: Option<usize>, source: DriverError) -> Error {
    let values = row
        .and_then(|i| batch.rows.get(i))
        .map(|row| row.iter().map(|v| v.value.clone()).collect())
        .unwrap_or_default();
    if let Some(i) = row {
        tracing::debug!(row = i, sql = %batch.sql, "Batch row failed to bind");
    }
    Error::driver(batch.sql.clone(), values, source)
}

impl<D: Driver> Session<D> {
    fn record(&mut self, kind: QueryKind, sql: &str, elapsed: Duration) {
        if let Some(log) = self.log.as_mut() {
            log.record(kind, sql, elapsed);
        }
    }

    /// Run a row-count statement.
    pub(crate) fn run_update(&mut self, query: &Query) -> Result<u64> {
        tracing::debug!(sql = %query.sql, values = query.values.len(), "Executing update");
        let start = Instant::now();
        let result = {
            let mut stmt = self
                .driver
                .prepare(&query.sql, &GeneratedKeys::None)
                .map_err(|e| fail(query, e))?;
            let result = bind_values(stmt.as_mut(), &query.values)
                .and_then(|()| stmt.execute_update());
            close_statement(stmt.as_mut(), &query.sql);
            result
        };
        self.record(QueryKind::Update, &query.sql, start.elapsed());
        let count = result.map_err(|e| fail(query, e))?;
        tracing::trace!(affected = count, "Update finished");
        Ok(count)
    }

    /// Run a statement returning rows and collect all of them.
    pub(crate) fn run_query(&mut self, query: &Query) -> Result<Vec<Row>> {
        tracing::debug!(sql = %query.sql, values = query.values.len(), "Executing query");
        let start = Instant::now();
        let result = {
            let mut stmt = self
                .driver
                .prepare(&query.sql, &GeneratedKeys::None)
                .map_err(|e| fail(query, e))?;
            let result = fetch(stmt.as_mut(), query);
            close_statement(stmt.as_mut(), &query.sql);
            result
        };
        self.record(QueryKind::Query, &query.sql, start.elapsed());
        let rows = result.map_err(|e| fail(query, e))?;
        tracing::trace!(rows = rows.len(), "Query finished");
        Ok(rows)
    }

    /// Run an INSERT and read back the generated key the driver reports.
    ///
    /// A driver that fails to report the key is not an error here; the caller
    /// decides whether a fallback exists.
    pub(crate) fn run_insert(
        &mut self,
        query: &Query,
        keys: &GeneratedKeys,
    ) -> Result<(u64, Option<Value>)> {
        tracing::debug!(sql = %query.sql, values = query.values.len(), keys = ?keys, "Executing insert");
        let start = Instant::now();
        let result = {
            let mut stmt = self
                .driver
                .prepare(&query.sql, keys)
                .map_err(|e| fail(query, e))?;
            let result = bind_values(stmt.as_mut(), &query.values)
                .and_then(|()| stmt.execute_update())
                .map(|count| {
                    if count == 0 || *keys == GeneratedKeys::None {
                        return (count, None);
                    }
                    match stmt.generated_key() {
                        Ok(key) => (count, key),
                        Err(err) => {
                            tracing::warn!(error = %err, sql = %query.sql, "Driver could not report the generated key");
                            (count, None)
                        }
                    }
                });
            close_statement(stmt.as_mut(), &query.sql);
            result
        };
        self.record(QueryKind::Update, &query.sql, start.elapsed());
        result.map_err(|e| fail(query, e))
    }

    /// Run one template for every value row, returning the summed row count.
    pub(crate) fn run_batch(&mut self, batch: &BatchQuery) -> Result<u64> {
        if batch.is_empty() {
            return Ok(0);
        }
        tracing::debug!(sql = %batch.sql, rows = batch.len(), "Executing batch");
        let start = Instant::now();
        let mut bound = 0;
        let result = {
            let mut stmt = self
                .driver
                .prepare(&batch.sql, &GeneratedKeys::None)
                .map_err(|e| batch_failure(batch, None, e))?;
            let result = batch
                .rows
                .iter()
                .try_for_each(|row| -> DriverResult<()> {
                    bind_values(stmt.as_mut(), row)?;
                    stmt.add_batch()?;
                    bound += 1;
                    Ok(())
                })
                .and_then(|()| stmt.execute_batch());
            close_statement(stmt.as_mut(), &batch.sql);
            result
        };
        self.record(QueryKind::Batch, &batch.sql, start.elapsed());
        let failed_row = (bound < batch.len()).then_some(bound);
        let counts = result.map_err(|e| batch_failure(batch, failed_row, e))?;
        let total = counts.iter().sum();
        tracing::trace!(rows = batch.len(), affected = total, "Batch finished");
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{self, MockDriver};
    use crate::{Session, SessionConfig};
    use dbmap_core::{ColumnMeta, WireType};
    use std::sync::Arc;

    fn session(driver: MockDriver) -> Session<MockDriver> {
        Session::with_config(mock::database(), driver, SessionConfig::default().profile(true))
    }

    #[test]
    fn test_values_bound_in_order() {
        let driver = MockDriver::new();
        let mut session = session(driver.clone());
        let query = Query::new("UPDATE t SET a = ? WHERE b = ?")
            .value(QueryValue::new("a", Value::Text("x".into()), WireType::Varchar))
            .value(QueryValue::new("b", Value::Null, WireType::Integer));
        session.run_update(&query).unwrap();

        let log = driver.log();
        assert_eq!(log.statements(), vec!["UPDATE t SET a = ? WHERE b = ?"]);
        assert_eq!(
            log.binds[0],
            vec![
                (1, WireType::Varchar, Value::Text("x".into())),
                (2, WireType::Integer, Value::Null),
            ]
        );
        assert_eq!(log.closed_statements, 1);
    }

    #[test]
    fn test_driver_failure_carries_sql_and_closes() {
        let driver = MockDriver::new();
        driver.fail_on("DELETE");
        let mut session = session(driver.clone());
        let query = Query::new("DELETE FROM t WHERE pk = ?")
            .value(QueryValue::new("pk", Value::Int(3), WireType::Integer));
        let err = session.run_update(&query).unwrap_err();
        match err {
            Error::Driver { sql, values, .. } => {
                assert_eq!(sql, "DELETE FROM t WHERE pk = ?");
                assert_eq!(values, vec![Value::Int(3)]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(driver.log().closed_statements, 1);
    }

    #[test]
    fn test_close_failure_does_not_mask_result() {
        let driver = MockDriver::new();
        driver.fail_close();
        let columns: Arc<[ColumnMeta]> = Arc::from(vec![ColumnMeta::new("n", None)]);
        driver.push_rows(vec![Row::new(columns, vec![Value::BigInt(1)])]);
        let mut session = session(driver.clone());
        let rows = session.run_query(&Query::new("SELECT n")).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(driver.log().closed_cursors, 1);
    }

    #[test]
    fn test_batch_sums_counts_and_profiles() {
        let driver = MockDriver::new();
        let mut session = session(driver.clone());
        let mut batch = BatchQuery::new("DELETE FROM t WHERE pk = ?");
        for pk in 0..3 {
            batch.push(vec![QueryValue::new("pk", Value::Int(pk), WireType::Integer)]);
        }
        assert_eq!(session.run_batch(&batch).unwrap(), 3);
        assert_eq!(driver.log().batches, vec![3]);
        assert_eq!(session.run_batch(&BatchQuery::new("DELETE")).unwrap(), 0);

        let log = session.query_log().unwrap();
        let profile = log.get(QueryKind::Batch, "DELETE FROM t WHERE pk = ?").unwrap();
        assert_eq!(profile.repetitions, 1);
    }

    fn pk_batch(keys: &[i32]) -> BatchQuery {
        let mut batch = BatchQuery::new("DELETE FROM t WHERE pk = ?");
        for pk in keys {
            batch.push(vec![QueryValue::new("pk", Value::Int(*pk), WireType::Integer)]);
        }
        batch
    }

    #[test]
    fn test_batch_bind_failure_names_that_row() {
        let driver = MockDriver::new();
        driver.fail_bind(Value::Int(2));
        let mut session = session(driver.clone());
        let err = session.run_batch(&pk_batch(&[1, 2, 3])).unwrap_err();
        match err {
            Error::Driver { values, .. } => assert_eq!(values, vec![Value::Int(2)]),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(driver.log().closed_statements, 1);
    }

    #[test]
    fn test_batch_execute_failure_names_no_row() {
        let driver = MockDriver::new();
        driver.fail_on("DELETE");
        let mut session = session(driver.clone());
        let err = session.run_batch(&pk_batch(&[1, 2])).unwrap_err();
        match err {
            Error::Driver { sql, values, .. } => {
                assert_eq!(sql, "DELETE FROM t WHERE pk = ?");
                assert!(values.is_empty());
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
