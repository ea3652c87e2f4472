//! Oracle Database.
//!
//! Schemas are users. Identity keys are read back by naming the key column to
//! the driver; there is no connection-level "last id" function.

use std::any::Any;

use dbmap_core::{GeneratedKeys, PrimaryColumn, ProcedureInfo, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, KeyRetrieval, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct Oracle;

impl Escape for Oracle {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '"', '"')
    }
}

impl Dialect for Oracle {
    fn name(&self) -> &'static str {
        "oracle"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::oracle()
    }

    fn create_table_prefix(&self) -> &'static str {
        "CREATE TABLE"
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        if primary.auto_increment {
            format!(
                "{} {} GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY",
                self.escape(&primary.column.name),
                primary.column.db_type()
            )
        } else {
            common::manual_primary_key(self, primary)
        }
    }

    fn supports_cascade_update(&self) -> bool {
        false
    }

    fn drop_cascade(&self) -> Option<&'static str> {
        Some(" CASCADE CONSTRAINTS")
    }

    fn supports_drop_if_exists(&self) -> bool {
        false
    }

    fn limit_clause(&self, limit: u64, offset: Option<u64>) -> String {
        format!(
            "OFFSET {} ROWS FETCH NEXT {limit} ROWS ONLY",
            offset.unwrap_or(0)
        )
    }

    fn insert_row(&self, table: &TableInfo, row: &dyn Any, _batch: bool) -> Result<Query> {
        common::insert_defaults(self, table, row)
    }

    fn key_retrieval(&self, table: &TableInfo) -> KeyRetrieval {
        KeyRetrieval::DriverKeys(GeneratedKeys::Column(table.primary.column.name.clone()))
    }

    fn create_schema(&self, schema: &str) -> Result<Query> {
        Ok(Query::new(format!(
            "CREATE USER {} NO AUTHENTICATION",
            self.escape(schema)
        )))
    }

    fn drop_schema(&self, schema: &str, cascade: bool) -> Result<Query> {
        let cascade = if cascade { " CASCADE" } else { "" };
        Ok(Query::new(format!(
            "DROP USER {}{cascade}",
            self.escape(schema)
        )))
    }

    fn create_procedure(&self, procedure: &ProcedureInfo, body: &str) -> Result<Query> {
        let args: Vec<String> = procedure
            .args
            .iter()
            .map(|a| format!("{} IN {}", self.escape(&a.name), a.db_type()))
            .collect();
        Ok(Query::new(format!(
            "CREATE OR REPLACE PROCEDURE {}({})\nIS\nBEGIN\n{}\nEND;",
            common::procedure_path(self, procedure),
            args.join(", "),
            common::indent(body)
        )))
    }

    fn drop_procedure(&self, procedure: &ProcedureInfo) -> Result<Query> {
        Ok(Query::new(format!(
            "DROP PROCEDURE {}",
            common::procedure_path(self, procedure)
        )))
    }

    fn call_procedure(&self, procedure: &ProcedureInfo, args: &dyn Any) -> Result<Query> {
        Ok(Query::with_values(
            format!(
                "CALL {}({})",
                common::procedure_path(self, procedure),
                common::placeholders(procedure.args.len())
            ),
            common::procedure_args(procedure, args)?,
        ))
    }
}
