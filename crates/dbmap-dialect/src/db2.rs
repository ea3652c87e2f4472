//! IBM Db2.

use std::any::Any;

use dbmap_core::{PrimaryColumn, ProcedureInfo, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct Db2;

impl Escape for Db2 {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '"', '"')
    }
}

impl Dialect for Db2 {
    fn name(&self) -> &'static str {
        "db2"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::db2()
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        if primary.auto_increment {
            format!(
                "{} {} PRIMARY KEY GENERATED BY DEFAULT AS IDENTITY NOT NULL",
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
        None
    }

    fn insert_row(&self, table: &TableInfo, row: &dyn Any, _batch: bool) -> Result<Query> {
        common::insert_defaults(self, table, row)
    }

    fn select_last_id(&self, _table: &TableInfo) -> Option<Query> {
        Some(Query::new("VALUES IDENTITY_VAL_LOCAL()"))
    }

    fn create_schema(&self, schema: &str) -> Result<Query> {
        Ok(Query::new(format!("CREATE SCHEMA {}", self.escape(schema))))
    }

    /// Db2 only drops empty schemas.
    fn drop_schema(&self, schema: &str, _cascade: bool) -> Result<Query> {
        Ok(Query::new(format!(
            "DROP SCHEMA {} RESTRICT",
            self.escape(schema)
        )))
    }

    fn create_procedure(&self, procedure: &ProcedureInfo, body: &str) -> Result<Query> {
        let args: Vec<String> = procedure
            .args
            .iter()
            .map(|a| format!("{} {}", self.escape(&a.name), a.db_type()))
            .collect();
        Ok(Query::new(format!(
            "CREATE OR REPLACE PROCEDURE {}({})\nBEGIN\n{}\nEND",
            common::procedure_path(self, procedure),
            args.join(", "),
            common::indent(body)
        )))
    }

    /// Procedures are overloadable, so the drop names the argument types.
    fn drop_procedure(&self, procedure: &ProcedureInfo) -> Result<Query> {
        let types: Vec<&str> = procedure.args.iter().map(|a| a.db_type()).collect();
        Ok(Query::new(format!(
            "DROP PROCEDURE {}({})",
            common::procedure_path(self, procedure),
            types.join(", ")
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
