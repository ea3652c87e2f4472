//! Microsoft SQL Server.
//!
//! Identifiers are bracketed. Generated UUID keys are read back with an
//! `OUTPUT INSERTED` clause; identity keys through the driver or
//! `SCOPE_IDENTITY()`.

use std::any::Any;

use dbmap_core::{GeneratedKeys, PrimaryColumn, ProcedureInfo, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, KeyRetrieval, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct Mssql;

impl Escape for Mssql {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '[', ']')
    }
}

impl Dialect for Mssql {
    fn name(&self) -> &'static str {
        "mssql"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::mssql()
    }

    fn allows_auto_uuid(&self) -> bool {
        true
    }

    fn create_table_prefix(&self) -> &'static str {
        "CREATE TABLE"
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        let name = self.escape(&primary.column.name);
        let db_type = primary.column.db_type();
        if primary.auto_increment {
            format!("{name} {db_type} PRIMARY KEY IDENTITY(1,1)")
        } else if primary.auto_uuid {
            format!("{name} {db_type} PRIMARY KEY DEFAULT NEWID()")
        } else {
            common::manual_primary_key(self, primary)
        }
    }

    fn drop_cascade(&self) -> Option<&'static str> {
        None
    }

    fn limit_clause(&self, limit: u64, offset: Option<u64>) -> String {
        format!(
            "OFFSET {} ROWS FETCH NEXT {limit} ROWS ONLY",
            offset.unwrap_or(0)
        )
    }

    fn insert_row(&self, table: &TableInfo, row: &dyn Any, batch: bool) -> Result<Query> {
        let mut query = common::insert_row(self, table, row)?;
        if !batch && table.primary.auto_uuid {
            let output = format!(
                " OUTPUT INSERTED.{}",
                self.escape(&table.primary.column.name)
            );
            // OUTPUT sits right before VALUES.
            let tail = if query.sql.ends_with(" DEFAULT VALUES") {
                " DEFAULT VALUES"
            } else {
                " VALUES ("
            };
            if let Some(at) = query.sql.rfind(tail) {
                query.sql.insert_str(at, &output);
            }
        }
        Ok(query)
    }

    fn key_retrieval(&self, table: &TableInfo) -> KeyRetrieval {
        if table.primary.auto_uuid {
            KeyRetrieval::Returning
        } else {
            KeyRetrieval::DriverKeys(GeneratedKeys::Any)
        }
    }

    fn select_last_id(&self, table: &TableInfo) -> Option<Query> {
        (!table.primary.auto_uuid).then(|| Query::new("SELECT SCOPE_IDENTITY()"))
    }

    fn create_schema(&self, schema: &str) -> Result<Query> {
        Ok(Query::new(format!(
            "IF NOT EXISTS (SELECT 1 FROM sys.schemas WHERE name = '{}')\nBEGIN\n    EXEC( 'CREATE SCHEMA {}' );\nEND",
            schema.replace('\'', "''"),
            self.escape(schema).replace('\'', "''")
        )))
    }

    fn drop_schema(&self, schema: &str, _cascade: bool) -> Result<Query> {
        Ok(Query::new(format!(
            "DROP SCHEMA IF EXISTS {}",
            self.escape(schema)
        )))
    }

    fn create_procedure(&self, procedure: &ProcedureInfo, body: &str) -> Result<Query> {
        let args: Vec<String> = procedure
            .args
            .iter()
            .map(|a| format!("@{} {}", a.name, a.db_type()))
            .collect();
        let args = if args.is_empty() {
            String::new()
        } else {
            format!(" {}", args.join(", "))
        };
        Ok(Query::new(format!(
            "CREATE OR ALTER PROCEDURE {}{args}\nAS\nBEGIN\n{}\nEND",
            common::procedure_path(self, procedure),
            common::indent(body)
        )))
    }

    fn drop_procedure(&self, procedure: &ProcedureInfo) -> Result<Query> {
        Ok(Query::new(format!(
            "DROP PROCEDURE IF EXISTS {}",
            common::procedure_path(self, procedure)
        )))
    }

    fn call_procedure(&self, procedure: &ProcedureInfo, args: &dyn Any) -> Result<Query> {
        let params: Vec<String> = procedure
            .args
            .iter()
            .map(|a| format!("@{} = ?", a.name))
            .collect();
        let params = if params.is_empty() {
            String::new()
        } else {
            format!(" {}", params.join(", "))
        };
        Ok(Query::with_values(
            format!("EXEC {}{params}", common::procedure_path(self, procedure)),
            common::procedure_args(procedure, args)?,
        ))
    }
}
