//! MySQL.

use std::any::Any;

use dbmap_core::{PrimaryColumn, ProcedureInfo, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct Mysql;

impl Mysql {
    /// `` `a` T, `b` T `` for a procedure signature.
    pub(crate) fn signature(dialect: &dyn Dialect, procedure: &ProcedureInfo) -> String {
        procedure
            .args
            .iter()
            .map(|a| format!("{} {}", dialect.escape(&a.name), a.db_type()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Escape for Mysql {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '`', '`')
    }
}

impl Dialect for Mysql {
    fn name(&self) -> &'static str {
        "mysql"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::mysql()
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        if primary.auto_increment {
            format!(
                "{} {} PRIMARY KEY AUTO_INCREMENT",
                self.escape(&primary.column.name),
                primary.column.db_type()
            )
        } else {
            common::manual_primary_key(self, primary)
        }
    }

    fn empty_insert(&self) -> &'static str {
        "() VALUES ()"
    }

    fn select_last_id(&self, _table: &TableInfo) -> Option<Query> {
        Some(Query::new("SELECT LAST_INSERT_ID()"))
    }

    /// Cascade is implied: dropping a database drops everything in it.
    fn drop_schema(&self, schema: &str, _cascade: bool) -> Result<Query> {
        Ok(Query::new(format!(
            "DROP SCHEMA IF EXISTS {}",
            self.escape(schema)
        )))
    }

    fn create_procedure(&self, procedure: &ProcedureInfo, body: &str) -> Result<Query> {
        Ok(Query::new(format!(
            "CREATE PROCEDURE IF NOT EXISTS {}({})\nBEGIN\n{}\nEND",
            common::procedure_path(self, procedure),
            Mysql::signature(self, procedure),
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
