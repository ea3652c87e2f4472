//! MariaDB.
//!
//! Shares MySQL's syntax except for generated UUID keys, which come back
//! through `RETURNING`, and `CREATE OR REPLACE PROCEDURE`.

use std::any::Any;

use dbmap_core::{GeneratedKeys, PrimaryColumn, ProcedureInfo, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, KeyRetrieval, Mysql, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct Maria;

impl Escape for Maria {
    fn escape(&self, name: &str) -> String {
        Mysql.escape(name)
    }
}

impl Dialect for Maria {
    fn name(&self) -> &'static str {
        "mariadb"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::maria()
    }

    fn allows_auto_uuid(&self) -> bool {
        true
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        if primary.auto_uuid {
            format!(
                "{} {} PRIMARY KEY DEFAULT UUID()",
                self.escape(&primary.column.name),
                primary.column.db_type()
            )
        } else {
            Mysql.primary_key(primary)
        }
    }

    fn empty_insert(&self) -> &'static str {
        Mysql.empty_insert()
    }

    fn insert_row(&self, table: &TableInfo, row: &dyn Any, batch: bool) -> Result<Query> {
        let mut query = common::insert_row(self, table, row)?;
        if !batch && table.primary.auto_uuid {
            query.sql.push_str(" RETURNING ");
            query.sql.push_str(&self.escape(&table.primary.column.name));
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
        if table.primary.auto_uuid {
            None
        } else {
            Mysql.select_last_id(table)
        }
    }

    fn drop_schema(&self, schema: &str, cascade: bool) -> Result<Query> {
        Mysql.drop_schema(schema, cascade)
    }

    fn create_procedure(&self, procedure: &ProcedureInfo, body: &str) -> Result<Query> {
        Ok(Query::new(format!(
            "CREATE OR REPLACE PROCEDURE {}({})\nBEGIN\n{}\nEND",
            common::procedure_path(self, procedure),
            Mysql::signature(self, procedure),
            common::indent(body)
        )))
    }

    fn drop_procedure(&self, procedure: &ProcedureInfo) -> Result<Query> {
        Mysql.drop_procedure(procedure)
    }

    fn call_procedure(&self, procedure: &ProcedureInfo, args: &dyn Any) -> Result<Query> {
        Mysql.call_procedure(procedure, args)
    }
}
