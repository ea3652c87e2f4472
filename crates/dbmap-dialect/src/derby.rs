//! Apache Derby.
//!
//! Derby knows neither `IF [NOT] EXISTS` nor stored procedures written in SQL.

use std::any::Any;

use dbmap_core::{PrimaryColumn, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct Derby;

impl Escape for Derby {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '"', '"')
    }
}

impl Dialect for Derby {
    fn name(&self) -> &'static str {
        "derby"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::derby()
    }

    fn create_table_prefix(&self) -> &'static str {
        "CREATE TABLE"
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        if primary.auto_increment {
            format!(
                "{} {} PRIMARY KEY GENERATED ALWAYS AS IDENTITY(Start with 1, Increment by 1)",
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

    fn supports_drop_if_exists(&self) -> bool {
        false
    }

    fn limit_clause(&self, limit: u64, offset: Option<u64>) -> String {
        format!(
            "OFFSET {} ROWS FETCH FIRST {limit} ROWS ONLY",
            offset.unwrap_or(0)
        )
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

    fn drop_schema(&self, schema: &str, _cascade: bool) -> Result<Query> {
        Ok(Query::new(format!(
            "DROP SCHEMA {} RESTRICT",
            self.escape(schema)
        )))
    }
}
