//! SQLite.
//!
//! SQLite has no schema DDL and no stored procedures; both fail with
//! [`Error::Unsupported`](dbmap_core::Error::Unsupported). Attached databases
//! play the role of schemas, with `main` always present.

use dbmap_core::{GeneratedKeys, PrimaryColumn, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, KeyRetrieval, common, serializers, unsupported};

#[derive(Debug, Clone, Copy, Default)]
pub struct Sqlite;

impl Escape for Sqlite {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '"', '"')
    }
}

impl Dialect for Sqlite {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::sqlite()
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        if primary.auto_increment {
            // Only a column declared exactly INTEGER aliases the rowid.
            format!(
                "{} INTEGER PRIMARY KEY AUTOINCREMENT",
                self.escape(&primary.column.name)
            )
        } else {
            common::manual_primary_key(self, primary)
        }
    }

    /// REFERENCES cannot name a schema; the target must live in the same database.
    fn reference_path(&self, target: &TableInfo) -> String {
        self.escape(&target.name)
    }

    fn drop_cascade(&self) -> Option<&'static str> {
        None
    }

    fn key_retrieval(&self, _table: &TableInfo) -> KeyRetrieval {
        KeyRetrieval::DriverKeys(GeneratedKeys::Any)
    }

    fn select_last_id(&self, _table: &TableInfo) -> Option<Query> {
        Some(Query::new("SELECT last_insert_rowid()"))
    }

    fn create_schema(&self, _schema: &str) -> Result<Query> {
        Err(unsupported(self.name(), "schema DDL"))
    }

    fn drop_schema(&self, _schema: &str, _cascade: bool) -> Result<Query> {
        Err(unsupported(self.name(), "schema DDL"))
    }
}
