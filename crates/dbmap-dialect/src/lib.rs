//! SQL generation for the databases dbmap supports.
//!
//! A [`Dialect`] turns resolved table metadata into [`Query`] values. It never
//! talks to a driver: every method is a pure function of the mapper's metadata
//! and the rows handed to it. Most SQL is shared (see [`common`]); each
//! database overrides only the pieces where its syntax differs.
//!
//! | Dialect    | Escape      | Auto-increment primary key                 |
//! |------------|-------------|--------------------------------------------|
//! | [`Sqlite`]   | `"x"`       | `INTEGER PRIMARY KEY AUTOINCREMENT`        |
//! | [`Postgres`] | `"x"`       | `SERIAL PRIMARY KEY`                       |
//! | [`Mysql`]    | `` `x` ``   | `INTEGER PRIMARY KEY AUTO_INCREMENT`       |
//! | [`Maria`]    | `` `x` ``   | `INTEGER PRIMARY KEY AUTO_INCREMENT`       |
//! | [`Mssql`]    | `[x]`       | `INTEGER PRIMARY KEY IDENTITY(1,1)`        |
//! | [`Oracle`]   | `"x"`       | `GENERATED BY DEFAULT AS IDENTITY`         |
//! | [`Db2`]      | `"x"`       | `GENERATED BY DEFAULT AS IDENTITY`         |
//! | [`H2`]       | `"x"`       | `AUTO_INCREMENT PRIMARY KEY`               |
//! | [`Derby`]    | `"x"`       | `GENERATED ALWAYS AS IDENTITY(..)`         |

use std::any::Any;
use std::fmt;

use dbmap_core::{
    Error, GeneratedKeys, Mapper, PrimaryColumn, ProcedureInfo, Result, TableInfo, TypeSerializer,
};
use dbmap_query::{Cursor, Escape, Page, Query};

pub mod common;
pub mod db2;
pub mod derby;
pub mod h2;
pub mod maria;
pub mod mssql;
pub mod mysql;
pub mod oracle;
pub mod postgres;
pub mod serializers;
pub mod sqlite;

pub use db2::Db2;
pub use derby::Derby;
pub use h2::H2;
pub use maria::Maria;
pub use mssql::Mssql;
pub use mysql::Mysql;
pub use oracle::Oracle;
pub use postgres::Postgres;
pub use sqlite::Sqlite;

/// How the key of a freshly inserted row gets back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRetrieval {
    /// The INSERT itself returns the key as a one-column result set.
    Returning,
    /// The driver reports generated keys after the INSERT.
    DriverKeys(GeneratedKeys),
}

/// SQL syntax of one database.
///
/// Only [`Dialect::name`], [`Dialect::serializers`] and [`Escape::escape`] are
/// required; everything else defaults to the ANSI-ish forms most databases
/// accept.
pub trait Dialect: Escape + fmt::Debug + Send + Sync {
    /// Short lowercase name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Default serializers, appended after the application's global list.
    fn serializers(&self) -> Vec<TypeSerializer>;

    /// Whether the database can generate UUID primary keys.
    fn allows_auto_uuid(&self) -> bool {
        false
    }

    // ========================================================================
    // Syntax knobs
    // ========================================================================

    fn create_table_prefix(&self) -> &'static str {
        "CREATE TABLE IF NOT EXISTS"
    }

    /// Column definition of the primary key, including any identity clause.
    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        common::manual_primary_key(self, primary)
    }

    /// Name of the referenced table inside a FOREIGN KEY clause.
    fn reference_path(&self, target: &TableInfo) -> String {
        common::table_path(self, target)
    }

    fn supports_cascade_update(&self) -> bool {
        true
    }

    /// Suffix of `DROP TABLE` when cascading, `None` if the database has none.
    fn drop_cascade(&self) -> Option<&'static str> {
        Some(" CASCADE")
    }

    fn supports_drop_if_exists(&self) -> bool {
        true
    }

    /// Tail of an INSERT that has no columns to set.
    fn empty_insert(&self) -> &'static str {
        "DEFAULT VALUES"
    }

    fn limit_clause(&self, limit: u64, offset: Option<u64>) -> String {
        match offset {
            Some(offset) => format!("LIMIT {limit} OFFSET {offset}"),
            None => format!("LIMIT {limit}"),
        }
    }

    // ========================================================================
    // Tables
    // ========================================================================

    fn create_table(&self, mapper: &Mapper, table: &TableInfo) -> Result<Query> {
        common::create_table(self, mapper, table)
    }

    fn drop_table(&self, table: &TableInfo, cascade: bool) -> Query {
        common::drop_table(self, table, cascade)
    }

    /// Remove every row, keep the table.
    fn delete_table(&self, table: &TableInfo) -> Query {
        Query::new(format!("DELETE FROM {}", common::table_path(self, table)))
    }

    fn select_all(&self, table: &TableInfo) -> Query {
        Query::new(format!("SELECT * FROM {}", common::table_path(self, table)))
    }

    /// `pk` is a bare domain value of the primary key's type.
    fn select_by_pk(&self, table: &TableInfo, pk: &dyn Any) -> Result<Query> {
        common::select_by_pk(self, table, pk)
    }

    fn select_page(&self, table: &TableInfo, page: &Page) -> Result<Query> {
        common::select_page(self, table, page)
    }

    fn select_cursor(&self, table: &TableInfo, cursor: &Cursor) -> Result<Query> {
        common::select_cursor(self, table, cursor)
    }

    // ========================================================================
    // Rows
    // ========================================================================

    /// INSERT for one row. The flag is set when the statement is reused for
    /// many rows, where no key is read back.
    fn insert_row(&self, table: &TableInfo, row: &dyn Any, _batch: bool) -> Result<Query> {
        common::insert_row(self, table, row)
    }

    fn update_row(&self, table: &TableInfo, row: &dyn Any) -> Result<Query> {
        common::update_row(self, table, row)
    }

    fn delete_row(&self, table: &TableInfo, row: &dyn Any) -> Result<Query> {
        common::delete_row(self, table, row)
    }

    /// How the generated key of `table` is read back after a single-row insert.
    fn key_retrieval(&self, _table: &TableInfo) -> KeyRetrieval {
        KeyRetrieval::DriverKeys(GeneratedKeys::Any)
    }

    /// Statement returning the last generated key of this connection, used when
    /// the driver reports none.
    fn select_last_id(&self, _table: &TableInfo) -> Option<Query> {
        None
    }

    /// What to ask the driver for when preparing the INSERT of `table`.
    fn generated_keys(&self, table: &TableInfo) -> GeneratedKeys {
        if !table.primary.is_auto() {
            return GeneratedKeys::None;
        }
        match self.key_retrieval(table) {
            KeyRetrieval::Returning => GeneratedKeys::None,
            KeyRetrieval::DriverKeys(keys) => keys,
        }
    }

    // ========================================================================
    // Schemas
    // ========================================================================

    fn create_schema(&self, schema: &str) -> Result<Query> {
        Ok(Query::new(format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            self.escape(schema)
        )))
    }

    fn drop_schema(&self, schema: &str, cascade: bool) -> Result<Query> {
        let cascade = if cascade { " CASCADE" } else { "" };
        Ok(Query::new(format!(
            "DROP SCHEMA IF EXISTS {}{cascade}",
            self.escape(schema)
        )))
    }

    // ========================================================================
    // Procedures
    // ========================================================================

    /// CREATE PROCEDURE with `body` as its statements.
    fn create_procedure(&self, _procedure: &ProcedureInfo, _body: &str) -> Result<Query> {
        Err(unsupported(self.name(), "stored procedures"))
    }

    fn drop_procedure(&self, _procedure: &ProcedureInfo) -> Result<Query> {
        Err(unsupported(self.name(), "stored procedures"))
    }

    /// Invocation binding every argument of `args` in declaration order.
    fn call_procedure(&self, _procedure: &ProcedureInfo, _args: &dyn Any) -> Result<Query> {
        Err(unsupported(self.name(), "stored procedures"))
    }
}

pub(crate) fn unsupported(dialect: &'static str, operation: &'static str) -> Error {
    Error::Unsupported { dialect, operation }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Shared registrations for the per-dialect tests.

    use dbmap_core::{
        Constraint, Mapper, Procedure, Registration, Schema, Table, TableInfo, property,
    };

    use crate::Dialect;

    #[derive(Debug, Default)]
    pub struct Parent {
        pub pk: Option<i32>,
        pub col: String,
    }

    #[derive(Debug, Default)]
    pub struct Child {
        pub pk: Option<i32>,
        pub fk: i32,
        pub col: String,
    }

    #[derive(Debug, Default)]
    pub struct Manual {
        pub pk: String,
        pub col: String,
    }

    #[derive(Debug, Default)]
    pub struct Lonely {
        pub pk: Option<i32>,
    }

    #[derive(Debug, Default)]
    pub struct Identified {
        pub pk: Option<uuid::Uuid>,
        pub col: String,
    }

    #[derive(Debug, Default)]
    pub struct Rename {
        pub pk: i32,
        pub col: String,
    }

    fn base_schema() -> Schema {
        Schema::new("main")
            .table(
                Table::new("Parent", property!(Parent, pk?))
                    .column(property!(Parent, col))
                    .constraint("pk", Constraint::AutoIncrement),
            )
            .table(
                Table::new("Child", property!(Child, pk?))
                    .foreign_key::<Parent>(property!(Child, fk))
                    .column(property!(Child, col))
                    .constraint("pk", Constraint::AutoIncrement)
                    .constraint("fk", Constraint::CascadeUpdate)
                    .constraint("fk", Constraint::CascadeDelete),
            )
            .table(Table::new("Manual", property!(Manual, pk)).column(property!(Manual, col)))
            .table(
                Table::new("Lonely", property!(Lonely, pk?))
                    .constraint("pk", Constraint::AutoIncrement),
            )
    }

    /// Mapper with the dialect's serializers over Parent, Child, Manual and Lonely.
    pub fn mapper(dialect: &dyn Dialect) -> Mapper {
        mapper_with(dialect, base_schema())
    }

    /// Same as [`mapper`] plus a table with a generated UUID key and a procedure.
    pub fn full_mapper(dialect: &dyn Dialect) -> Mapper {
        let schema = base_schema().table(
            Table::new("Identified", property!(Identified, pk?))
                .column(property!(Identified, col))
                .constraint("pk", Constraint::AutoUuid),
        );
        mapper_with(dialect, schema)
    }

    fn mapper_with(dialect: &dyn Dialect, schema: Schema) -> Mapper {
        let reg = Registration::new()
            .schema(schema)
            .procedure(
                Procedure::<Rename>::new("rename")
                    .arg(property!(Rename, pk))
                    .arg(property!(Rename, col)),
            )
            .dialect_serializers(dialect.serializers())
            .allow_auto_uuid(dialect.allows_auto_uuid());
        match Mapper::register(reg) {
            Ok(mapper) => mapper,
            Err(err) => panic!("fixture registration failed: {err}"),
        }
    }

    pub fn table<T: std::any::Any>(mapper: &Mapper) -> &TableInfo {
        mapper.table::<T>().unwrap()
    }
}
