//! Shared domain types and session setup for the SQLite integration tests.

#![allow(dead_code)]

use std::sync::Once;

use dbmap::prelude::*;
use dbmap::{SqliteConfig, SqliteDriver};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Parent {
    pub pk: Option<i32>,
    pub col: String,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct Child {
    pub pk: Option<i32>,
    pub fk: i32,
    pub col: String,
}

/// Key assigned by the application.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Manual {
    pub pk: Option<String>,
    pub col: String,
}

/// Optional reference to a row of its own table.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Node {
    pub pk: Option<i32>,
    pub parent: Option<i32>,
    pub col: String,
}

/// One column per dialect default serializer.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Typed {
    pub pk: Option<i32>,
    pub flag: bool,
    pub letter: char,
    pub ratio: f64,
    pub small: i16,
    pub big: i64,
    pub data: Vec<u8>,
    pub doc: serde_json::Value,
    pub id: uuid::Uuid,
    pub note: Option<String>,
}

/// Dates, times and exact decimals.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Moment {
    pub pk: Option<i32>,
    pub day: chrono::NaiveDate,
    pub at: chrono::NaiveTime,
    pub local: chrono::NaiveDateTime,
    pub instant: chrono::DateTime<chrono::Utc>,
    pub amount: rust_decimal::Decimal,
    pub due: Option<chrono::NaiveDate>,
}

/// Result shape of aggregate queries.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Count {
    pub total: i64,
}

/// Filter input for raw queries.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ByCol {
    pub col: String,
}

pub fn registration() -> Registration {
    Registration::new()
        .schema(
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
                        .constraint("fk", Constraint::CascadeDelete),
                )
                .table(Table::new("Manual", property!(Manual, pk?)).column(property!(Manual, col)))
                .table(
                    Table::new("Node", property!(Node, pk?))
                        .foreign_key::<Node>(property!(Node, parent?))
                        .column(property!(Node, col))
                        .constraint("pk", Constraint::AutoIncrement),
                )
                .table(
                    Table::new("Typed", property!(Typed, pk?))
                        .column(property!(Typed, flag))
                        .column(property!(Typed, letter))
                        .column(property!(Typed, ratio))
                        .column(property!(Typed, small))
                        .column(property!(Typed, big))
                        .column(property!(Typed, data))
                        .column(property!(Typed, doc))
                        .column(property!(Typed, id))
                        .column(property!(Typed, note?))
                        .constraint("pk", Constraint::AutoIncrement)
                        .constraint("id", Constraint::Unique),
                )
                .table(
                    Table::new("Moment", property!(Moment, pk?))
                        .column(property!(Moment, day))
                        .column(property!(Moment, at))
                        .column(property!(Moment, local))
                        .column(property!(Moment, instant))
                        .column(property!(Moment, amount))
                        .column(property!(Moment, due?))
                        .constraint("pk", Constraint::AutoIncrement),
                ),
        )
        .input(Record::<ByCol>::new().property(property!(ByCol, col)))
        .output(Record::<Count>::new().property(property!(Count, total)))
}

static TRACING: Once = Once::new();

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn database() -> Database {
    Database::new(Sqlite, registration()).expect("register test types")
}

pub fn session_with(config: SessionConfig) -> Session<SqliteDriver> {
    init_tracing();
    dbmap::open_sqlite(&database(), &SqliteConfig::memory(), config).expect("open sqlite memory db")
}

/// In-memory session with profiling on and every table created.
pub fn session() -> Session<SqliteDriver> {
    let mut session = session_with(SessionConfig::default().profile(true));
    session.create_table::<Parent>().expect("create Parent");
    session.create_table::<Child>().expect("create Child");
    session.create_table::<Manual>().expect("create Manual");
    session.create_table::<Node>().expect("create Node");
    session.create_table::<Typed>().expect("create Typed");
    session.create_table::<Moment>().expect("create Moment");
    session
}

pub fn parents(n: usize) -> Vec<Parent> {
    (0..n)
        .map(|i| Parent {
            pk: None,
            col: format!("parent {i}"),
        })
        .collect()
}

/// Statements run so far.
pub fn statements(session: &Session<SqliteDriver>) -> u64 {
    session
        .query_log()
        .map_or(0, |log| log.stats().total_runs)
}
