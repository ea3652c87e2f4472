//! Pagination and raw queries on SQLite.

mod common;

use common::{ByCol, Count, Parent, parents, session};
use dbmap::prelude::*;

fn seeded(n: usize) -> Session<SqliteDriver> {
    let mut session = session();
    session.insert_batch(&parents(n)).expect("seed parents");
    session
}

#[test]
fn sqlite_page_returns_its_slice() {
    let mut session = seeded(25);
    let page = Page::new(2, "pk").limit(5);
    let rows: Vec<Parent> = session.select_page(&page).expect("select page");
    let keys: Vec<i32> = rows.iter().filter_map(|r| r.pk).collect();
    assert_eq!(keys, vec![11, 12, 13, 14, 15]);
    let cols: Vec<&str> = rows.iter().map(|r| r.col.as_str()).collect();
    assert_eq!(
        cols,
        vec!["parent 10", "parent 11", "parent 12", "parent 13", "parent 14"]
    );

    let again: Vec<Parent> = session.select_page(&page).expect("select page again");
    assert_eq!(again, rows);

    let past_end: Vec<Parent> = session
        .select_page(&Page::new(5, "pk").limit(5))
        .expect("select past end");
    assert!(past_end.is_empty());
}

#[test]
fn sqlite_descending_page() {
    let mut session = seeded(10);
    let rows: Vec<Parent> = session
        .select_page(&Page::new(0, "pk").limit(3).order(Order::Desc))
        .expect("select page");
    let keys: Vec<i32> = rows.iter().filter_map(|r| r.pk).collect();
    assert_eq!(keys, vec![10, 9, 8]);
}

#[test]
fn sqlite_cursor_pages_from_index() {
    let mut session = seeded(10);
    let rows: Vec<Parent> = session
        .select_cursor(&Cursor::new("pk", 4_i32).limit(3))
        .expect("select cursor");
    let keys: Vec<i32> = rows.iter().filter_map(|r| r.pk).collect();
    assert_eq!(keys, vec![4, 5, 6]);

    let rows: Vec<Parent> = session
        .select_cursor(&Cursor::new("pk", 4_i32).limit(3).order(Order::Desc))
        .expect("select cursor desc");
    let keys: Vec<i32> = rows.iter().filter_map(|r| r.pk).collect();
    assert_eq!(keys, vec![4, 3, 2]);
}

#[test]
fn sqlite_raw_query_with_inputs() {
    let mut session = seeded(4);
    let filter = ByCol {
        col: "parent 2".into(),
    };
    let counts: Vec<Count> = session
        .query_with(&filter, |qb| {
            let total = qb.output::<Count>("total")?;
            let table = qb.table::<Parent>()?;
            let col = qb.column::<Parent>("col")?;
            let value = qb.input("col")?;
            Ok(format!("SELECT COUNT(*) AS {total} FROM {table} WHERE {col} = {value}"))
        })
        .expect("query with input");
    assert_eq!(counts, vec![Count { total: 1 }]);

    // Input values are bound, never spliced into the SQL text.
    let hostile = ByCol {
        col: "x' OR '1'='1".into(),
    };
    let counts: Vec<Count> = session
        .query_with(&hostile, |qb| {
            let table = qb.table::<Parent>()?;
            let col = qb.column::<Parent>("col")?;
            let value = qb.input("col")?;
            Ok(format!("SELECT COUNT(*) AS total FROM {table} WHERE {col} = {value}"))
        })
        .expect("hostile input");
    assert_eq!(counts, vec![Count { total: 0 }]);
}

#[test]
fn sqlite_raw_query_decodes_tables() {
    let mut session = seeded(3);
    let rows: Vec<Parent> = session
        .query(|sql| {
            Ok(format!(
                "SELECT * FROM {} WHERE {} > 1 ORDER BY {}",
                sql.table::<Parent>()?,
                sql.name("pk"),
                sql.name("pk")
            ))
        })
        .expect("raw query");
    assert_eq!(rows.len(), 2);

    let err = session
        .query::<String, _>(|_| Ok("SELECT 1".into()))
        .expect_err("unregistered output");
    assert!(matches!(err, Error::Serializer { .. }));
}

#[test]
fn sqlite_profile_counts_repetitions() {
    let mut session = seeded(0);
    for _ in 0..3 {
        session.select_all::<Parent>().expect("select");
    }
    let log = session.query_log().expect("profiling on");
    let select = log
        .profiles()
        .into_iter()
        .find(|p| p.sql.starts_with("SELECT * FROM"))
        .expect("select recorded");
    assert_eq!(select.repetitions, 3);
    assert!(log.to_json().expect("json").contains("SELECT * FROM"));
}
