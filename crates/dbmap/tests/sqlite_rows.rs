//! Row, batch and table operations against an in-memory SQLite database.

mod common;

use common::{Child, Manual, Moment, Node, Parent, Typed, parents, session, statements};
use dbmap::prelude::*;

#[test]
fn sqlite_round_trip_restores_every_column() {
    let mut session = session();
    let mut typed = Typed {
        pk: None,
        flag: true,
        letter: 'x',
        ratio: 2.5,
        small: -7,
        big: 9_000_000_000,
        data: vec![0, 1, 255],
        doc: serde_json::json!({"tags": ["a", "b"], "n": 3}),
        id: uuid::Uuid::from_u128(0x0123_4567_89ab_cdef),
        note: None,
    };
    assert!(session.insert(&mut typed).expect("insert typed"));
    let pk = typed.pk.expect("generated key written back");

    let loaded = session
        .select_by_pk::<Typed, i32>(&pk)
        .expect("select typed")
        .expect("row exists");
    assert_eq!(loaded, typed);

    typed.note = Some("updated".into());
    typed.flag = false;
    assert!(session.update(&typed).expect("update typed"));
    let all = session.select_all::<Typed>().expect("select all");
    assert_eq!(all, vec![typed]);
}

#[test]
fn sqlite_round_trip_dates_times_and_decimals() {
    let mut session = session();
    let instant = chrono::DateTime::from_timestamp_micros(1_700_000_000_123_456).expect("instant");
    let mut moment = Moment {
        pk: None,
        day: chrono::NaiveDate::from_ymd_opt(1969, 7, 20).expect("date"),
        at: chrono::NaiveTime::from_hms_micro_opt(23, 59, 59, 999_999).expect("time"),
        local: chrono::NaiveDate::from_ymd_opt(2024, 2, 29)
            .and_then(|d| d.and_hms_opt(12, 30, 0))
            .expect("local"),
        instant,
        amount: "1234567890123456.0123456789".parse().expect("decimal"),
        due: None,
    };
    assert!(session.insert(&mut moment).expect("insert moment"));

    let loaded = session
        .select_by_pk::<Moment, i32>(&moment.pk.expect("key"))
        .expect("select moment")
        .expect("row exists");
    assert_eq!(loaded, moment);

    moment.due = Some(moment.day.succ_opt().expect("next day"));
    assert!(session.update(&moment).expect("update moment"));
    assert_eq!(session.select_all::<Moment>().expect("select all"), vec![moment]);
}

#[test]
fn sqlite_generated_keys_increase() {
    let mut session = session();
    let mut rows = parents(3);
    let inserted = session.insert_many(&mut rows).expect("insert parents");
    assert_eq!(inserted, vec![true, true, true]);
    let keys: Vec<i32> = rows.iter().map(|r| r.pk.expect("key")).collect();
    assert_eq!(keys, vec![1, 2, 3]);
}

#[test]
fn sqlite_create_is_idempotent() {
    let mut session = session();
    let mut rows = parents(5);
    session.insert_many(&mut rows).expect("insert parents");

    let affected = session.create_table::<Parent>().expect("create again");
    assert_eq!(affected, 0);
    assert_eq!(session.select_all::<Parent>().expect("select").len(), 5);
}

#[test]
fn sqlite_precondition_failures_run_no_sql() {
    let mut session = session();
    let before = statements(&session);

    let mut with_key = Parent {
        pk: Some(42),
        col: "preset".into(),
    };
    assert!(!session.insert(&mut with_key).expect("insert preset key"));
    assert_eq!(with_key.pk, Some(42));

    let mut without_key = Parent::default();
    assert!(!session.update(&without_key).expect("update unset key"));
    assert!(!session.delete(&mut without_key).expect("delete unset key"));

    let mut manual = Manual::default();
    assert!(!session.insert(&mut manual).expect("insert unset manual key"));

    assert_eq!(statements(&session), before);
    assert!(session.select_all::<Parent>().expect("select").is_empty());
}

#[test]
fn sqlite_manual_keys() {
    let mut session = session();
    let mut manual = Manual {
        pk: Some("k1".into()),
        col: "a".into(),
    };
    assert!(session.insert(&mut manual).expect("insert manual"));
    assert_eq!(manual.pk.as_deref(), Some("k1"));

    let err = session.insert(&mut manual).expect_err("duplicate key");
    assert!(err.is_driver());

    assert!(session.delete(&mut manual).expect("delete manual"));
    assert!(manual.pk.is_none());
    assert!(!session.update(&manual).expect("update cleared key"));
}

#[test]
fn sqlite_update_and_delete_report_missing_rows() {
    let mut session = session();
    let mut ghost = Parent {
        pk: Some(99),
        col: "ghost".into(),
    };
    assert!(!session.update(&ghost).expect("update missing"));
    assert!(!session.delete(&mut ghost).expect("delete missing"));
    assert_eq!(ghost.pk, Some(99));
}

#[test]
fn sqlite_batch_matches_row_by_row() {
    let mut by_row = session();
    let mut by_batch = common::session_with(SessionConfig::default().batch_size(3));
    by_batch.create_table::<Parent>().expect("create Parent");

    let mut rows = parents(10);
    by_row.insert_many(&mut rows).expect("insert rows");
    let inserted = by_batch.insert_batch(&parents(10)).expect("insert batch");
    assert_eq!(inserted, 10);

    let expected = by_row.select_all::<Parent>().expect("select rows");
    let mut actual = by_batch.select_all::<Parent>().expect("select batch");
    assert_eq!(actual, expected);

    for row in &mut actual {
        row.col.push_str(" updated");
    }
    assert_eq!(by_batch.update_batch(&actual).expect("update batch"), 10);
    let reloaded = by_batch.select_all::<Parent>().expect("select updated");
    assert!(reloaded.iter().all(|r| r.col.ends_with(" updated")));

    assert_eq!(by_batch.delete_batch(&mut actual).expect("delete batch"), 10);
    assert!(actual.iter().all(|r| r.pk.is_none()));
    assert!(by_batch.select_all::<Parent>().expect("select empty").is_empty());
}

#[test]
fn sqlite_delete_batch_keeps_keys_when_a_row_is_missing() {
    let mut session = session();
    let mut real = Parent {
        pk: None,
        col: "real".into(),
    };
    session.insert(&mut real).expect("insert parent");
    let real_key = real.pk;

    let mut rows = vec![
        real,
        Parent {
            pk: Some(999),
            col: "missing".into(),
        },
    ];
    assert_eq!(session.delete_batch(&mut rows).expect("delete batch"), 1);
    assert_eq!(rows[0].pk, real_key);
    assert_eq!(rows[1].pk, Some(999));
    assert!(session.select_all::<Parent>().expect("select").is_empty());
}

#[test]
fn sqlite_batch_skips_rows_with_generated_keys() {
    let mut session = session();
    let mut rows = parents(4);
    rows[2].pk = Some(50);
    assert_eq!(session.insert_batch(&rows).expect("insert batch"), 3);
    assert_eq!(session.select_all::<Parent>().expect("select").len(), 3);
}

#[test]
fn sqlite_foreign_keys_cascade() {
    let mut session = session();
    let mut parent = Parent {
        pk: None,
        col: "p".into(),
    };
    session.insert(&mut parent).expect("insert parent");
    let fk = parent.pk.expect("parent key");

    let mut children: Vec<Child> = (0..3)
        .map(|i| Child {
            pk: None,
            fk,
            col: format!("child {i}"),
        })
        .collect();
    session.insert_many(&mut children).expect("insert children");

    let mut orphan = Child {
        pk: None,
        fk: fk + 100,
        col: "orphan".into(),
    };
    let err = session.insert(&mut orphan).expect_err("foreign key enforced");
    assert!(err.is_driver());

    assert!(session.delete(&mut parent).expect("delete parent"));
    assert!(session.select_all::<Child>().expect("select children").is_empty());
}

#[test]
fn sqlite_self_reference() {
    let mut session = session();
    let mut root = Node {
        pk: None,
        parent: None,
        col: "root".into(),
    };
    session.insert(&mut root).expect("insert root");
    let mut leaf = Node {
        pk: None,
        parent: root.pk,
        col: "leaf".into(),
    };
    session.insert(&mut leaf).expect("insert leaf");

    let loaded = session
        .select_by_pk::<Node, i32>(&leaf.pk.expect("leaf key"))
        .expect("select leaf")
        .expect("leaf exists");
    assert_eq!(loaded.parent, root.pk);
}

#[test]
fn sqlite_delete_and_drop_table() {
    let mut session = session();
    session.insert_batch(&parents(4)).expect("insert batch");
    assert_eq!(session.delete_table::<Child>().expect("delete children"), 0);
    assert_eq!(session.delete_table::<Parent>().expect("delete parents"), 4);

    session.drop_table::<Child>(false).expect("drop Child");
    assert!(session.select_all::<Child>().expect_err("table dropped").is_driver());
}

#[test]
fn sqlite_schema_ddl_is_unsupported() {
    let mut session = session();
    let err = session.create_schema("main").expect_err("no schema ddl");
    assert!(matches!(err, Error::Unsupported { dialect: "sqlite", .. }));
    assert!(session.drop_schema("other", true).expect_err("unregistered").is_lookup());
}
