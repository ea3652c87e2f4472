//! Default serializers of each dialect.
//!
//! Every list starts from [`basic::all`] and renames column types the database
//! spells differently, then adds byte, JSON, UUID, decimal and date/time
//! mappings.

use std::any::{Any, TypeId};

use dbmap_core::{TypeSerializer, basic};

/// Replace the declared type of the serializer handling `D`.
fn retype<D: Any>(list: &mut [TypeSerializer], db_type: &str) {
    let domain = TypeId::of::<D>();
    for ser in list.iter_mut().filter(|s| s.domain() == domain) {
        *ser = ser.clone().with_db_type(db_type);
    }
}

pub fn sqlite() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    list.extend([
        basic::bytes("BLOB"),
        basic::json("TEXT"),
        basic::uuid_text("CHARACTER(36)"),
        basic::decimal_text("TEXT"),
    ]);
    list.extend(basic::temporal("DATETIME", "DATETIME"));
    list
}

pub fn postgres() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    retype::<f64>(&mut list, "DOUBLE PRECISION");
    retype::<i8>(&mut list, "SMALLINT");
    retype::<u8>(&mut list, "SMALLINT");
    list.extend([
        basic::bytes("BYTEA"),
        basic::json("JSONB"),
        basic::uuid_native("UUID"),
        basic::decimal("NUMERIC(30, 10)"),
    ]);
    list.extend(basic::temporal("TIMESTAMP", "TIMESTAMP"));
    list
}

pub fn mysql() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    list.extend([
        basic::bytes("BLOB"),
        basic::json("JSON"),
        basic::uuid_text("CHAR(36)"),
        basic::decimal("DECIMAL(30, 10)"),
    ]);
    list.extend(basic::temporal("DATETIME", "DATETIME"));
    list
}

pub fn maria() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    list.extend([
        basic::bytes("BLOB"),
        basic::json("JSON"),
        basic::uuid_text("UUID"),
        basic::decimal("DECIMAL(30, 10)"),
    ]);
    list.extend(basic::temporal("DATETIME", "DATETIME"));
    list
}

pub fn mssql() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    retype::<bool>(&mut list, "BIT");
    retype::<f64>(&mut list, "FLOAT");
    retype::<f32>(&mut list, "REAL");
    list.extend([
        basic::bytes("VARBINARY(MAX)"),
        basic::json("NVARCHAR(MAX)"),
        basic::uuid_text("UNIQUEIDENTIFIER"),
        basic::decimal("DECIMAL(30, 10)"),
    ]);
    list.extend(basic::temporal("DATETIME", "DATETIME2"));
    list
}

pub fn oracle() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    retype::<bool>(&mut list, "NUMBER(1)");
    retype::<i8>(&mut list, "NUMBER(3)");
    retype::<u8>(&mut list, "NUMBER(3)");
    retype::<i16>(&mut list, "NUMBER(5)");
    retype::<u16>(&mut list, "NUMBER(5)");
    retype::<i64>(&mut list, "NUMBER(19)");
    retype::<u64>(&mut list, "NUMBER(19)");
    retype::<f64>(&mut list, "BINARY_DOUBLE");
    retype::<f32>(&mut list, "BINARY_FLOAT");
    retype::<String>(&mut list, "VARCHAR2(100)");
    list.extend([
        basic::bytes("BLOB"),
        basic::json("CLOB"),
        basic::uuid_text("VARCHAR2(36)"),
        basic::decimal("NUMBER(30, 10)"),
    ]);
    // No time-of-day type: times are stored as seconds since midnight.
    list.extend([
        basic::naive_date("DATE"),
        basic::naive_time_seconds("NUMBER(5)"),
        basic::naive_date_time("TIMESTAMP"),
        basic::date_time_utc("TIMESTAMP"),
    ]);
    list
}

pub fn db2() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    retype::<bool>(&mut list, "BOOLEAN");
    retype::<i8>(&mut list, "SMALLINT");
    retype::<u8>(&mut list, "SMALLINT");
    retype::<f32>(&mut list, "REAL");
    list.extend([
        basic::bytes("BLOB"),
        basic::json("CLOB"),
        basic::uuid_text("CHAR(36)"),
        basic::decimal("DECIMAL(30, 10)"),
    ]);
    list.extend(basic::temporal("DATETIME", "TIMESTAMP"));
    list
}

pub fn h2() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    retype::<bool>(&mut list, "BOOLEAN");
    list.extend([
        basic::bytes("BLOB"),
        basic::json("JSON"),
        basic::uuid_native("UUID"),
        basic::decimal("DECIMAL(30, 10)"),
    ]);
    list.extend(basic::temporal("DATETIME", "TIMESTAMP"));
    list
}

pub fn derby() -> Vec<TypeSerializer> {
    let mut list = basic::all();
    retype::<bool>(&mut list, "BOOLEAN");
    retype::<i8>(&mut list, "SMALLINT");
    retype::<u8>(&mut list, "SMALLINT");
    retype::<f32>(&mut list, "REAL");
    list.extend([
        basic::bytes("BLOB"),
        basic::json("CLOB"),
        basic::uuid_text("CHAR(36)"),
        basic::decimal("DECIMAL(30, 10)"),
    ]);
    list.extend(basic::temporal("TIMESTAMP", "TIMESTAMP"));
    list
}
