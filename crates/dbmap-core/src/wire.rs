//! Wire type tags.
//!
//! A wire type is the driver-level identity of a bound or returned value,
//! independent of the Rust type it maps to. Nulls are bound with the tag of the
//! column they belong to.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WireType {
    Boolean,
    TinyInt,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Char,
    Varchar,
    Binary,
    Date,
    Time,
    Timestamp,
    TimestampTz,
    Uuid,
    Json,
}

/// Groups of wire types a driver may report interchangeably.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireFamily {
    Integral,
    Fractional,
    Textual,
    Binary,
    Temporal,
    Identifier,
    Document,
}

impl WireType {
    pub const fn family(self) -> WireFamily {
        match self {
            WireType::Boolean
            | WireType::TinyInt
            | WireType::SmallInt
            | WireType::Integer
            | WireType::BigInt => WireFamily::Integral,
            WireType::Real | WireType::Double | WireType::Decimal => WireFamily::Fractional,
            WireType::Char | WireType::Varchar => WireFamily::Textual,
            WireType::Binary => WireFamily::Binary,
            WireType::Date | WireType::Time | WireType::Timestamp | WireType::TimestampTz => {
                WireFamily::Temporal
            }
            WireType::Uuid => WireFamily::Identifier,
            WireType::Json => WireFamily::Document,
        }
    }

    /// Whether a column the driver reports as `reported` can be decoded by a
    /// serializer declared with `self`.
    pub fn accepts(self, reported: WireType) -> bool {
        if self == reported || self.family() == reported.family() {
            return true;
        }
        // JSON documents travel as text on most drivers.
        matches!(
            (self.family(), reported.family()),
            (WireFamily::Document, WireFamily::Textual)
        )
    }

    /// Whether this tag describes whole numbers.
    pub fn is_integral(self) -> bool {
        self.family() == WireFamily::Integral && self != WireType::Boolean
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            WireType::Boolean => "BOOLEAN",
            WireType::TinyInt => "TINYINT",
            WireType::SmallInt => "SMALLINT",
            WireType::Integer => "INTEGER",
            WireType::BigInt => "BIGINT",
            WireType::Real => "REAL",
            WireType::Double => "DOUBLE",
            WireType::Decimal => "DECIMAL",
            WireType::Char => "CHAR",
            WireType::Varchar => "VARCHAR",
            WireType::Binary => "BINARY",
            WireType::Date => "DATE",
            WireType::Time => "TIME",
            WireType::Timestamp => "TIMESTAMP",
            WireType::TimestampTz => "TIMESTAMP_WITH_TIMEZONE",
            WireType::Uuid => "UUID",
            WireType::Json => "JSON",
        }
    }

    /// Best-effort mapping from a declared column type such as `VARCHAR(100)`.
    pub fn from_declared(decl: &str) -> Option<WireType> {
        let upper = decl.trim().to_ascii_uppercase();
        let base = upper.split('(').next().unwrap_or("").trim();
        let wire = match base {
            "BOOL" | "BOOLEAN" | "BIT" => WireType::Boolean,
            "TINYINT" => WireType::TinyInt,
            "SMALLINT" | "INT2" => WireType::SmallInt,
            "INT" | "INTEGER" | "INT4" | "MEDIUMINT" => WireType::Integer,
            "BIGINT" | "INT8" => WireType::BigInt,
            "REAL" | "FLOAT" | "FLOAT4" => WireType::Real,
            "DOUBLE" | "DOUBLE PRECISION" | "FLOAT8" => WireType::Double,
            "DECIMAL" | "NUMERIC" | "NUMBER" => WireType::Decimal,
            "CHAR" | "CHARACTER" | "NCHAR" | "UNIQUEIDENTIFIER" => WireType::Char,
            "VARCHAR" | "VARCHAR2" | "NVARCHAR" | "TEXT" | "CLOB" | "CHARACTER VARYING" => {
                WireType::Varchar
            }
            "BLOB" | "BINARY" | "VARBINARY" | "BYTEA" => WireType::Binary,
            "DATE" => WireType::Date,
            "TIME" => WireType::Time,
            "DATETIME" | "TIMESTAMP" => WireType::Timestamp,
            "TIMESTAMPTZ" => WireType::TimestampTz,
            "UUID" => WireType::Uuid,
            "JSON" | "JSONB" => WireType::Json,
            _ => return None,
        };
        Some(wire)
    }
}

impl fmt::Display for WireType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
