//! Type serializers: the only code allowed to turn domain values into driver
//! values and back.
//!
//! A [`TypeSerializer`] pairs one Rust domain type with a database column type
//! and a [`WireType`]. Serializers are looked up per property in this order:
//! column override, table override, schema list, global list. The global list
//! starts with the user's serializers and ends with the dialect defaults, so one
//! registry exists per dialect.

use std::any::{Any, TypeId};
use std::fmt;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::value::Value;
use crate::wire::WireType;

type EncodeFn = dyn Fn(&dyn Any) -> Option<Value> + Send + Sync;
type DecodeFn = dyn Fn(&Value) -> Option<Box<dyn Any>> + Send + Sync;

/// Bidirectional mapping between one domain type and one column type.
#[derive(Clone)]
pub struct TypeSerializer {
    domain: TypeId,
    domain_name: &'static str,
    db_type: String,
    wire: WireType,
    encoder: Arc<EncodeFn>,
    decoder: Arc<DecodeFn>,
}

impl TypeSerializer {
    /// Build a serializer for domain type `D`.
    ///
    /// `encode` is never called with a null; `decode` is never called with
    /// [`Value::Null`]. Returning `None` from `decode` reports a value the
    /// serializer cannot interpret.
    pub fn new<D, E, F>(db_type: impl Into<String>, wire: WireType, encode: E, decode: F) -> Self
    where
        D: Any,
        E: Fn(&D) -> Value + Send + Sync + 'static,
        F: Fn(&Value) -> Option<D> + Send + Sync + 'static,
    {
        Self {
            domain: TypeId::of::<D>(),
            domain_name: std::any::type_name::<D>(),
            db_type: db_type.into(),
            wire,
            encoder: Arc::new(move |value: &dyn Any| value.downcast_ref::<D>().map(&encode)),
            decoder: Arc::new(move |value: &Value| {
                decode(value).map(|decoded| Box::new(decoded) as Box<dyn Any>)
            }),
        }
    }

    /// Same mapping, different declared column type.
    #[must_use]
    pub fn with_db_type(mut self, db_type: impl Into<String>) -> Self {
        self.db_type = db_type.into();
        self
    }

    pub fn domain(&self) -> TypeId {
        self.domain
    }

    pub fn domain_name(&self) -> &'static str {
        self.domain_name
    }

    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    pub fn wire(&self) -> WireType {
        self.wire
    }

    pub fn handles<D: Any>(&self) -> bool {
        self.domain == TypeId::of::<D>()
    }

    /// Encode a non-null domain value.
    pub fn encode(&self, column: &str, value: &dyn Any) -> Result<Value> {
        (self.encoder)(value).ok_or_else(|| Error::SerializerMismatch {
            column: column.to_string(),
            expected: self.wire,
            found: "a value of a different Rust type".to_string(),
        })
    }

    /// Decode a driver value. Nulls decode to `None` without calling the decoder.
    pub fn decode(&self, column: &str, value: &Value) -> Result<Option<Box<dyn Any>>> {
        if value.is_null() {
            return Ok(None);
        }
        match (self.decoder)(value) {
            Some(decoded) => Ok(Some(decoded)),
            None => Err(Error::SerializerMismatch {
                column: column.to_string(),
                expected: self.wire,
                found: value.type_name().to_string(),
            }),
        }
    }

    /// Decode straight into `D`.
    pub fn decode_as<D: Any>(&self, column: &str, value: &Value) -> Result<Option<D>> {
        match self.decode(column, value)? {
            None => Ok(None),
            Some(boxed) => boxed.downcast::<D>().map(|d| Some(*d)).map_err(|_| {
                Error::SerializerMismatch {
                    column: column.to_string(),
                    expected: self.wire,
                    found: std::any::type_name::<D>().to_string(),
                }
            }),
        }
    }

    /// Reject result columns whose driver-reported tag this serializer cannot read.
    pub fn check_wire(&self, column: &str, reported: Option<WireType>) -> Result<()> {
        match reported {
            Some(found) if !self.wire.accepts(found) => Err(Error::SerializerMismatch {
                column: column.to_string(),
                expected: self.wire,
                found: found.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for TypeSerializer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeSerializer")
            .field("domain", &self.domain_name)
            .field("db_type", &self.db_type)
            .field("wire", &self.wire)
            .finish_non_exhaustive()
    }
}

/// First serializer in `list` handling `domain`.
pub fn find(list: &[TypeSerializer], domain: TypeId) -> Option<&TypeSerializer> {
    list.iter().find(|s| s.domain == domain)
}

/// Serializers every dialect starts from.
pub mod basic {
    use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
    use rust_decimal::Decimal;

    use super::TypeSerializer;
    use crate::value::Value;
    use crate::wire::WireType;

    macro_rules! signed {
        ($name:ident, $ty:ty, $db:literal, $wire:ident, $variant:ident) => {
            pub fn $name() -> TypeSerializer {
                TypeSerializer::new::<$ty, _, _>(
                    $db,
                    WireType::$wire,
                    |v| Value::$variant(*v),
                    |v| v.as_i64().and_then(|n| <$ty>::try_from(n).ok()),
                )
            }
        };
    }

    macro_rules! unsigned {
        ($name:ident, $ty:ty, $signed:ty, $db:literal, $wire:ident, $variant:ident) => {
            pub fn $name() -> TypeSerializer {
                TypeSerializer::new::<$ty, _, _>(
                    $db,
                    WireType::$wire,
                    |v| Value::$variant(*v as $signed),
                    |v| v.as_i64().map(|n| n as $signed as $ty),
                )
            }
        };
    }

    signed!(i8, i8, "TINYINT", TinyInt, TinyInt);
    signed!(i16, i16, "SMALLINT", SmallInt, SmallInt);
    signed!(i32, i32, "INTEGER", Integer, Int);
    signed!(i64, i64, "BIGINT", BigInt, BigInt);
    unsigned!(u8, u8, i8, "TINYINT", TinyInt, TinyInt);
    unsigned!(u16, u16, i16, "SMALLINT", SmallInt, SmallInt);
    unsigned!(u32, u32, i32, "INTEGER", Integer, Int);
    unsigned!(u64, u64, i64, "BIGINT", BigInt, BigInt);

    pub fn boolean() -> TypeSerializer {
        TypeSerializer::new::<bool, _, _>("BOOL", WireType::Boolean, |v| Value::Bool(*v), Value::as_bool)
    }

    pub fn character() -> TypeSerializer {
        TypeSerializer::new::<char, _, _>(
            "CHAR",
            WireType::Char,
            |v| Value::Text(v.to_string()),
            |v| v.as_str().and_then(|s| s.chars().next()),
        )
    }

    pub fn f32() -> TypeSerializer {
        TypeSerializer::new::<f32, _, _>(
            "FLOAT",
            WireType::Real,
            |v| Value::Float(*v),
            |v| v.as_f64().map(|n| n as f32),
        )
    }

    pub fn f64() -> TypeSerializer {
        TypeSerializer::new::<f64, _, _>("DOUBLE", WireType::Double, |v| Value::Double(*v), Value::as_f64)
    }

    /// `String` as `VARCHAR(size)`.
    pub fn string(size: usize) -> TypeSerializer {
        TypeSerializer::new::<String, _, _>(
            format!("VARCHAR({size})"),
            WireType::Varchar,
            |v| Value::Text(v.clone()),
            |v| v.as_str().map(str::to_string),
        )
    }

    pub fn bytes(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<Vec<u8>, _, _>(
            db_type,
            WireType::Binary,
            |v| Value::Bytes(v.clone()),
            |v| v.as_bytes().map(<[u8]>::to_vec),
        )
    }

    pub fn json(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<serde_json::Value, _, _>(
            db_type,
            WireType::Json,
            |v| Value::Json(v.clone()),
            |v| match v {
                Value::Json(j) => Some(j.clone()),
                Value::Text(s) => serde_json::from_str(s).ok(),
                _ => None,
            },
        )
    }

    /// `uuid::Uuid` bound as a native identifier.
    pub fn uuid_native(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<uuid::Uuid, _, _>(
            db_type,
            WireType::Uuid,
            |v| Value::Uuid(*v.as_bytes()),
            |v| match v {
                Value::Uuid(bytes) => Some(uuid::Uuid::from_bytes(*bytes)),
                Value::Text(s) => uuid::Uuid::parse_str(s).ok(),
                _ => None,
            },
        )
    }

    /// `uuid::Uuid` bound as its 36 character text form.
    pub fn uuid_text(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<uuid::Uuid, _, _>(
            db_type,
            WireType::Char,
            |v| Value::Text(v.to_string()),
            |v| v.as_str().and_then(|s| uuid::Uuid::parse_str(s).ok()),
        )
    }

    // ========================================================================
    // Dates, times and decimals
    // ========================================================================

    /// Day number of 1970-01-01 counted from 0001-01-01 as day 1.
    const UNIX_EPOCH_FROM_CE: i32 = 719_163;
    const MICROS: i64 = 1_000_000;

    fn time_micros(time: &NaiveTime) -> i64 {
        i64::from(time.num_seconds_from_midnight()) * MICROS + i64::from(time.nanosecond() / 1_000)
    }

    fn time_from_micros(micros: i64) -> Option<NaiveTime> {
        let secs = u32::try_from(micros.div_euclid(MICROS)).ok()?;
        let nanos = u32::try_from(micros.rem_euclid(MICROS) * 1_000).ok()?;
        NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
    }

    /// `chrono::NaiveDate` bound as days since the Unix epoch.
    pub fn naive_date(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<NaiveDate, _, _>(
            db_type,
            WireType::Date,
            |v| Value::Date(v.num_days_from_ce() - UNIX_EPOCH_FROM_CE),
            |v| match v {
                Value::Text(s) => s.parse().ok(),
                other => {
                    let days = match other {
                        Value::Date(d) => *d,
                        n => i32::try_from(n.as_i64()?).ok()?,
                    };
                    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_FROM_CE)?)
                }
            },
        )
    }

    /// `chrono::NaiveTime` bound as microseconds since midnight.
    pub fn naive_time(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<NaiveTime, _, _>(
            db_type,
            WireType::Time,
            |v| Value::Time(time_micros(v)),
            |v| match v {
                Value::Time(us) => time_from_micros(*us),
                Value::Text(s) => s.parse().ok(),
                n => time_from_micros(n.as_i64()?),
            },
        )
    }

    /// `chrono::NaiveTime` as a whole number of seconds since midnight, for
    /// databases without a time-of-day column type.
    pub fn naive_time_seconds(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<NaiveTime, _, _>(
            db_type,
            WireType::Integer,
            |v| Value::Int(v.num_seconds_from_midnight() as i32),
            |v| {
                let secs = u32::try_from(v.as_i64()?).ok()?;
                NaiveTime::from_num_seconds_from_midnight_opt(secs, 0)
            },
        )
    }

    /// `chrono::NaiveDateTime` bound as microseconds since the Unix epoch.
    pub fn naive_date_time(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<NaiveDateTime, _, _>(
            db_type,
            WireType::Timestamp,
            |v| Value::Timestamp(v.and_utc().timestamp_micros()),
            |v| match v {
                Value::Text(s) => s.parse().ok(),
                Value::Timestamp(us) | Value::TimestampTz(us) => {
                    DateTime::from_timestamp_micros(*us).map(|t| t.naive_utc())
                }
                n => DateTime::from_timestamp_micros(n.as_i64()?).map(|t| t.naive_utc()),
            },
        )
    }

    /// `chrono::DateTime<Utc>` bound as microseconds since the Unix epoch.
    pub fn date_time_utc(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<DateTime<Utc>, _, _>(
            db_type,
            WireType::TimestampTz,
            |v| Value::TimestampTz(v.timestamp_micros()),
            |v| match v {
                Value::Text(s) => s.parse().ok(),
                Value::Timestamp(us) | Value::TimestampTz(us) => DateTime::from_timestamp_micros(*us),
                n => DateTime::from_timestamp_micros(n.as_i64()?),
            },
        )
    }

    /// `rust_decimal::Decimal` bound as an exact decimal.
    pub fn decimal(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<Decimal, _, _>(
            db_type,
            WireType::Decimal,
            |v| Value::Decimal(v.to_string()),
            decode_decimal,
        )
    }

    /// `rust_decimal::Decimal` bound as text, for databases that would
    /// otherwise round it through a float.
    pub fn decimal_text(db_type: &str) -> TypeSerializer {
        TypeSerializer::new::<Decimal, _, _>(
            db_type,
            WireType::Varchar,
            |v| Value::Text(v.to_string()),
            decode_decimal,
        )
    }

    fn decode_decimal(value: &Value) -> Option<Decimal> {
        match value {
            Value::Decimal(s) | Value::Text(s) => s.parse().ok(),
            Value::Float(f) => Decimal::from_f32_retain(*f),
            Value::Double(f) => Decimal::from_f64_retain(*f),
            n => n.as_i64().map(Decimal::from),
        }
    }

    /// Dates, times and timestamps under one declared type per kind.
    ///
    /// `instant` is the column type of `DateTime<Utc>`, `local` that of
    /// `NaiveDateTime`.
    pub fn temporal(instant: &str, local: &str) -> Vec<TypeSerializer> {
        vec![
            naive_date("DATE"),
            naive_time("TIME"),
            naive_date_time(local),
            date_time_utc(instant),
        ]
    }

    /// Booleans, characters, floats, signed and unsigned integers and `VARCHAR(100)` strings.
    pub fn all() -> Vec<TypeSerializer> {
        vec![
            boolean(),
            character(),
            f32(),
            f64(),
            i8(),
            i16(),
            i32(),
            i64(),
            u8(),
            u16(),
            u32(),
            u64(),
            string(100),
        ]
    }
}
