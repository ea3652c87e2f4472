//! Core types for dbmap.
//!
//! `dbmap-core` is the **foundation layer** of the workspace. It owns the data
//! every other crate shares and the metadata graph they all read.
//!
//! # Role In The Architecture
//!
//! - **Registration**: [`Schema`], [`Table`], [`Property`], [`Record`] and
//!   [`Procedure`] describe domain types explicitly; [`Mapper::register`]
//!   validates them and builds the table graph.
//! - **Serializers**: [`TypeSerializer`] is the only bridge between domain values
//!   and driver [`Value`]s, tagged with a [`WireType`].
//! - **Driver contract**: [`Driver`], [`Statement`] and [`RowCursor`] are what a
//!   database binding implements; results come back as [`Row`]s.
//! - **Diagrams**: [`Mapper::plant_uml`] and [`Mapper::db_diagram_io`] render the
//!   registered table graph as PlantUML or dbdiagram.io text.
//!
//! # Who Uses This Crate
//!
//! - `dbmap-query` builds [`Query`](../dbmap_query/struct.Query.html) values from mapper metadata.
//! - `dbmap-dialect` renders SQL per database from [`TableInfo`].
//! - `dbmap-session` executes queries through a [`Driver`] and decodes rows.
//! - `dbmap-sqlite` implements [`Driver`] over an embedded SQLite engine.

pub mod column;
pub mod definition;
pub mod driver;
pub mod error;
pub mod export;
pub mod field;
pub mod mapper;
pub mod row;
pub mod serializer;
pub mod table;
pub mod validate;
pub mod value;
pub mod wire;

pub use column::{ColumnInfo, ForeignColumn, PrimaryColumn};
pub use definition::{Constraint, Procedure, Record, Schema, Table};
pub use driver::{
    Driver, DriverResult, GeneratedKeys, IsolationLevel, RowCursor, Savepoint, Statement,
};
pub use error::{DriverError, Error, Result};
pub use export::DiagramOptions;
pub use field::{Property, PropertyDef};
pub use mapper::{Mapper, Registration};
pub use row::{ColumnMeta, Row};
pub use serializer::{TypeSerializer, basic};
pub use table::{ProcedureInfo, RecordInfo, TableId, TableInfo};
pub use value::Value;
pub use wire::{WireFamily, WireType};
