//! Declarative registration input: schemas, tables, records and procedures.
//!
//! Definitions are plain builders. Nothing is checked while they are assembled;
//! the validation battery runs once when the [`Mapper`](crate::mapper::Mapper)
//! is built from them.

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::field::{Property, PropertyDef};
use crate::serializer::TypeSerializer;

/// Produces a blank instance that decoding fills in.
pub type Factory = Arc<dyn Fn() -> Box<dyn Any> + Send + Sync>;

fn factory_of<T: Any + Default>() -> Factory {
    Arc::new(|| Box::new(T::default()) as Box<dyn Any>)
}

/// Column constraint attached by column name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Constraint {
    /// The database assigns an increasing integer key.
    AutoIncrement,
    /// The database assigns a random 128-bit key.
    AutoUuid,
    Unique,
    CascadeUpdate,
    CascadeDelete,
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Constraint::AutoIncrement => "AUTO_INCREMENT",
            Constraint::AutoUuid => "AUTO_UUID",
            Constraint::Unique => "UNIQUE",
            Constraint::CascadeUpdate => "CASCADE_UPDATE",
            Constraint::CascadeDelete => "CASCADE_DELETE",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tables
// ============================================================================

/// A foreign key property and the domain type it references.
#[derive(Debug, Clone)]
pub struct ForeignDef {
    pub property: PropertyDef,
    pub target: TypeId,
    pub target_name: &'static str,
}

/// Type-erased table definition.
#[derive(Clone)]
pub struct TableDef {
    pub name: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub primary: PropertyDef,
    pub foreign: Vec<ForeignDef>,
    pub columns: Vec<PropertyDef>,
    pub constraints: Vec<(String, Constraint)>,
    pub serializers: Vec<TypeSerializer>,
    pub column_serializers: Vec<(String, TypeSerializer)>,
    pub(crate) factory: Factory,
}

impl TableDef {
    /// Every declared property: primary key, foreign keys, then other columns.
    pub fn properties(&self) -> impl Iterator<Item = &PropertyDef> {
        std::iter::once(&self.primary)
            .chain(self.foreign.iter().map(|f| &f.property))
            .chain(self.columns.iter())
    }

    pub fn constraints_of<'a>(&'a self, column: &'a str) -> impl Iterator<Item = Constraint> + 'a {
        self.constraints
            .iter()
            .filter(move |(name, _)| name == column)
            .map(|(_, c)| *c)
    }
}

impl fmt::Debug for TableDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableDef")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("primary", &self.primary.name())
            .field("foreign", &self.foreign.len())
            .field("columns", &self.columns.len())
            .finish_non_exhaustive()
    }
}

/// Table declaration for domain type `T`.
///
/// ```ignore
/// Table::new("Child", property!(Child, pk?))
///     .foreign_key::<Parent>(property!(Child, fk))
///     .column(property!(Child, col))
///     .constraint("pk", Constraint::AutoIncrement)
///     .constraint("fk", Constraint::CascadeDelete)
/// ```
pub struct Table<T> {
    def: TableDef,
    _owner: PhantomData<fn(T)>,
}

impl<T: Any + Default> Table<T> {
    pub fn new(name: impl Into<String>, primary_key: Property<T>) -> Self {
        Self {
            def: TableDef {
                name: name.into(),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                primary: primary_key.into_def(),
                foreign: Vec::new(),
                columns: Vec::new(),
                constraints: Vec::new(),
                serializers: Vec::new(),
                column_serializers: Vec::new(),
                factory: factory_of::<T>(),
            },
            _owner: PhantomData,
        }
    }

    /// Foreign key referencing the primary key of table type `F`.
    #[must_use]
    pub fn foreign_key<F: Any>(mut self, property: Property<T>) -> Self {
        self.def.foreign.push(ForeignDef {
            property: property.into_def(),
            target: TypeId::of::<F>(),
            target_name: std::any::type_name::<F>(),
        });
        self
    }

    #[must_use]
    pub fn column(mut self, property: Property<T>) -> Self {
        self.def.columns.push(property.into_def());
        self
    }

    #[must_use]
    pub fn constraint(mut self, column: impl Into<String>, constraint: Constraint) -> Self {
        self.def.constraints.push((column.into(), constraint));
        self
    }

    /// Serializer applying to every column of this table.
    #[must_use]
    pub fn serializer(mut self, serializer: TypeSerializer) -> Self {
        self.def.serializers.push(serializer);
        self
    }

    /// Serializer applying to one column only.
    #[must_use]
    pub fn column_serializer(mut self, column: impl Into<String>, serializer: TypeSerializer) -> Self {
        self.def.column_serializers.push((column.into(), serializer));
        self
    }

    pub fn into_def(self) -> TableDef {
        self.def
    }
}

// ============================================================================
// Records and procedures
// ============================================================================

/// Type-erased record definition.
#[derive(Clone)]
pub struct RecordDef {
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub properties: Vec<PropertyDef>,
    pub(crate) factory: Factory,
}

impl fmt::Debug for RecordDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordDef")
            .field("type_name", &self.type_name)
            .field("properties", &self.properties)
            .finish_non_exhaustive()
    }
}

/// Shape of a custom query input or output.
pub struct Record<T> {
    def: RecordDef,
    _owner: PhantomData<fn(T)>,
}

impl<T: Any + Default> Record<T> {
    pub fn new() -> Self {
        Self {
            def: RecordDef {
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                properties: Vec::new(),
                factory: factory_of::<T>(),
            },
            _owner: PhantomData,
        }
    }

    #[must_use]
    pub fn property(mut self, property: Property<T>) -> Self {
        self.def.properties.push(property.into_def());
        self
    }

    pub fn into_def(self) -> RecordDef {
        self.def
    }
}

impl<T: Any + Default> Default for Record<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Type-erased procedure definition.
#[derive(Debug, Clone)]
pub struct ProcedureDef {
    pub name: String,
    pub type_id: TypeId,
    pub type_name: &'static str,
    pub args: Vec<PropertyDef>,
}

/// Stored procedure whose arguments are the properties of `T`, in order.
pub struct Procedure<T> {
    def: ProcedureDef,
    _owner: PhantomData<fn(T)>,
}

impl<T: Any> Procedure<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            def: ProcedureDef {
                name: name.into(),
                type_id: TypeId::of::<T>(),
                type_name: std::any::type_name::<T>(),
                args: Vec::new(),
            },
            _owner: PhantomData,
        }
    }

    #[must_use]
    pub fn arg(mut self, property: Property<T>) -> Self {
        self.def.args.push(property.into_def());
        self
    }

    pub fn into_def(self) -> ProcedureDef {
        self.def
    }
}

// ============================================================================
// Schema
// ============================================================================

/// Named collection of tables, procedures and schema-level serializers.
#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub tables: Vec<TableDef>,
    pub procedures: Vec<ProcedureDef>,
    pub serializers: Vec<TypeSerializer>,
}

impl Schema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
            procedures: Vec::new(),
            serializers: Vec::new(),
        }
    }

    #[must_use]
    pub fn table<T: Any + Default>(mut self, table: Table<T>) -> Self {
        self.tables.push(table.into_def());
        self
    }

    #[must_use]
    pub fn procedure<T: Any>(mut self, procedure: Procedure<T>) -> Self {
        self.procedures.push(procedure.into_def());
        self
    }

    #[must_use]
    pub fn serializer(mut self, serializer: TypeSerializer) -> Self {
        self.serializers.push(serializer);
        self
    }
}
