//! Resolved column metadata.

use std::any::{Any, TypeId};

use crate::error::Result;
use crate::field::PropertyDef;
use crate::serializer::TypeSerializer;
use crate::table::TableId;
use crate::value::Value;
use crate::wire::WireType;

/// A property bound to its serializer.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    pub name: String,
    pub nullable: bool,
    pub unique: bool,
    pub serializer: TypeSerializer,
    property: PropertyDef,
}

impl ColumnInfo {
    pub fn new(property: PropertyDef, serializer: TypeSerializer, unique: bool) -> Self {
        Self {
            name: property.name().to_string(),
            nullable: property.nullable(),
            unique,
            serializer,
            property,
        }
    }

    pub fn db_type(&self) -> &str {
        self.serializer.db_type()
    }

    pub fn wire(&self) -> WireType {
        self.serializer.wire()
    }

    pub fn domain(&self) -> TypeId {
        self.property.domain()
    }

    pub fn property(&self) -> &PropertyDef {
        &self.property
    }

    /// Encoded value of this column on `owner`.
    pub fn read(&self, owner: &dyn Any) -> Result<Value> {
        self.property.read(owner, &self.serializer)
    }

    /// Decode `value` and store it on `owner`.
    pub fn write(&self, owner: &mut dyn Any, value: &Value) -> Result<()> {
        let decoded = self.serializer.decode(&self.name, value)?;
        self.property.write(owner, decoded)
    }

    /// Reset an optional column to `None`.
    pub fn clear(&self, owner: &mut dyn Any) -> Result<()> {
        self.property.write(owner, None)
    }
}

/// The primary key column.
#[derive(Debug, Clone)]
pub struct PrimaryColumn {
    pub column: ColumnInfo,
    pub auto_increment: bool,
    pub auto_uuid: bool,
}

impl PrimaryColumn {
    /// Whether the database generates the key.
    pub fn is_auto(&self) -> bool {
        self.auto_increment || self.auto_uuid
    }
}

/// A foreign key column and the table it references.
#[derive(Debug, Clone)]
pub struct ForeignColumn {
    pub column: ColumnInfo,
    pub target_type: TypeId,
    pub target_name: &'static str,
    /// Arena index of the referenced table, bound once every table exists.
    pub target: Option<TableId>,
    pub cascade_update: bool,
    pub cascade_delete: bool,
}
