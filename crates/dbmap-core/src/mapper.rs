//! The schema registrar.
//!
//! [`Mapper::register`] validates a [`Registration`] and turns it into a
//! read-only metadata graph:
//!
//! 1. every table definition becomes a [`TableInfo`] in an arena, indexed by
//!    its domain type, with one serializer resolved per column;
//! 2. every [`ForeignColumn`] is bound to the arena index of its target, which
//!    is what makes self and forward references work;
//! 3. procedures and custom query inputs/outputs are resolved last.
//!
//! The graph is built once and then shared behind an `Arc`.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use crate::column::{ColumnInfo, ForeignColumn, PrimaryColumn};
use crate::definition::{
    Constraint, Procedure, ProcedureDef, Record, RecordDef, Schema, TableDef,
};
use crate::error::{Error, Result};
use crate::field::PropertyDef;
use crate::row::Row;
use crate::serializer::{TypeSerializer, find};
use crate::table::{ProcedureInfo, RecordInfo, TableId, TableInfo};
use crate::validate;

// ============================================================================
// Registration
// ============================================================================

/// Everything the mapper is built from.
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub(crate) schemas: Vec<Schema>,
    pub(crate) serializers: Vec<TypeSerializer>,
    pub(crate) dialect_serializers: Vec<TypeSerializer>,
    pub(crate) inputs: Vec<RecordDef>,
    pub(crate) outputs: Vec<RecordDef>,
    pub(crate) procedures: Vec<ProcedureDef>,
    pub(crate) allow_auto_uuid: bool,
}

impl Registration {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Global serializer, consulted before the dialect defaults.
    #[must_use]
    pub fn serializer(mut self, serializer: TypeSerializer) -> Self {
        self.serializers.push(serializer);
        self
    }

    #[must_use]
    pub fn serializers(mut self, serializers: impl IntoIterator<Item = TypeSerializer>) -> Self {
        self.serializers.extend(serializers);
        self
    }

    /// Default serializers of the target dialect, consulted last.
    #[must_use]
    pub fn dialect_serializers(
        mut self,
        serializers: impl IntoIterator<Item = TypeSerializer>,
    ) -> Self {
        self.dialect_serializers.extend(serializers);
        self
    }

    /// Register a custom query input shape.
    #[must_use]
    pub fn input<T: Any + Default>(mut self, record: Record<T>) -> Self {
        self.inputs.push(record.into_def());
        self
    }

    /// Register a custom query output shape.
    #[must_use]
    pub fn output<T: Any + Default>(mut self, record: Record<T>) -> Self {
        self.outputs.push(record.into_def());
        self
    }

    /// Procedure living outside any schema.
    #[must_use]
    pub fn procedure<T: Any>(mut self, procedure: Procedure<T>) -> Self {
        self.procedures.push(procedure.into_def());
        self
    }

    /// Whether the database can generate uuid primary keys.
    #[must_use]
    pub fn allow_auto_uuid(mut self, allow: bool) -> Self {
        self.allow_auto_uuid = allow;
        self
    }
}

/// Serializer lookup over the raw definitions.
pub(crate) struct Resolver<'a> {
    globals: &'a [TypeSerializer],
    defaults: &'a [TypeSerializer],
}

impl<'a> Resolver<'a> {
    pub(crate) fn new(reg: &'a Registration) -> Self {
        Self {
            globals: &reg.serializers,
            defaults: &reg.dialect_serializers,
        }
    }

    /// Column override, table list, schema list, user globals, dialect defaults.
    pub(crate) fn resolve<'s>(
        &'s self,
        schema: Option<&'s Schema>,
        table: Option<&'s TableDef>,
        property: &PropertyDef,
    ) -> Option<&'s TypeSerializer> {
        let domain = property.domain();
        if let Some(table) = table {
            let column = table
                .column_serializers
                .iter()
                .find(|(name, s)| name == property.name() && s.domain() == domain);
            if let Some((_, serializer)) = column {
                return Some(serializer);
            }
            if let Some(serializer) = find(&table.serializers, domain) {
                return Some(serializer);
            }
        }
        schema
            .and_then(|s| find(&s.serializers, domain))
            .or_else(|| find(self.globals, domain))
            .or_else(|| find(self.defaults, domain))
    }

    fn column(
        &self,
        schema: Option<&Schema>,
        table: Option<&TableDef>,
        property: &PropertyDef,
        unique: bool,
    ) -> Result<ColumnInfo> {
        let serializer = self.resolve(schema, table, property).ok_or_else(|| {
            Error::configuration(format!(
                "no serializer for '{}' of type {}",
                property.name(),
                property.domain_name()
            ))
        })?;
        Ok(ColumnInfo::new(property.clone(), serializer.clone(), unique))
    }
}

// ============================================================================
// Mapper
// ============================================================================

/// Read-only metadata graph for one dialect.
#[derive(Debug)]
pub struct Mapper {
    schemas: Vec<String>,
    tables: Vec<TableInfo>,
    by_type: HashMap<TypeId, TableId>,
    procedures: HashMap<TypeId, ProcedureInfo>,
    inputs: HashMap<TypeId, RecordInfo>,
    outputs: HashMap<TypeId, RecordInfo>,
}

impl Mapper {
    /// Validate the registration and build the graph.
    #[tracing::instrument(level = "debug", skip(registration))]
    pub fn register(registration: Registration) -> Result<Self> {
        validate::run(&registration)?;
        let resolver = Resolver::new(&registration);

        let mut tables = Vec::new();
        let mut by_type = HashMap::new();
        for schema in &registration.schemas {
            for def in &schema.tables {
                let id = TableId(tables.len());
                tables.push(build_table(&resolver, schema, def, id)?);
                by_type.insert(def.type_id, id);
            }
        }

        for table in &mut tables {
            for fk in &mut table.foreign {
                let target = by_type.get(&fk.target_type).copied().ok_or_else(|| {
                    Error::configuration(format!(
                        "foreign key '{}.{}' references unregistered table type {}",
                        table.name, fk.column.name, fk.target_name
                    ))
                })?;
                fk.target = Some(target);
            }
            tracing::trace!(table = %table.name, foreign = table.foreign.len(), "Bound foreign keys");
        }

        let mut procedures = HashMap::new();
        for schema in &registration.schemas {
            for def in &schema.procedures {
                let info = build_procedure(&resolver, Some(schema), def)?;
                procedures.insert(def.type_id, info);
            }
        }
        for def in &registration.procedures {
            procedures.insert(def.type_id, build_procedure(&resolver, None, def)?);
        }

        let inputs = build_records(&resolver, &registration.inputs)?;
        let outputs = build_records(&resolver, &registration.outputs)?;

        let mapper = Self {
            schemas: registration.schemas.iter().map(|s| s.name.clone()).collect(),
            tables,
            by_type,
            procedures,
            inputs,
            outputs,
        };
        tracing::info!(
            schemas = mapper.schemas.len(),
            tables = mapper.tables.len(),
            procedures = mapper.procedures.len(),
            inputs = mapper.inputs.len(),
            outputs = mapper.outputs.len(),
            "Mapper registered"
        );
        Ok(mapper)
    }

    /// Registered schema names in declaration order.
    pub fn schemas(&self) -> &[String] {
        &self.schemas
    }

    /// Every table in registration order.
    pub fn tables(&self) -> &[TableInfo] {
        &self.tables
    }

    pub fn tables_in<'a>(&'a self, schema: &'a str) -> impl Iterator<Item = &'a TableInfo> + 'a {
        self.tables.iter().filter(move |t| t.schema == schema)
    }

    pub fn table<T: Any>(&self) -> Result<&TableInfo> {
        self.table_by_id(TypeId::of::<T>())
    }

    /// Table of the runtime type of `row`.
    pub fn table_of(&self, row: &dyn Any) -> Result<&TableInfo> {
        self.table_by_id(row.type_id())
    }

    pub fn table_by_id(&self, type_id: TypeId) -> Result<&TableInfo> {
        self.by_type
            .get(&type_id)
            .map(|id| &self.tables[id.0])
            .ok_or_else(|| Error::lookup(format!("no table is registered for type {type_id:?}")))
    }

    pub fn foreign_table(&self, column: &ForeignColumn) -> Result<&TableInfo> {
        column
            .target
            .and_then(|id| self.tables.get(id.0))
            .ok_or_else(|| {
                Error::lookup(format!(
                    "foreign key '{}' is not bound to a table",
                    column.column.name
                ))
            })
    }

    /// Serializer resolved for `property` of the table, procedure or record `owner`.
    pub fn serializer(&self, owner: TypeId, property: &str) -> Result<&TypeSerializer> {
        let (owner_name, column) = if let Some(id) = self.by_type.get(&owner) {
            let table = &self.tables[id.0];
            (table.type_name, table.column(property))
        } else if let Some(procedure) = self.procedures.get(&owner) {
            (
                procedure.type_name,
                procedure.args.iter().find(|a| a.name == property),
            )
        } else if let Some(record) = self.inputs.get(&owner).or_else(|| self.outputs.get(&owner)) {
            (record.type_name, record.column(property))
        } else {
            ("<unregistered type>", None)
        };
        column
            .map(|c| &c.serializer)
            .ok_or_else(|| Error::SerializerMissing {
                owner: owner_name.to_string(),
                property: property.to_string(),
                domain: "<unknown>".to_string(),
            })
    }

    pub fn procedure<P: Any>(&self) -> Result<&ProcedureInfo> {
        self.procedures.get(&TypeId::of::<P>()).ok_or_else(|| {
            Error::lookup(format!(
                "procedure {} is not registered",
                std::any::type_name::<P>()
            ))
        })
    }

    /// Registered custom query input; anything else is refused.
    pub fn input<T: Any>(&self) -> Result<&RecordInfo> {
        self.inputs.get(&TypeId::of::<T>()).ok_or_else(|| {
            Error::serializer(format!(
                "{} is not a registered query input",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Registered custom query output; anything else is refused.
    pub fn output<T: Any>(&self) -> Result<&RecordInfo> {
        self.outputs.get(&TypeId::of::<T>()).ok_or_else(|| {
            Error::serializer(format!(
                "{} is not a registered query output",
                std::any::type_name::<T>()
            ))
        })
    }

    /// Build a `T` from a result row, for registered tables and outputs.
    pub fn decode<T: Any>(&self, row: &Row) -> Result<T> {
        let type_id = TypeId::of::<T>();
        let decoded = if let Some(id) = self.by_type.get(&type_id) {
            self.tables[id.0].decode(row)?
        } else if let Some(output) = self.outputs.get(&type_id) {
            output.decode(row)?
        } else {
            return Err(Error::lookup(format!(
                "{} is neither a registered table nor output",
                std::any::type_name::<T>()
            )));
        };
        decoded.downcast::<T>().map(|t| *t).map_err(|_| {
            Error::lookup(format!(
                "decoded value is not a {}",
                std::any::type_name::<T>()
            ))
        })
    }
}

fn build_table(
    resolver: &Resolver<'_>,
    schema: &Schema,
    def: &TableDef,
    id: TableId,
) -> Result<TableInfo> {
    let has = |column: &str, constraint: Constraint| {
        def.constraints_of(column).any(|c| c == constraint)
    };

    let pk = &def.primary;
    let primary = PrimaryColumn {
        column: resolver.column(Some(schema), Some(def), pk, false)?,
        auto_increment: has(pk.name(), Constraint::AutoIncrement),
        auto_uuid: has(pk.name(), Constraint::AutoUuid),
    };

    let foreign = def
        .foreign
        .iter()
        .map(|fk| {
            let name = fk.property.name();
            Ok(ForeignColumn {
                column: resolver.column(
                    Some(schema),
                    Some(def),
                    &fk.property,
                    has(name, Constraint::Unique),
                )?,
                target_type: fk.target,
                target_name: fk.target_name,
                target: None,
                cascade_update: has(name, Constraint::CascadeUpdate),
                cascade_delete: has(name, Constraint::CascadeDelete),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let other = def
        .columns
        .iter()
        .map(|p| resolver.column(Some(schema), Some(def), p, has(p.name(), Constraint::Unique)))
        .collect::<Result<Vec<_>>>()?;

    tracing::debug!(
        schema = %schema.name,
        table = %def.name,
        foreign = foreign.len(),
        other = other.len(),
        "Registered table"
    );

    Ok(TableInfo {
        id,
        schema: schema.name.clone(),
        name: def.name.clone(),
        type_id: def.type_id,
        type_name: def.type_name,
        primary,
        foreign,
        other,
        factory: def.factory.clone(),
    })
}

fn build_procedure(
    resolver: &Resolver<'_>,
    schema: Option<&Schema>,
    def: &ProcedureDef,
) -> Result<ProcedureInfo> {
    let args = def
        .args
        .iter()
        .map(|a| resolver.column(schema, None, a, false))
        .collect::<Result<Vec<_>>>()?;
    Ok(ProcedureInfo {
        schema: schema.map(|s| s.name.clone()),
        name: def.name.clone(),
        type_id: def.type_id,
        type_name: def.type_name,
        args,
    })
}

fn build_records(
    resolver: &Resolver<'_>,
    defs: &[RecordDef],
) -> Result<HashMap<TypeId, RecordInfo>> {
    defs.iter()
        .map(|def| {
            let columns = def
                .properties
                .iter()
                .map(|p| resolver.column(None, None, p, false))
                .collect::<Result<Vec<_>>>()?;
            let info = RecordInfo {
                type_id: def.type_id,
                type_name: def.type_name,
                columns,
                factory: def.factory.clone(),
            };
            Ok((def.type_id, info))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::Table;
    use crate::property;
    use crate::row::ColumnMeta;
    use crate::serializer::basic;
    use crate::value::Value;
    use crate::wire::WireType;
    use std::sync::Arc;

    #[derive(Debug, Default, PartialEq)]
    struct Parent {
        pk: Option<i32>,
        col: String,
    }

    #[derive(Debug, Default)]
    struct Child {
        pk: Option<i32>,
        fk: i32,
        col: String,
    }

    #[derive(Debug, Default)]
    struct Node {
        pk: Option<i32>,
        parent: Option<i32>,
    }

    fn parent_table() -> Table<Parent> {
        Table::new("Parent", property!(Parent, pk?))
            .column(property!(Parent, col))
            .constraint("pk", Constraint::AutoIncrement)
    }

    fn child_table() -> Table<Child> {
        Table::new("Child", property!(Child, pk?))
            .foreign_key::<Parent>(property!(Child, fk))
            .column(property!(Child, col))
            .constraint("pk", Constraint::AutoIncrement)
            .constraint("fk", Constraint::CascadeDelete)
    }

    fn registration(schema: Schema) -> Registration {
        Registration::new()
            .schema(schema)
            .dialect_serializers(basic::all())
    }

    fn config_err(reg: Registration) -> String {
        let err = Mapper::register(reg).unwrap_err();
        assert!(err.is_configuration(), "unexpected error: {err}");
        err.to_string()
    }

    #[test]
    fn test_forward_reference_resolves() {
        // Child is declared before the table it references.
        let schema = Schema::new("main").table(child_table()).table(parent_table());
        let mapper = Mapper::register(registration(schema)).unwrap();

        let child = mapper.table::<Child>().unwrap();
        assert!(child.is_initialized());
        assert!(child.primary.auto_increment);
        assert!(child.foreign[0].cascade_delete);
        let target = mapper.foreign_table(&child.foreign[0]).unwrap();
        assert_eq!(target.name, "Parent");
        assert_eq!(mapper.schemas(), ["main".to_string()]);
    }

    #[test]
    fn test_self_reference_resolves() {
        let node = Table::new("Node", property!(Node, pk?))
            .foreign_key::<Node>(property!(Node, parent?))
            .constraint("pk", Constraint::AutoIncrement);
        let mapper = Mapper::register(registration(Schema::new("main").table(node))).unwrap();
        let info = mapper.table::<Node>().unwrap();
        assert_eq!(mapper.foreign_table(&info.foreign[0]).unwrap().id, info.id);
        assert!(info.foreign[0].column.nullable);
    }

    #[test]
    fn test_unregistered_target_fails() {
        let msg = config_err(registration(Schema::new("main").table(child_table())));
        assert!(msg.contains("unregistered"));
    }

    #[test]
    fn test_duplicate_table_name_fails() {
        let schema = Schema::new("main")
            .table(parent_table())
            .table(Table::new("Parent", property!(Child, pk?)));
        let msg = config_err(registration(schema));
        assert!(msg.contains("appears twice"));
    }

    #[test]
    fn test_type_registered_twice_fails() {
        let reg = Registration::new()
            .schema(Schema::new("a").table(parent_table()))
            .schema(Schema::new("b").table(Table::new("Other", property!(Parent, pk?))))
            .dialect_serializers(basic::all());
        config_err(reg);
    }

    #[test]
    fn test_primary_key_as_foreign_key_fails() {
        let table = Table::new("Node", property!(Node, pk?))
            .foreign_key::<Node>(property!(Node, pk?));
        let msg = config_err(registration(Schema::new("main").table(table)));
        assert!(msg.contains("cannot also be a foreign key"));
    }

    #[test]
    fn test_misplaced_constraints_fail() {
        let unique_pk = parent_table().constraint("pk", Constraint::Unique);
        config_err(registration(Schema::new("main").table(unique_pk)));

        let cascade_on_column = parent_table().constraint("col", Constraint::CascadeDelete);
        config_err(registration(Schema::new("main").table(cascade_on_column)));

        let unknown = parent_table().constraint("nope", Constraint::Unique);
        let msg = config_err(registration(Schema::new("main").table(unknown)));
        assert!(msg.contains("unknown column"));

        let twice = parent_table()
            .constraint("col", Constraint::Unique)
            .constraint("col", Constraint::Unique);
        config_err(registration(Schema::new("main").table(twice)));
    }

    #[test]
    fn test_auto_key_rules() {
        let text_key = Table::new("Parent", property!(Parent, col))
            .constraint("col", Constraint::AutoIncrement);
        let msg = config_err(registration(Schema::new("main").table(text_key)));
        assert!(msg.contains("must be an integer"));

        let required_key = Table::new("Child", property!(Child, fk))
            .constraint("fk", Constraint::AutoIncrement);
        let msg = config_err(registration(Schema::new("main").table(required_key)));
        assert!(msg.contains("optional"));
    }

    #[test]
    fn test_missing_serializer_fails() {
        let table = Table::new("Parent", property!(Parent, pk?)).column(property!(Parent, col));
        let reg = Registration::new().schema(Schema::new("main").table(table));
        let msg = config_err(reg);
        assert!(msg.contains("no serializer"));
    }

    #[test]
    fn test_invalid_identifier_fails() {
        let table = Table::new("bad name", property!(Parent, pk?));
        config_err(registration(Schema::new("main").table(table)));
        config_err(registration(Schema::new("1main")));
    }

    #[test]
    fn test_serializer_resolution_order() {
        let schema = Schema::new("main")
            .serializer(basic::string(200))
            .table(parent_table().column_serializer("col", basic::string(10)))
            .table(child_table().serializer(basic::string(50)))
            .table(Table::new("Node", property!(Node, pk?)));
        let reg = registration(schema).serializer(basic::string(300));
        let mapper = Mapper::register(reg).unwrap();

        let col = |t: TypeId| mapper.serializer(t, "col").map(|s| s.db_type().to_string());
        assert_eq!(col(TypeId::of::<Parent>()).unwrap(), "VARCHAR(10)");
        assert_eq!(col(TypeId::of::<Child>()).unwrap(), "VARCHAR(50)");
        let pk = mapper.serializer(TypeId::of::<Node>(), "pk").unwrap();
        assert_eq!(pk.db_type(), "INTEGER");

        let err = mapper.serializer(TypeId::of::<Node>(), "missing").unwrap_err();
        assert!(matches!(err, Error::SerializerMissing { .. }));
    }

    #[test]
    fn test_global_serializer_beats_dialect_default() {
        let schema = Schema::new("main").table(parent_table());
        let mapper = Mapper::register(registration(schema).serializer(basic::string(255))).unwrap();
        let table = mapper.table::<Parent>().unwrap();
        assert_eq!(table.column("col").unwrap().db_type(), "VARCHAR(255)");
    }

    #[test]
    fn test_decode_table_row() {
        let mapper = Mapper::register(registration(Schema::new("main").table(parent_table()))).unwrap();
        let columns: Arc<[ColumnMeta]> = Arc::from(vec![
            ColumnMeta::new("pk", Some(WireType::BigInt)),
            ColumnMeta::new("col", Some(WireType::Varchar)),
        ]);
        let row = Row::new(columns, vec![Value::BigInt(3), Value::Text("x".into())]);
        let parent: Parent = mapper.decode(&row).unwrap();
        assert_eq!(
            parent,
            Parent {
                pk: Some(3),
                col: "x".into()
            }
        );
    }

    #[test]
    fn test_decode_rejects_wrong_wire() {
        let mapper = Mapper::register(registration(Schema::new("main").table(parent_table()))).unwrap();
        let columns: Arc<[ColumnMeta]> = Arc::from(vec![
            ColumnMeta::new("pk", Some(WireType::Varchar)),
            ColumnMeta::new("col", Some(WireType::Varchar)),
        ]);
        let row = Row::new(columns, vec![Value::Text("3".into()), Value::Text("x".into())]);
        let err = mapper.decode::<Parent>(&row).unwrap_err();
        assert!(matches!(err, Error::SerializerMismatch { .. }));
    }

    #[test]
    fn test_unregistered_input_is_serializer_error() {
        let mapper = Mapper::register(registration(Schema::new("main"))).unwrap();
        assert!(matches!(mapper.input::<Parent>(), Err(Error::Serializer { .. })));
        assert!(mapper.table::<Parent>().unwrap_err().is_lookup());
    }

    #[test]
    fn test_empty_output_fails() {
        let reg = registration(Schema::new("main")).output(Record::<Parent>::new());
        let msg = config_err(reg);
        assert!(msg.contains("no properties"));
    }
}
