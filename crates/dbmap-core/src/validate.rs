//! Start-up validation of a [`Registration`].
//!
//! Every check is an independent function over the raw definitions. They run in
//! order and stop at the first failure, which is always reported as
//! [`Error::Configuration`].

use std::any::TypeId;
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::definition::{Constraint, Schema, TableDef};
use crate::error::{Error, Result};
use crate::field::PropertyDef;
use crate::mapper::{Registration, Resolver};
use crate::serializer::TypeSerializer;

fn identifier_regex() -> Option<&'static Regex> {
    static IDENT: OnceLock<Option<Regex>> = OnceLock::new();
    IDENT
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").ok())
        .as_ref()
}

/// Whether `name` can be used as a schema, table or column name.
pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_some_and(|re| re.is_match(name))
}

fn check_identifier(kind: &str, name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::configuration(format!("{kind} name '{name}' is not a valid identifier")))
    }
}

/// Run the whole battery.
pub fn run(reg: &Registration) -> Result<()> {
    schema_names(reg)?;
    table_names(reg)?;
    primary_not_foreign(reg)?;
    property_names(reg)?;
    foreign_targets(reg)?;
    duplicate_foreign_keys(reg)?;
    constraint_columns(reg)?;
    constraint_placement(reg)?;
    auto_keys(reg)?;
    serializers(reg)?;
    records_and_procedures(reg)?;
    Ok(())
}

fn tables(reg: &Registration) -> impl Iterator<Item = (&Schema, &TableDef)> {
    reg.schemas
        .iter()
        .flat_map(|s| s.tables.iter().map(move |t| (s, t)))
}

pub(crate) fn schema_names(reg: &Registration) -> Result<()> {
    let mut seen = HashSet::new();
    for schema in &reg.schemas {
        check_identifier("schema", &schema.name)?;
        if !seen.insert(schema.name.as_str()) {
            return Err(Error::configuration(format!(
                "schema '{}' is registered more than once",
                schema.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn table_names(reg: &Registration) -> Result<()> {
    let mut types = HashSet::new();
    for schema in &reg.schemas {
        let mut names = HashSet::new();
        for table in &schema.tables {
            check_identifier("table", &table.name)?;
            if !names.insert(table.name.as_str()) {
                return Err(Error::configuration(format!(
                    "table '{}' appears twice in schema '{}'",
                    table.name, schema.name
                )));
            }
            if !types.insert(table.type_id) {
                return Err(Error::configuration(format!(
                    "type {} is registered as more than one table",
                    table.type_name
                )));
            }
        }
    }
    Ok(())
}

fn unique_properties<'a>(
    owner: &str,
    properties: impl Iterator<Item = &'a PropertyDef>,
) -> Result<()> {
    let mut seen = HashSet::new();
    for property in properties {
        check_identifier("column", property.name())?;
        if !seen.insert(property.name()) {
            return Err(Error::configuration(format!(
                "{owner} declares property '{}' more than once",
                property.name()
            )));
        }
    }
    Ok(())
}

pub(crate) fn property_names(reg: &Registration) -> Result<()> {
    for (_, table) in tables(reg) {
        unique_properties(&format!("table '{}'", table.name), table.properties())?;
    }
    Ok(())
}

pub(crate) fn primary_not_foreign(reg: &Registration) -> Result<()> {
    for (_, table) in tables(reg) {
        let pk = table.primary.name();
        if table.foreign.iter().any(|f| f.property.name() == pk) {
            return Err(Error::configuration(format!(
                "primary key '{}.{pk}' cannot also be a foreign key",
                table.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn foreign_targets(reg: &Registration) -> Result<()> {
    for (_, table) in tables(reg) {
        for fk in &table.foreign {
            let Some((_, target)) = tables(reg).find(|(_, t)| t.type_id == fk.target) else {
                return Err(Error::configuration(format!(
                    "foreign key '{}.{}' references unregistered table type {}",
                    table.name,
                    fk.property.name(),
                    fk.target_name
                )));
            };
            if target.primary.domain() != fk.property.domain() {
                return Err(Error::configuration(format!(
                    "foreign key '{}.{}' has type {} but '{}.{}' is {}",
                    table.name,
                    fk.property.name(),
                    fk.property.domain_name(),
                    target.name,
                    target.primary.name(),
                    target.primary.domain_name()
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn duplicate_foreign_keys(reg: &Registration) -> Result<()> {
    for (_, table) in tables(reg) {
        let mut seen = HashSet::new();
        for fk in &table.foreign {
            if !seen.insert(fk.property.name()) {
                return Err(Error::configuration(format!(
                    "table '{}' declares foreign key '{}' twice",
                    table.name,
                    fk.property.name()
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn constraint_columns(reg: &Registration) -> Result<()> {
    for (_, table) in tables(reg) {
        let mut seen = HashSet::new();
        for (column, constraint) in &table.constraints {
            if !table.properties().any(|p| p.name() == column) {
                return Err(Error::configuration(format!(
                    "constraint {constraint} names unknown column '{}.{column}'",
                    table.name
                )));
            }
            if !seen.insert((column.as_str(), *constraint)) {
                return Err(Error::configuration(format!(
                    "constraint {constraint} is declared twice on '{}.{column}'",
                    table.name
                )));
            }
        }
    }
    Ok(())
}

pub(crate) fn constraint_placement(reg: &Registration) -> Result<()> {
    for (_, table) in tables(reg) {
        let pk = table.primary.name();
        for (column, constraint) in &table.constraints {
            let is_pk = column == pk;
            let is_fk = table.foreign.iter().any(|f| f.property.name() == column);
            let valid = match constraint {
                Constraint::AutoIncrement | Constraint::AutoUuid => is_pk,
                Constraint::CascadeUpdate | Constraint::CascadeDelete => is_fk,
                Constraint::Unique => !is_pk,
            };
            if !valid {
                return Err(Error::configuration(format!(
                    "constraint {constraint} is not allowed on column '{}.{column}'",
                    table.name
                )));
            }
        }
        let autos = table
            .constraints_of(pk)
            .filter(|c| matches!(c, Constraint::AutoIncrement | Constraint::AutoUuid))
            .count();
        if autos > 1 {
            return Err(Error::configuration(format!(
                "primary key '{}.{pk}' cannot be both auto-increment and auto-uuid",
                table.name
            )));
        }
    }
    Ok(())
}

pub(crate) fn auto_keys(reg: &Registration) -> Result<()> {
    let resolver = Resolver::new(reg);
    for (schema, table) in tables(reg) {
        let pk = &table.primary;
        for constraint in table.constraints_of(pk.name()) {
            let path = format!("{}.{}", table.name, pk.name());
            match constraint {
                Constraint::AutoIncrement => {
                    let integral = resolver
                        .resolve(Some(schema), Some(table), pk)
                        .is_some_and(|s| s.wire().is_integral());
                    if !integral {
                        return Err(Error::configuration(format!(
                            "auto-increment primary key '{path}' must be an integer"
                        )));
                    }
                }
                Constraint::AutoUuid => {
                    if pk.domain() != TypeId::of::<uuid::Uuid>() {
                        return Err(Error::configuration(format!(
                            "auto-uuid primary key '{path}' must be a uuid::Uuid"
                        )));
                    }
                    if !reg.allow_auto_uuid {
                        return Err(Error::configuration(format!(
                            "auto-uuid primary key '{path}' is not supported by this database"
                        )));
                    }
                }
                _ => continue,
            }
            if !pk.nullable() {
                return Err(Error::configuration(format!(
                    "generated primary key '{path}' must be declared optional"
                )));
            }
        }
    }
    Ok(())
}

fn unique_domains(list: &[TypeSerializer], owner: &str) -> Result<()> {
    let mut seen = HashSet::new();
    for serializer in list {
        if !seen.insert(serializer.domain()) {
            return Err(Error::configuration(format!(
                "{owner} lists more than one serializer for {}",
                serializer.domain_name()
            )));
        }
    }
    Ok(())
}

fn resolvable(
    resolver: &Resolver<'_>,
    schema: Option<&Schema>,
    table: Option<&TableDef>,
    owner: &str,
    property: &PropertyDef,
) -> Result<()> {
    match resolver.resolve(schema, table, property) {
        Some(_) => Ok(()),
        None => Err(Error::configuration(format!(
            "no serializer for '{owner}.{}' of type {}",
            property.name(),
            property.domain_name()
        ))),
    }
}

pub(crate) fn serializers(reg: &Registration) -> Result<()> {
    unique_domains(&reg.serializers, "the global serializer list")?;
    unique_domains(&reg.dialect_serializers, "the dialect serializer list")?;
    for schema in &reg.schemas {
        unique_domains(&schema.serializers, &format!("schema '{}'", schema.name))?;
    }

    let resolver = Resolver::new(reg);
    for (schema, table) in tables(reg) {
        unique_domains(&table.serializers, &format!("table '{}'", table.name))?;

        let mut overridden = HashSet::new();
        for (column, serializer) in &table.column_serializers {
            let Some(property) = table.properties().find(|p| p.name() == column) else {
                return Err(Error::configuration(format!(
                    "serializer override names unknown column '{}.{column}'",
                    table.name
                )));
            };
            if property.domain() != serializer.domain() {
                return Err(Error::configuration(format!(
                    "serializer for {} cannot serialize '{}.{column}' of type {}",
                    serializer.domain_name(),
                    table.name,
                    property.domain_name()
                )));
            }
            if !overridden.insert(column.as_str()) {
                return Err(Error::configuration(format!(
                    "column '{}.{column}' has more than one serializer override",
                    table.name
                )));
            }
        }

        for property in table.properties() {
            resolvable(&resolver, Some(schema), Some(table), &table.name, property)?;
        }
    }

    for schema in &reg.schemas {
        for procedure in &schema.procedures {
            for arg in &procedure.args {
                resolvable(&resolver, Some(schema), None, &procedure.name, arg)?;
            }
        }
    }
    for procedure in &reg.procedures {
        for arg in &procedure.args {
            resolvable(&resolver, None, None, &procedure.name, arg)?;
        }
    }
    for record in reg.inputs.iter().chain(&reg.outputs) {
        for property in &record.properties {
            resolvable(&resolver, None, None, record.type_name, property)?;
        }
    }
    Ok(())
}

pub(crate) fn records_and_procedures(reg: &Registration) -> Result<()> {
    for (kind, list) in [("input", &reg.inputs), ("output", &reg.outputs)] {
        let mut seen = HashSet::new();
        for record in list {
            if !seen.insert(record.type_id) {
                return Err(Error::configuration(format!(
                    "{kind} {} is registered more than once",
                    record.type_name
                )));
            }
            if record.properties.is_empty() {
                return Err(Error::configuration(format!(
                    "{kind} {} declares no properties",
                    record.type_name
                )));
            }
            unique_properties(&format!("{kind} {}", record.type_name), record.properties.iter())?;
        }
    }

    let mut types = HashSet::new();
    let all = reg
        .schemas
        .iter()
        .flat_map(|s| s.procedures.iter())
        .chain(&reg.procedures);
    for procedure in all {
        check_identifier("procedure", &procedure.name)?;
        if !types.insert(procedure.type_id) {
            return Err(Error::configuration(format!(
                "procedure {} is registered more than once",
                procedure.type_name
            )));
        }
        unique_properties(&format!("procedure '{}'", procedure.name), procedure.args.iter())?;
    }
    Ok(())
}
