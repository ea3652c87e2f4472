//! Schema diagrams rendered from the registered table graph.
//!
//! Two text formats are produced: a PlantUML class diagram and a dbdiagram.io
//! description. Both walk schemas and tables in registration order, so the
//! output is stable for a given registration.

use serde::{Deserialize, Serialize};

use crate::column::ColumnInfo;
use crate::error::Result;
use crate::mapper::Mapper;
use crate::table::TableInfo;

/// Which columns a PlantUML diagram lists per table.
///
/// Relationship arrows are always drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagramOptions {
    pub primary_key: bool,
    pub foreign_keys: bool,
    pub other_columns: bool,
}

impl Default for DiagramOptions {
    fn default() -> Self {
        Self {
            primary_key: true,
            foreign_keys: true,
            other_columns: false,
        }
    }
}

impl DiagramOptions {
    #[must_use]
    pub fn primary_key(mut self, show: bool) -> Self {
        self.primary_key = show;
        self
    }

    #[must_use]
    pub fn foreign_keys(mut self, show: bool) -> Self {
        self.foreign_keys = show;
        self
    }

    #[must_use]
    pub fn other_columns(mut self, show: bool) -> Self {
        self.other_columns = show;
        self
    }
}

/// Drop module paths from every segment of a type name:
/// `chrono::DateTime<chrono::offset::utc::Utc>` becomes `DateTime<Utc>`.
fn short_type_name(full: &str) -> String {
    fn last(path: &str) -> &str {
        path.rsplit("::").next().unwrap_or(path)
    }

    let mut out = String::with_capacity(full.len());
    let mut path = String::new();
    for ch in full.chars() {
        if ch.is_alphanumeric() || ch == '_' || ch == ':' {
            path.push(ch);
        } else {
            out.push_str(last(&path));
            path.clear();
            out.push(ch);
        }
    }
    out.push_str(last(&path));
    out
}

fn column_type(column: &ColumnInfo) -> String {
    short_type_name(column.serializer.domain_name())
}

fn path(table: &TableInfo) -> String {
    format!("{}.{}", table.schema, table.name)
}

impl Mapper {
    /// PlantUML class diagram: one package per schema, one class per table,
    /// and an arrow from every foreign key to the table it references.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn plant_uml(&self, options: &DiagramOptions) -> Result<String> {
        let mut text = vec![
            "@startuml".to_string(),
            "skinparam backgroundColor darkgray".to_string(),
            "skinparam ClassBackgroundColor lightgray".to_string(),
            String::new(),
        ];
        let mut relationships = Vec::new();

        for schema in self.schemas() {
            text.push(format!("package {schema} <<Folder>> {{"));
            for table in self.tables_in(schema) {
                let class = path(table);
                text.push(format!("\tclass {class} {{"));
                if options.primary_key {
                    let pk = &table.primary.column;
                    text.push(format!("\t\t{}: {}", pk.name, column_type(pk)));
                }
                for fk in &table.foreign {
                    let target = self.foreign_table(fk)?;
                    relationships.push(format!("{class} -down-> {}: {}", path(target), fk.column.name));
                    if options.foreign_keys {
                        text.push(format!("\t\t{}: {}", fk.column.name, short_type_name(target.type_name)));
                    }
                }
                if options.other_columns {
                    for column in &table.other {
                        text.push(format!("\t\t{}: {}", column.name, column_type(column)));
                    }
                }
                text.push("\t}".to_string());
            }
            text.push("}".to_string());
        }

        text.push(String::new());
        text.extend(relationships);
        text.push(String::new());
        text.push("@enduml".to_string());
        Ok(text.join("\n"))
    }

    /// dbdiagram.io description: one `Table` block per table with inline
    /// references, then one `TableGroup` per schema.
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn db_diagram_io(&self, other_columns: bool) -> Result<String> {
        let mut text = Vec::new();
        let mut groups = Vec::new();

        for schema in self.schemas() {
            groups.push(format!("TableGroup {schema} {{"));
            for table in self.tables_in(schema) {
                let name = path(table);
                let pk = &table.primary.column;
                text.push(format!("Table {name} {{"));
                groups.push(format!("\t{name}"));
                text.push(format!("\t{} {} [primary key]", pk.name, column_type(pk)));
                for fk in &table.foreign {
                    let target = self.foreign_table(fk)?;
                    text.push(format!(
                        "\t{} {} [ref: > {}.{}]",
                        fk.column.name,
                        short_type_name(target.type_name),
                        path(target),
                        target.primary.column.name
                    ));
                }
                if other_columns {
                    for column in &table.other {
                        text.push(format!("\t{} {}", column.name, column_type(column)));
                    }
                }
                text.push("}".to_string());
            }
            groups.push("}".to_string());
        }

        text.push(String::new());
        text.extend(groups);
        Ok(text.join("\n"))
    }
}
