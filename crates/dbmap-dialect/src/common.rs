//! SQL shared by most dialects.
//!
//! The [`Dialect`] trait's default methods call into these functions; a
//! dialect overrides a trait method only where its syntax differs.

use std::any::Any;

use dbmap_core::{ColumnInfo, Error, Mapper, PrimaryColumn, ProcedureInfo, Result, TableInfo};
use dbmap_query::{Cursor, Page, Query, QueryValue};

use crate::Dialect;

/// Quote `name` with `open`/`close`, doubling embedded `close` characters.
pub fn quote(name: &str, open: char, close: char) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push(open);
    for c in name.chars() {
        out.push(c);
        if c == close {
            out.push(close);
        }
    }
    out.push(close);
    out
}

pub fn table_path<D: Dialect + ?Sized>(dialect: &D, table: &TableInfo) -> String {
    dialect.table_path(&table.schema, &table.name)
}

pub fn primary_path<D: Dialect + ?Sized>(dialect: &D, table: &TableInfo) -> String {
    dialect.column_path(&table.schema, &table.name, &table.primary.column.name)
}

/// Schema-qualified procedure name when the procedure belongs to a schema.
pub fn procedure_path<D: Dialect + ?Sized>(dialect: &D, procedure: &ProcedureInfo) -> String {
    match &procedure.schema {
        Some(schema) => dialect.table_path(schema, &procedure.name),
        None => dialect.escape(&procedure.name),
    }
}

/// `"col" TYPE[ NOT NULL][ UNIQUE]`
pub fn column_definition<D: Dialect + ?Sized>(dialect: &D, column: &ColumnInfo) -> String {
    let not_null = if column.nullable { "" } else { " NOT NULL" };
    let unique = if column.unique { " UNIQUE" } else { "" };
    format!(
        "{} {}{not_null}{unique}",
        dialect.escape(&column.name),
        column.db_type()
    )
}

/// `"pk" TYPE PRIMARY KEY`, used for keys the application assigns.
pub fn manual_primary_key<D: Dialect + ?Sized>(dialect: &D, primary: &PrimaryColumn) -> String {
    format!(
        "{} {} PRIMARY KEY",
        dialect.escape(&primary.column.name),
        primary.column.db_type()
    )
}

pub fn create_table<D: Dialect + ?Sized>(
    dialect: &D,
    mapper: &Mapper,
    table: &TableInfo,
) -> Result<Query> {
    let mut columns = vec![dialect.primary_key(&table.primary)];
    let mut constraints = Vec::new();

    for fk in &table.foreign {
        columns.push(column_definition(dialect, &fk.column));
        let target = mapper.foreign_table(fk)?;
        let update = if fk.cascade_update && dialect.supports_cascade_update() {
            " ON UPDATE CASCADE"
        } else {
            ""
        };
        let delete = if fk.cascade_delete { " ON DELETE CASCADE" } else { "" };
        constraints.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({}){update}{delete}",
            dialect.escape(&fk.column.name),
            dialect.reference_path(target),
            dialect.escape(&target.primary.column.name)
        ));
    }
    for column in &table.other {
        columns.push(column_definition(dialect, column));
    }
    columns.extend(constraints);

    let sql = format!(
        "{} {} ({})",
        dialect.create_table_prefix(),
        table_path(dialect, table),
        columns.join(", ")
    );
    tracing::trace!(dialect = dialect.name(), sql = %sql, "Generated CREATE TABLE");
    Ok(Query::new(sql))
}

pub fn drop_table<D: Dialect + ?Sized>(dialect: &D, table: &TableInfo, cascade: bool) -> Query {
    let cascade = match dialect.drop_cascade() {
        Some(clause) if cascade => clause,
        _ => "",
    };
    let exists = if dialect.supports_drop_if_exists() {
        " IF EXISTS"
    } else {
        ""
    };
    Query::new(format!(
        "DROP TABLE{exists} {}{cascade}",
        table_path(dialect, table)
    ))
}

/// Encode one column of `row` as a bound value.
pub fn bind(column: &ColumnInfo, row: &dyn Any) -> Result<QueryValue> {
    Ok(QueryValue::new(&column.name, column.read(row)?, column.wire()))
}

/// Encode a bare domain value with a column's serializer.
pub fn bind_raw(column: &ColumnInfo, value: &dyn Any) -> Result<QueryValue> {
    let encoded = column.serializer.encode(&column.name, value)?;
    Ok(QueryValue::new(&column.name, encoded, column.wire()))
}

pub fn insert_row<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableInfo,
    row: &dyn Any,
) -> Result<Query> {
    let columns: Vec<&ColumnInfo> = table.insert_columns().collect();
    let values = columns
        .iter()
        .map(|c| bind(c, row))
        .collect::<Result<Vec<_>>>()?;
    let sql = if columns.is_empty() {
        format!(
            "INSERT INTO {} {}",
            table_path(dialect, table),
            dialect.empty_insert()
        )
    } else {
        let names: Vec<String> = columns.iter().map(|c| dialect.escape(&c.name)).collect();
        let marks = vec!["?"; columns.len()].join(", ");
        format!(
            "INSERT INTO {} ({}) VALUES ({marks})",
            table_path(dialect, table),
            names.join(", ")
        )
    };
    Ok(Query::with_values(sql, values))
}

/// INSERT with every column left to its default, for databases without
/// `DEFAULT VALUES`. Falls back to [`insert_row`] when there is something to set.
pub fn insert_defaults<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableInfo,
    row: &dyn Any,
) -> Result<Query> {
    if table.insert_columns().next().is_some() {
        return insert_row(dialect, table, row);
    }
    Ok(Query::new(format!(
        "INSERT INTO {} ({}) VALUES (DEFAULT)",
        table_path(dialect, table),
        dialect.escape(&table.primary.column.name)
    )))
}

pub fn update_row<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableInfo,
    row: &dyn Any,
) -> Result<Query> {
    let mut columns: Vec<&ColumnInfo> = table.non_key_columns().collect();
    if columns.is_empty() {
        // Nothing but the key: a no-op update still reports whether the row exists.
        columns.push(&table.primary.column);
    }
    let mut values = columns
        .iter()
        .map(|c| bind(c, row))
        .collect::<Result<Vec<_>>>()?;
    values.push(bind(&table.primary.column, row)?);

    let set: Vec<String> = columns
        .iter()
        .map(|c| format!("{} = ?", dialect.escape(&c.name)))
        .collect();
    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table_path(dialect, table),
        set.join(", "),
        primary_path(dialect, table)
    );
    Ok(Query::with_values(sql, values))
}

pub fn delete_row<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableInfo,
    row: &dyn Any,
) -> Result<Query> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?",
        table_path(dialect, table),
        primary_path(dialect, table)
    );
    Ok(Query::with_values(sql, vec![bind(&table.primary.column, row)?]))
}

pub fn select_by_pk<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableInfo,
    pk: &dyn Any,
) -> Result<Query> {
    let sql = format!(
        "SELECT * FROM {} WHERE {} = ?",
        table_path(dialect, table),
        primary_path(dialect, table)
    );
    Ok(Query::with_values(sql, vec![bind_raw(&table.primary.column, pk)?]))
}

fn order_column<'a>(table: &'a TableInfo, name: &str) -> Result<&'a ColumnInfo> {
    table.column(name).ok_or_else(|| {
        Error::lookup(format!("table '{}' has no column '{name}' to order by", table.name))
    })
}

pub fn select_page<D: Dialect + ?Sized>(dialect: &D, table: &TableInfo, page: &Page) -> Result<Query> {
    let column = order_column(table, &page.order_by)?;
    Ok(Query::new(format!(
        "SELECT * FROM {} ORDER BY {} {} {}",
        table_path(dialect, table),
        dialect.escape(&column.name),
        page.order.as_sql(),
        dialect.limit_clause(page.limit, Some(page.offset()))
    )))
}

pub fn select_cursor<D: Dialect + ?Sized>(
    dialect: &D,
    table: &TableInfo,
    cursor: &Cursor,
) -> Result<Query> {
    let column = order_column(table, &cursor.order_by)?;
    let name = dialect.escape(&column.name);
    let index = bind_raw(column, cursor.index.as_ref())?;
    let sql = format!(
        "SELECT * FROM {} WHERE {name} {} ? ORDER BY {name} {} {}",
        table_path(dialect, table),
        cursor.comparison(),
        cursor.order.as_sql(),
        dialect.limit_clause(cursor.limit, None)
    );
    Ok(Query::with_values(sql, vec![index]))
}

/// Bound argument values of a procedure call, in declaration order.
pub fn procedure_args(procedure: &ProcedureInfo, args: &dyn Any) -> Result<Vec<QueryValue>> {
    procedure.args.iter().map(|a| bind(a, args)).collect()
}

/// `?, ?, ?`
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

/// Indent every line of a procedure body by four spaces.
pub fn indent(body: &str) -> String {
    body.trim()
        .lines()
        .map(|line| format!("    {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}
