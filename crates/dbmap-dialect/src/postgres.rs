//! PostgreSQL.
//!
//! Generated keys come back through `RETURNING` on the single-row insert, so no
//! driver key support or follow-up statement is needed.

use std::any::Any;

use dbmap_core::{PrimaryColumn, ProcedureInfo, Result, TableInfo, TypeSerializer};
use dbmap_query::{Escape, Query};

use crate::{Dialect, KeyRetrieval, common, serializers};

#[derive(Debug, Clone, Copy, Default)]
pub struct Postgres;

impl Escape for Postgres {
    fn escape(&self, name: &str) -> String {
        common::quote(name, '"', '"')
    }
}

impl Dialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn serializers(&self) -> Vec<TypeSerializer> {
        serializers::postgres()
    }

    fn allows_auto_uuid(&self) -> bool {
        true
    }

    fn primary_key(&self, primary: &PrimaryColumn) -> String {
        let name = self.escape(&primary.column.name);
        if primary.auto_uuid {
            return format!(
                "{name} {} PRIMARY KEY DEFAULT gen_random_uuid()",
                primary.column.db_type()
            );
        }
        if !primary.auto_increment {
            return common::manual_primary_key(self, primary);
        }
        let serial = match primary.column.db_type() {
            "SMALLINT" => "SMALLSERIAL",
            "BIGINT" => "BIGSERIAL",
            _ => "SERIAL",
        };
        format!("{name} {serial} PRIMARY KEY")
    }

    fn insert_row(&self, table: &TableInfo, row: &dyn Any, batch: bool) -> Result<Query> {
        let mut query = common::insert_row(self, table, row)?;
        if !batch && table.primary.is_auto() {
            query.sql.push_str(" RETURNING ");
            query.sql.push_str(&self.escape(&table.primary.column.name));
        }
        Ok(query)
    }

    fn key_retrieval(&self, _table: &TableInfo) -> KeyRetrieval {
        KeyRetrieval::Returning
    }

    fn create_procedure(&self, procedure: &ProcedureInfo, body: &str) -> Result<Query> {
        let args: Vec<String> = procedure
            .args
            .iter()
            .map(|a| format!("{} {}", self.escape(&a.name), a.db_type()))
            .collect();
        Ok(Query::new(format!(
            "CREATE OR REPLACE PROCEDURE {}({})\nLANGUAGE plpgsql\nAS $$\nBEGIN\n{}\nEND;\n$$",
            common::procedure_path(self, procedure),
            args.join(", "),
            common::indent(body)
        )))
    }

    fn drop_procedure(&self, procedure: &ProcedureInfo) -> Result<Query> {
        Ok(Query::new(format!(
            "DROP PROCEDURE IF EXISTS {}",
            common::procedure_path(self, procedure)
        )))
    }

    fn call_procedure(&self, procedure: &ProcedureInfo, args: &dyn Any) -> Result<Query> {
        Ok(Query::with_values(
            format!(
                "CALL {}({})",
                common::procedure_path(self, procedure),
                common::placeholders(procedure.args.len())
            ),
            common::procedure_args(procedure, args)?,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, Child, Identified, Lonely, Parent, Rename};
    use dbmap_core::{GeneratedKeys, Value};

    #[test]
    fn test_create_table() {
        let mapper = fixtures::full_mapper(&Postgres);
        let parent = Postgres
            .create_table(&mapper, fixtures::table::<Parent>(&mapper))
            .unwrap();
        assert_eq!(
            parent.sql,
            "CREATE TABLE IF NOT EXISTS \"main\".\"Parent\" (\"pk\" SERIAL PRIMARY KEY, \"col\" VARCHAR(100) NOT NULL)"
        );

        let child = Postgres
            .create_table(&mapper, fixtures::table::<Child>(&mapper))
            .unwrap();
        assert_eq!(
            child.sql,
            "CREATE TABLE IF NOT EXISTS \"main\".\"Child\" (\"pk\" SERIAL PRIMARY KEY, \"fk\" INTEGER NOT NULL, \"col\" VARCHAR(100) NOT NULL, FOREIGN KEY (\"fk\") REFERENCES \"main\".\"Parent\" (\"pk\") ON UPDATE CASCADE ON DELETE CASCADE)"
        );

        let identified = Postgres
            .create_table(&mapper, fixtures::table::<Identified>(&mapper))
            .unwrap();
        assert_eq!(
            identified.sql,
            "CREATE TABLE IF NOT EXISTS \"main\".\"Identified\" (\"pk\" UUID PRIMARY KEY DEFAULT gen_random_uuid(), \"col\" VARCHAR(100) NOT NULL)"
        );
    }

    #[test]
    fn test_insert_returns_key_only_for_single_rows() {
        let mapper = fixtures::mapper(&Postgres);
        let table = fixtures::table::<Parent>(&mapper);
        let parent = Parent {
            pk: None,
            col: "a".into(),
        };
        assert_eq!(
            Postgres.insert_row(table, &parent, false).unwrap().sql,
            "INSERT INTO \"main\".\"Parent\" (\"col\") VALUES (?) RETURNING \"pk\""
        );
        assert_eq!(
            Postgres.insert_row(table, &parent, true).unwrap().sql,
            "INSERT INTO \"main\".\"Parent\" (\"col\") VALUES (?)"
        );
        assert_eq!(
            Postgres
                .insert_row(fixtures::table::<Lonely>(&mapper), &Lonely::default(), false)
                .unwrap()
                .sql,
            "INSERT INTO \"main\".\"Lonely\" DEFAULT VALUES RETURNING \"pk\""
        );
        assert_eq!(Postgres.generated_keys(table), GeneratedKeys::None);
        assert!(Postgres.select_last_id(table).is_none());
    }

    #[test]
    fn test_schema_and_drop() {
        let mapper = fixtures::mapper(&Postgres);
        assert_eq!(
            Postgres.create_schema("main").unwrap().sql,
            "CREATE SCHEMA IF NOT EXISTS \"main\""
        );
        assert_eq!(
            Postgres.drop_schema("main", true).unwrap().sql,
            "DROP SCHEMA IF EXISTS \"main\" CASCADE"
        );
        assert_eq!(
            Postgres
                .drop_table(fixtures::table::<Parent>(&mapper), true)
                .sql,
            "DROP TABLE IF EXISTS \"main\".\"Parent\" CASCADE"
        );
    }

    #[test]
    fn test_procedures() {
        let mapper = fixtures::mapper(&Postgres);
        let procedure = mapper.procedure::<Rename>().unwrap();
        assert_eq!(
            Postgres
                .create_procedure(procedure, "UPDATE t SET c = col WHERE id = pk;")
                .unwrap()
                .sql,
            "CREATE OR REPLACE PROCEDURE \"rename\"(\"pk\" INTEGER, \"col\" VARCHAR(100))\nLANGUAGE plpgsql\nAS $$\nBEGIN\n    UPDATE t SET c = col WHERE id = pk;\nEND;\n$$"
        );
        assert_eq!(
            Postgres.drop_procedure(procedure).unwrap().sql,
            "DROP PROCEDURE IF EXISTS \"rename\""
        );
        let call = Postgres
            .call_procedure(
                procedure,
                &Rename {
                    pk: 1,
                    col: "b".into(),
                },
            )
            .unwrap();
        assert_eq!(call.sql, "CALL \"rename\"(?, ?)");
        assert_eq!(call.raw_values(), vec![Value::Int(1), Value::Text("b".into())]);
    }
}
