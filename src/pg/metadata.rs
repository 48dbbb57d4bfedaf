use indexmap::IndexMap;

use crate::Result;

use super::engine::PgEngine;

const REFLECT_COLUMNS: &str = "SELECT table_name, column_name, data_type, is_nullable \
     FROM information_schema.columns \
     WHERE table_schema = $1 \
     ORDER BY table_name, ordinal_position";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Table {
    pub schema: String,
    pub name: String,
    pub columns: Vec<Column>,
}

/// A catalog of table descriptions bound to an engine.
///
/// The catalog starts empty; [`Metadata::reflect`] loads one schema at a time.
#[derive(Clone, Debug)]
pub struct Metadata {
    engine: PgEngine,
    tables: IndexMap<String, Table>,
}

impl Metadata {
    pub fn new(engine: PgEngine) -> Self {
        Self {
            engine,
            tables: IndexMap::new(),
        }
    }

    pub fn engine(&self) -> &PgEngine {
        &self.engine
    }

    /// Load every table of `schema` from `information_schema`.
    ///
    /// Tables are keyed by `schema.name`; reflecting the same schema again replaces them.
    pub fn reflect(&mut self, schema: &str) -> Result<usize> {
        let mut client = self.engine.connect()?;
        let rows = client.query(REFLECT_COLUMNS, &[&schema])?;
        let rows = rows
            .iter()
            .map(|row| -> Result<(String, Column)> {
                Ok((
                    row.try_get::<_, String>(0)?,
                    Column {
                        name: row.try_get(1)?,
                        data_type: row.try_get(2)?,
                        nullable: row.try_get::<_, String>(3)? == "YES",
                    },
                ))
            })
            .collect::<Result<Vec<_>>>()?;
        client.close()?;

        let reflected = self.load(schema, rows);
        tracing::debug!(schema, tables = reflected, "reflected postgres schema");
        Ok(reflected)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    /// Look up a table by `schema.name`.
    pub fn table(&self, qualified_name: &str) -> Option<&Table> {
        self.tables.get(qualified_name)
    }

    fn load(&mut self, schema: &str, rows: Vec<(String, Column)>) -> usize {
        self.tables.retain(|_, table| table.schema != schema);
        let mut reflected = 0;
        for (table_name, column) in rows {
            let table = self
                .tables
                .entry(format!("{schema}.{table_name}"))
                .or_insert_with(|| {
                    reflected += 1;
                    Table {
                        schema: schema.to_string(),
                        name: table_name,
                        columns: Vec::new(),
                    }
                });
            table.columns.push(column);
        }
        reflected
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::pg::config::generate_postgres_config_from;

    fn column(name: &str, data_type: &str) -> Column {
        Column {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: true,
        }
    }

    #[test]
    fn load_groups_columns_by_table() {
        let env = HashMap::<String, String>::new();
        let engine = PgEngine::new(generate_postgres_config_from(&env, None));
        let mut metadata = Metadata::new(engine);

        let reflected = metadata.load(
            "public",
            vec![
                ("orders".to_string(), column("id", "integer")),
                ("orders".to_string(), column("total", "numeric")),
                ("users".to_string(), column("id", "integer")),
            ],
        );
        assert_eq!(reflected, 2);

        let orders = metadata.table("public.orders").unwrap();
        assert_eq!(orders.name, "orders");
        assert_eq!(
            orders.columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["id", "total"]
        );

        let reflected =
            metadata.load("public", vec![("users".to_string(), column("id", "integer"))]);
        assert_eq!(reflected, 1);
        assert!(metadata.table("public.orders").is_none());
        assert_eq!(metadata.tables().count(), 1);
    }
}
