use std::str::FromStr;

use postgres::{Client, NoTls};

use crate::Result;
use crate::config::ConnectionConfig;

use super::config::generate_postgres_config;

/// Mapping from config keys to libpq connection-string keys.
const CONNECTION_KEYS: [(&str, &str); 5] = [
    ("user", "user"),
    ("password", "password"),
    ("host", "host"),
    ("port", "port"),
    ("database", "dbname"),
];

/// A lazily connecting handle on a Postgres database.
///
/// Building an engine never touches the network; clients are opened on demand by
/// sessions and the metadata catalog.
#[derive(Clone, Debug)]
pub struct PgEngine {
    config: ConnectionConfig,
}

/// Build an engine from the process environment.
pub fn build_pg_engine() -> PgEngine {
    PgEngine::new(generate_postgres_config(None))
}

impl PgEngine {
    pub fn new(config: ConnectionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Open a new client.
    ///
    /// Malformed or missing parameters are reported by the driver.
    pub fn connect(&self) -> Result<Client> {
        let config = postgres::Config::from_str(&self.connection_string())?;
        tracing::debug!(
            host = self.config.get("host"),
            database = self.config.get("database"),
            "connecting to postgres"
        );
        Ok(config.connect(NoTls)?)
    }

    pub(crate) fn connection_string(&self) -> String {
        CONNECTION_KEYS
            .iter()
            .filter_map(|(key, libpq_key)| {
                self.config
                    .get(key)
                    .map(|value| format!("{libpq_key}={}", quote(value)))
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', r"\\").replace('\'', r"\'");
    format!("'{escaped}'")
}
