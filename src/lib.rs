//! # Warehouse Connectors
//!
//! Environment-driven connectors for PostgreSQL and Snowflake. Each connector reads
//! its credentials from environment variables, opens one session and closes it when
//! the connector goes out of scope.
//!
//! | Variable | Backend | Default |
//! |---|---|---|
//! | `PG_USER`, `PG_PWD`, `PG_HOST`, `PG_PORT`, `PG_DATABASE` | Postgres | `localhost`, `5432`, `core_db` for host, port, database |
//! | `SNFL_ACCOUNT`, `SNFL_USER`, `SNFL_PASSWORD`, `SNFL_DATABASE`, `SNFL_SCHEMA`, `SNFL_WAREHOUSE`, `SNFL_ROLE` | Snowflake | none |
//!
//! ```rust,no_run
//! # use std::sync::Arc;
//! # use arrow_array::{ArrayRef, Float64Array, RecordBatch, StringArray};
//! # use warehouse_connectors::{Result, SnowparkConnector};
//! # fn run() -> Result<()> {
//! let dataset = RecordBatch::try_from_iter(vec![
//!     ("name", Arc::new(StringArray::from(vec!["a", "b"])) as ArrayRef),
//!     ("score", Arc::new(Float64Array::from(vec![1.0, f64::NAN])) as ArrayRef),
//! ])?;
//!
//! let connector = SnowparkConnector::new(false, None)?;
//! connector.bulk_insert(&dataset, "SCORES")?;
//! # Ok(())
//! # }
//! ```

mod config;
mod env;
mod error;
pub mod pg;
pub mod snowflake;

pub use config::{Backend, ConnectionConfig};
pub use env::{Environment, ProcessEnvironment};
pub use error::{Error, Result};
pub use pg::{PostgresConnector, build_pg_engine, generate_postgres_config};
pub use snowflake::{
    SnowparkConnector, WarehouseSession, generate_snowflake_config, open_snowpark_session,
};
