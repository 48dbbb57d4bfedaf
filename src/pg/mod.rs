mod config;
mod engine;
mod metadata;
mod session;

pub use config::{
    PG_DATABASE, PG_HOST, PG_PORT, PG_PWD, PG_USER, generate_postgres_config,
    generate_postgres_config_from,
};
pub use engine::{PgEngine, build_pg_engine};
pub use metadata::{Column, Metadata, Table};
pub use session::{PgSession, SessionFactory, SessionOptions};

use crate::env::{Environment, ProcessEnvironment};
use crate::{Error, Result};

/// A Postgres engine with one open session.
///
/// The session is closed when the connector goes out of scope. The engine is not
/// disposed; it holds no connection of its own.
///
/// ```rust,no_run
/// # use warehouse_connectors::{PostgresConnector, Result};
/// # fn run() -> Result<()> {
/// let mut connector = PostgresConnector::new(false, None)?;
/// connector.session().execute("INSERT INTO events (name) VALUES ('started')")?;
/// connector.session().commit()?;
/// # Ok(())
/// # }
/// ```
pub struct PostgresConnector {
    engine: PgEngine,
    session_factory: SessionFactory,
    session: PgSession,
    metadata: Metadata,
}

impl PostgresConnector {
    pub fn new(use_sso: bool, user: Option<&str>) -> Result<Self> {
        Self::from_env(&ProcessEnvironment, use_sso, user)
    }

    pub fn from_env(
        env: &impl Environment,
        use_sso: bool,
        user: Option<&str>,
    ) -> Result<Self> {
        if use_sso {
            return Err(Error::UnsupportedFeature(
                "single sign-on is only implemented for the Snowflake connector".to_string(),
            ));
        }

        let engine = PgEngine::new(generate_postgres_config_from(env, user));
        let session_factory = SessionFactory::new(engine.clone(), SessionOptions::default());
        let session = session_factory.open();
        let metadata = Metadata::new(engine.clone());
        Ok(Self {
            engine,
            session_factory,
            session,
            metadata,
        })
    }

    pub fn engine(&self) -> &PgEngine {
        &self.engine
    }

    pub fn session_factory(&self) -> &SessionFactory {
        &self.session_factory
    }

    pub fn session(&mut self) -> &mut PgSession {
        &mut self.session
    }

    pub fn metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }

    /// Close the session, reporting any failure instead of logging it.
    pub fn close(mut self) -> Result<()> {
        self.session.close()
    }
}

impl Drop for PostgresConnector {
    fn drop(&mut self) {
        if let Err(e) = self.session.close() {
            tracing::warn!(error = %e, "failed to close postgres session");
        }
    }
}
