mod bulk;
mod config;
mod session;

pub use bulk::normalize_dataset;
pub use config::{
    SNFL_ACCOUNT, SNFL_DATABASE, SNFL_PASSWORD, SNFL_ROLE, SNFL_SCHEMA, SNFL_USER,
    SNFL_WAREHOUSE, generate_snowflake_config, generate_snowflake_config_from,
    snowpark_session_config,
};
pub use session::{SnowparkSession, WarehouseSession, open_snowpark_session};

use arrow_array::RecordBatch;

use crate::{Error, Result};

/// A Snowflake session that is closed when the connector goes out of scope.
///
/// ```rust,no_run
/// # use warehouse_connectors::{Result, SnowparkConnector};
/// # fn run(dataset: arrow_array::RecordBatch) -> Result<()> {
/// let connector = SnowparkConnector::new(true, Some("alice@example.com"))?;
/// connector.bulk_insert(&dataset, "RAW.PUBLIC.CUSTOMERS")?;
/// # Ok(())
/// # }
/// ```
pub struct SnowparkConnector<S: WarehouseSession = SnowparkSession> {
    session: Option<S>,
}

impl SnowparkConnector {
    /// Open a session from the process environment.
    pub fn new(use_sso: bool, user: Option<&str>) -> Result<Self> {
        Ok(Self::with_session(open_snowpark_session(use_sso, user)?))
    }
}

impl<S: WarehouseSession> SnowparkConnector<S> {
    pub fn with_session(session: S) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&self) -> Result<&S> {
        self.session.as_ref().ok_or(Error::SessionClosed)
    }

    /// Replace the contents of `table_name` with `dataset`.
    ///
    /// Column names are upper-cased and `NaN` cells are written as `NULL`. The target
    /// is overwritten, never appended to. A failure part-way through is returned as is;
    /// nothing is rolled back.
    pub fn bulk_insert(&self, dataset: &RecordBatch, table_name: &str) -> Result<()> {
        let session = self.session()?;
        tracing::debug!(
            table = table_name,
            rows = dataset.num_rows(),
            "running bulk insert"
        );

        let dataset = normalize_dataset(dataset)?;
        let staging = bulk::staging_table_name();
        let statements = bulk::overwrite_statements(&dataset, table_name, &staging)?;
        for statement in &statements {
            session.execute(statement)?;
        }

        tracing::debug!(
            table = table_name,
            statements = statements.len(),
            "bulk insert finished"
        );
        Ok(())
    }

    /// Close the session, reporting any failure instead of logging it.
    pub fn close(mut self) -> Result<()> {
        self.close_session()
    }

    fn close_session(&mut self) -> Result<()> {
        match self.session.take() {
            Some(mut session) => session.close(),
            None => Ok(()),
        }
    }
}

impl<S: WarehouseSession> Drop for SnowparkConnector<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close_session() {
            tracing::warn!(error = %e, "failed to close snowflake session");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use arrow_array::{ArrayRef, Float64Array, Int64Array};

    use super::session::MockWarehouseSession;
    use super::*;

    fn recording_session(statements: Arc<Mutex<Vec<String>>>) -> MockWarehouseSession {
        let mut session = MockWarehouseSession::new();
        session.expect_execute().returning(move |sql| {
            statements.lock().unwrap().push(sql.to_string());
            Ok(1)
        });
        session.expect_close().times(1).returning(|| Ok(()));
        session
    }

    fn single_id_dataset() -> RecordBatch {
        let ids = Arc::new(Int64Array::from(vec![1])) as ArrayRef;
        RecordBatch::try_from_iter(vec![("id", ids)]).unwrap()
    }

    #[test]
    fn scope_exit_closes_an_unused_session_once() {
        let mut session = MockWarehouseSession::new();
        session.expect_execute().never();
        session.expect_close().times(1).returning(|| Ok(()));

        let connector = SnowparkConnector::with_session(session);
        drop(connector);
    }

    #[test]
    fn explicit_close_is_not_repeated_on_drop() {
        let mut session = MockWarehouseSession::new();
        session.expect_close().times(1).returning(|| Ok(()));

        let connector = SnowparkConnector::with_session(session);
        assert!(connector.close().is_ok());
    }

    #[test]
    fn close_failure_is_reported_by_close_and_swallowed_by_drop() {
        let mut session = MockWarehouseSession::new();
        session
            .expect_close()
            .times(1)
            .returning(|| Err(Error::Configuration("gone".to_string())));
        let connector = SnowparkConnector::with_session(session);
        assert!(connector.close().is_err());

        let mut session = MockWarehouseSession::new();
        session
            .expect_close()
            .times(1)
            .returning(|| Err(Error::Configuration("gone".to_string())));
        drop(SnowparkConnector::with_session(session));
    }

    #[test]
    fn bulk_insert_normalizes_and_overwrites() {
        let statements = Arc::new(Mutex::new(Vec::new()));
        let connector = SnowparkConnector::with_session(recording_session(Arc::clone(&statements)));

        let dataset = RecordBatch::try_from_iter(vec![
            ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
            (
                "Amount",
                Arc::new(Float64Array::from(vec![f64::NAN, 9.5])) as ArrayRef,
            ),
        ])
        .unwrap();
        connector.bulk_insert(&dataset, "SALES").unwrap();
        drop(connector);

        let statements = statements.lock().unwrap();
        assert_eq!(statements.len(), 4);
        assert!(statements[0].starts_with("CREATE TEMPORARY TABLE WAREHOUSE_CONNECTORS_STAGE_"));
        assert!(statements[0].contains(r#"("ID" NUMBER(38, 0), "AMOUNT" FLOAT)"#));
        assert!(statements[1].ends_with(r#"("ID", "AMOUNT") VALUES (1, NULL), (2, 9.5)"#));
        assert!(statements[2].starts_with("CREATE OR REPLACE TABLE SALES AS SELECT * FROM "));
        assert!(statements[3].starts_with("DROP TABLE IF EXISTS "));
        assert!(!statements.iter().any(|sql| sql.starts_with("INSERT INTO SALES")));
    }

    #[test]
    fn bulk_insert_rejects_bad_input_before_sending_anything() {
        let mut session = MockWarehouseSession::new();
        session.expect_execute().never();
        session.expect_close().times(1).returning(|| Ok(()));
        let connector = SnowparkConnector::with_session(session);

        let dataset = single_id_dataset();
        assert!(matches!(
            connector.bulk_insert(&dataset, "SALES; DROP TABLE X"),
            Err(Error::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn write_failures_propagate() {
        let mut session = MockWarehouseSession::new();
        session
            .expect_execute()
            .times(1)
            .returning(|_| Err(Error::Configuration("warehouse suspended".to_string())));
        session.expect_close().times(1).returning(|| Ok(()));
        let connector = SnowparkConnector::with_session(session);

        let dataset = single_id_dataset();
        assert!(connector.bulk_insert(&dataset, "SALES").is_err());
    }
}
