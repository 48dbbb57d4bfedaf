use postgres::{Client, Row};

use crate::{Error, Result};

use super::engine::PgEngine;

/// Both options are off by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Run every statement in its own implicit transaction.
    pub autocommit: bool,
    /// Flush pending writes before every `execute` and `query`.
    pub autoflush: bool,
}

/// Opens sessions bound to one engine.
#[derive(Clone, Debug)]
pub struct SessionFactory {
    engine: PgEngine,
    options: SessionOptions,
}

impl SessionFactory {
    pub fn new(engine: PgEngine, options: SessionOptions) -> Self {
        Self { engine, options }
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn open(&self) -> PgSession {
        PgSession {
            engine: self.engine.clone(),
            options: self.options,
            client: None,
            in_transaction: false,
            pending: Vec::new(),
            closed: false,
        }
    }
}

/// A unit of work against Postgres.
///
/// The session connects on first use. Without autocommit, the first statement opens a
/// transaction that stays open until [`PgSession::commit`] or [`PgSession::rollback`].
pub struct PgSession {
    engine: PgEngine,
    options: SessionOptions,
    client: Option<Client>,
    in_transaction: bool,
    pending: Vec<String>,
    closed: bool,
}

impl PgSession {
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }

    /// Queue a write to be sent on the next flush.
    pub fn add<S: Into<String>>(&mut self, statement: S) -> Result<()> {
        self.ensure_open()?;
        self.pending.push(statement.into());
        Ok(())
    }

    /// Send every queued write and return the number of affected rows.
    ///
    /// Writes that were not sent stay queued when connecting or a statement fails.
    pub fn flush(&mut self) -> Result<u64> {
        self.ensure_open()?;
        if self.pending.is_empty() {
            return Ok(0);
        }
        self.begin()?;
        let client = self.client.as_mut().ok_or(Error::SessionClosed)?;
        let pending = std::mem::take(&mut self.pending);
        tracing::debug!(statements = pending.len(), "flushing postgres session");
        let mut affected = 0;
        for (sent, statement) in pending.iter().enumerate() {
            match client.execute(statement.as_str(), &[]) {
                Ok(rows) => affected += rows,
                Err(e) => {
                    self.pending = pending[sent..].to_vec();
                    return Err(e.into());
                }
            }
        }
        Ok(affected)
    }

    /// Execute a statement and return the number of affected rows.
    pub fn execute(&mut self, statement: &str) -> Result<u64> {
        self.autoflush()?;
        let client = self.begin()?;
        Ok(client.execute(statement, &[])?)
    }

    pub fn query(&mut self, statement: &str) -> Result<Vec<Row>> {
        self.autoflush()?;
        let client = self.begin()?;
        Ok(client.query(statement, &[])?)
    }

    pub fn commit(&mut self) -> Result<()> {
        self.flush()?;
        if self.in_transaction {
            if let Some(client) = self.client.as_mut() {
                client.batch_execute("COMMIT")?;
            }
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Discard queued writes and roll back the open transaction, if any.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.pending.clear();
        if self.in_transaction {
            if let Some(client) = self.client.as_mut() {
                client.batch_execute("ROLLBACK")?;
            }
            self.in_transaction = false;
        }
        Ok(())
    }

    /// Roll back anything uncommitted and release the client.
    ///
    /// Closing twice, or closing a session that never connected, is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.pending.clear();
        let Some(mut client) = self.client.take() else {
            return Ok(());
        };
        tracing::debug!("closing postgres session");
        if std::mem::take(&mut self.in_transaction) {
            client.batch_execute("ROLLBACK")?;
        }
        Ok(client.close()?)
    }

    fn ensure_open(&self) -> Result<()> {
        match self.closed {
            true => Err(Error::SessionClosed),
            false => Ok(()),
        }
    }

    fn autoflush(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.options.autoflush {
            self.flush()?;
        }
        Ok(())
    }

    /// Connect if needed and open a transaction unless autocommit is on.
    fn begin(&mut self) -> Result<&mut Client> {
        self.ensure_open()?;
        if self.client.is_none() {
            self.client = Some(self.engine.connect()?);
        }
        let needs_begin = !self.options.autocommit && !self.in_transaction;
        let client = self.client.as_mut().ok_or(Error::SessionClosed)?;
        if needs_begin {
            client.batch_execute("BEGIN")?;
            self.in_transaction = true;
        }
        Ok(client)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::pg::config::{PG_PORT, generate_postgres_config_from};

    fn session_with(env: &[(&str, &str)], options: SessionOptions) -> PgSession {
        let env = env
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        let engine = PgEngine::new(generate_postgres_config_from(&env, None));
        SessionFactory::new(engine, options).open()
    }

    fn session(options: SessionOptions) -> PgSession {
        session_with(&[], options)
    }

    #[test]
    fn default_options_disable_autocommit_and_autoflush() {
        let options = SessionOptions::default();
        assert!(!options.autocommit);
        assert!(!options.autoflush);
    }

    #[test]
    fn sessions_connect_lazily() {
        let mut session = session(SessionOptions::default());
        session.add("INSERT INTO t VALUES (1)").unwrap();

        assert!(!session.is_connected());
        assert!(!session.in_transaction());
        assert_eq!(session.pending(), ["INSERT INTO t VALUES (1)".to_string()]);
    }

    #[test]
    fn rollback_discards_pending_writes_without_connecting() {
        let mut session = session(SessionOptions::default());
        session.add("INSERT INTO t VALUES (1)").unwrap();
        session.rollback().unwrap();

        assert!(session.pending().is_empty());
        assert!(!session.is_connected());
    }

    #[test]
    fn failed_commit_keeps_pending_writes() {
        let mut session = session_with(&[(PG_PORT, "not-a-port")], SessionOptions::default());
        session.add("INSERT INTO t VALUES (1)").unwrap();

        assert!(matches!(session.commit(), Err(Error::Postgres(_))));
        assert_eq!(session.pending(), ["INSERT INTO t VALUES (1)".to_string()]);
        assert!(!session.in_transaction());

        assert!(session.commit().is_err());
        assert_eq!(session.pending().len(), 1);
    }

    #[test]
    fn close_is_idempotent_and_blocks_further_use() {
        let mut session = session(SessionOptions::default());
        session.close().unwrap();
        session.close().unwrap();

        assert!(session.is_closed());
        assert!(matches!(session.add("SELECT 1"), Err(Error::SessionClosed)));
        assert!(matches!(session.execute("SELECT 1"), Err(Error::SessionClosed)));
        assert!(matches!(session.query("SELECT 1"), Err(Error::SessionClosed)));
        assert!(matches!(session.commit(), Err(Error::SessionClosed)));
    }
}
