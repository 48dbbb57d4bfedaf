use snowflake_connector_rs::{
    SnowflakeAuthMethod, SnowflakeClient, SnowflakeClientConfig, SnowflakeRow, SnowflakeSession,
};
use tokio::runtime::{Builder, Runtime};

use crate::config::ConnectionConfig;
use crate::env::ProcessEnvironment;
use crate::{Error, Result};

use super::config::{
    AUTHENTICATOR, EXTERNAL_BROWSER, SNFL_ACCOUNT, SNFL_PASSWORD, SNFL_USER,
    snowpark_session_config,
};

/// A live warehouse session that statements can be sent to.
#[cfg_attr(test, mockall::automock)]
pub trait WarehouseSession {
    /// Run one statement and return the number of rows it produced.
    fn execute(&self, sql: &str) -> Result<usize>;

    /// Release the session. Called at most once by the owning connector.
    fn close(&mut self) -> Result<()>;
}

/// Open a Snowflake session configured from the process environment.
pub fn open_snowpark_session(use_sso: bool, user: Option<&str>) -> Result<SnowparkSession> {
    let config = snowpark_session_config(&ProcessEnvironment, use_sso, user)?;
    SnowparkSession::create(&config)
}

/// A blocking Snowflake session.
///
/// The Snowflake client is asynchronous; each session owns a current-thread runtime
/// and blocks on it. Calling into a session from within another tokio runtime panics.
pub struct SnowparkSession {
    runtime: Runtime,
    session: Option<SnowflakeSession>,
}

impl SnowparkSession {
    pub fn create(config: &ConnectionConfig) -> Result<Self> {
        let (username, client_config) = client_config(config)?;
        let auth = auth_method(config)?;
        let client = SnowflakeClient::new(&username, auth, client_config)?;

        let runtime = Builder::new_current_thread().enable_all().build()?;
        tracing::debug!(
            account = config.get("account"),
            user = %username,
            "opening snowflake session"
        );
        let session = runtime.block_on(client.create_session())?;
        Ok(Self {
            runtime,
            session: Some(session),
        })
    }

    pub fn query(&self, sql: &str) -> Result<Vec<SnowflakeRow>> {
        let session = self.session.as_ref().ok_or(Error::SessionClosed)?;
        Ok(self.runtime.block_on(session.query(sql))?)
    }
}

impl WarehouseSession for SnowparkSession {
    fn execute(&self, sql: &str) -> Result<usize> {
        self.query(sql).map(|rows| rows.len())
    }

    // The client has no logout call; dropping the session releases it.
    fn close(&mut self) -> Result<()> {
        if self.session.take().is_some() {
            tracing::debug!("closed snowflake session");
        }
        Ok(())
    }
}

fn required<'a>(config: &'a ConnectionConfig, key: &str, variable: &str) -> Result<&'a str> {
    config
        .get(key)
        .ok_or_else(|| Error::Configuration(format!("{key} is not set, check {variable}")))
}

fn client_config(config: &ConnectionConfig) -> Result<(String, SnowflakeClientConfig)> {
    let account = required(config, "account", SNFL_ACCOUNT)?;
    let username = required(config, "user", SNFL_USER)?;
    let owned = |key: &str| config.get(key).map(str::to_string);
    Ok((
        username.to_string(),
        SnowflakeClientConfig {
            account: account.to_string(),
            warehouse: owned("warehouse"),
            database: owned("database"),
            schema: owned("schema"),
            role: owned("role"),
            ..Default::default()
        },
    ))
}

fn auth_method(config: &ConnectionConfig) -> Result<SnowflakeAuthMethod> {
    match config.get(AUTHENTICATOR) {
        Some(authenticator) if authenticator.eq_ignore_ascii_case(EXTERNAL_BROWSER) => {
            external_browser()
        }
        Some(authenticator) => Err(Error::UnsupportedFeature(format!(
            "authenticator '{authenticator}'"
        ))),
        None => {
            let password = required(config, "password", SNFL_PASSWORD)?;
            Ok(SnowflakeAuthMethod::Password(password.to_string()))
        }
    }
}

#[cfg(feature = "external-browser-sso")]
fn external_browser() -> Result<SnowflakeAuthMethod> {
    use snowflake_connector_rs::ExternalBrowserConfig;

    Ok(SnowflakeAuthMethod::ExternalBrowser(
        ExternalBrowserConfig::default(),
    ))
}

#[cfg(not(feature = "external-browser-sso"))]
fn external_browser() -> Result<SnowflakeAuthMethod> {
    Err(Error::UnsupportedFeature(
        "single sign-on requires the `external-browser-sso` feature".to_string(),
    ))
}
