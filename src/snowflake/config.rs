use crate::config::{Backend, ConnectionConfig};
use crate::env::{Environment, ProcessEnvironment, override_or_var};
use crate::{Error, Result};

pub const SNFL_ACCOUNT: &str = "SNFL_ACCOUNT";
pub const SNFL_USER: &str = "SNFL_USER";
pub const SNFL_PASSWORD: &str = "SNFL_PASSWORD";
pub const SNFL_DATABASE: &str = "SNFL_DATABASE";
pub const SNFL_SCHEMA: &str = "SNFL_SCHEMA";
pub const SNFL_WAREHOUSE: &str = "SNFL_WAREHOUSE";
pub const SNFL_ROLE: &str = "SNFL_ROLE";

pub(crate) const AUTHENTICATOR: &str = "authenticator";
pub(crate) const EXTERNAL_BROWSER: &str = "externalbrowser";

/// Build the Snowflake connection parameters from the process environment.
///
/// With `use_sso` the password is left out and the user signs in through the
/// identity provider in a browser. The identity provider matches on the user name,
/// so one must be given either as `user` or through `SNFL_USER`.
pub fn generate_snowflake_config(use_sso: bool, user: Option<&str>) -> Result<ConnectionConfig> {
    generate_snowflake_config_from(&ProcessEnvironment, use_sso, user)
}

pub fn generate_snowflake_config_from(
    env: &impl Environment,
    use_sso: bool,
    user: Option<&str>,
) -> Result<ConnectionConfig> {
    let user = override_or_var(env, user, SNFL_USER).filter(|user| !user.is_empty());
    if use_sso && user.is_none() {
        return Err(Error::Configuration(format!(
            "a user must be given or {SNFL_USER} set when single sign-on is requested"
        )));
    }

    let password = match use_sso {
        true => None,
        false => env.var(SNFL_PASSWORD),
    };
    let config = ConnectionConfig::new(
        Backend::Snowflake,
        [
            ("account", env.var(SNFL_ACCOUNT)),
            ("user", user),
            ("password", password),
            ("database", env.var(SNFL_DATABASE)),
            ("schema", env.var(SNFL_SCHEMA)),
            ("warehouse", env.var(SNFL_WAREHOUSE)),
            ("role", env.var(SNFL_ROLE)),
        ],
    );
    tracing::debug!(?config, use_sso, "generated snowflake config");
    Ok(config)
}

/// The parameters handed to the session builder.
///
/// For SSO the `password` key is dropped entirely and the external browser
/// authenticator is requested instead.
pub fn snowpark_session_config(
    env: &impl Environment,
    use_sso: bool,
    user: Option<&str>,
) -> Result<ConnectionConfig> {
    let config = generate_snowflake_config_from(env, use_sso, user)?;
    Ok(match use_sso {
        true => config
            .without("password")
            .with(AUTHENTICATOR, Some(EXTERNAL_BROWSER)),
        false => config,
    })
}
