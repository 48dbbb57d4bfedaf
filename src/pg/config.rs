use crate::config::{Backend, ConnectionConfig};
use crate::env::{Environment, ProcessEnvironment, override_or_var};

pub const PG_USER: &str = "PG_USER";
pub const PG_PWD: &str = "PG_PWD";
pub const PG_HOST: &str = "PG_HOST";
pub const PG_PORT: &str = "PG_PORT";
pub const PG_DATABASE: &str = "PG_DATABASE";

const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: &str = "5432";
const DEFAULT_DATABASE: &str = "core_db";

/// Build the Postgres connection parameters from the process environment.
///
/// Nothing is validated here: unset credentials stay `None` and are rejected by the
/// driver when a connection is first opened.
pub fn generate_postgres_config(user: Option<&str>) -> ConnectionConfig {
    generate_postgres_config_from(&ProcessEnvironment, user)
}

pub fn generate_postgres_config_from(
    env: &impl Environment,
    user: Option<&str>,
) -> ConnectionConfig {
    let config = ConnectionConfig::new(
        Backend::Postgres,
        [
            ("user", override_or_var(env, user, PG_USER)),
            ("password", env.var(PG_PWD)),
            ("host", env.var(PG_HOST).or_else(|| Some(DEFAULT_HOST.to_string()))),
            ("port", env.var(PG_PORT).or_else(|| Some(DEFAULT_PORT.to_string()))),
            (
                "database",
                env.var(PG_DATABASE)
                    .or_else(|| Some(DEFAULT_DATABASE.to_string())),
            ),
        ],
    );
    tracing::debug!(?config, "generated postgres config");
    config
}
