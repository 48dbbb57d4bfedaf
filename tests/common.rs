use warehouse_connectors::{PostgresConnector, Result, SnowparkConnector};

#[allow(dead_code)]
pub fn snowflake() -> Result<SnowparkConnector> {
    std::env::var("SNFL_ACCOUNT").expect("set SNFL_ACCOUNT for testing");
    std::env::var("SNFL_USER").expect("set SNFL_USER for testing");
    std::env::var("SNFL_PASSWORD").expect("set SNFL_PASSWORD for testing");

    SnowparkConnector::new(false, None)
}

#[allow(dead_code)]
pub fn postgres() -> Result<PostgresConnector> {
    std::env::var("PG_USER").expect("set PG_USER for testing");

    PostgresConnector::new(false, None)
}
