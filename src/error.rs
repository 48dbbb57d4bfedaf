use arrow_schema::ArrowError;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    #[error("unsupported data type for bulk insert: {0}")]
    UnsupportedDataType(String),

    #[error("session is closed")]
    SessionClosed,

    #[error("snowflake error: {0}")]
    Snowflake(#[from] snowflake_connector_rs::Error),

    #[error("postgres error: {0}")]
    Postgres(#[from] postgres::Error),

    #[error("arrow error: {0}")]
    Arrow(#[from] ArrowError),

    #[error("io error: {0}")]
    IO(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
