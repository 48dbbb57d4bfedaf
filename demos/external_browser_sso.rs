use std::sync::Arc;

use arrow_array::{ArrayRef, Float64Array, Int64Array, RecordBatch, StringArray};
use warehouse_connectors::{Result, SnowparkConnector};

fn main() -> Result<()> {
    // The browser sign-in is matched against this user name.
    let user = std::env::var("SNFL_USER").ok();
    let connector = SnowparkConnector::new(true, user.as_deref())?;

    let dataset = RecordBatch::try_from_iter(vec![
        ("id", Arc::new(Int64Array::from(vec![1, 2])) as ArrayRef),
        ("value", Arc::new(StringArray::from(vec!["hello", "world"])) as ArrayRef),
        ("price", Arc::new(Float64Array::from(vec![99.99, f64::NAN])) as ArrayRef),
    ])?;
    connector.bulk_insert(&dataset, "EXAMPLE")?;

    let rows = connector.session()?.query("SELECT * FROM EXAMPLE ORDER BY ID")?;
    assert_eq!(rows.len(), 2);
    let row0_value: String = rows[0].get("VALUE")?;
    println!("Row 0: id={}, value={}", rows[0].get::<i64>("ID")?, row0_value);
    println!("Row 1 price is null: {}", rows[1].get::<Option<f64>>("PRICE")?.is_none());

    connector.close()
}
